//! `math` library tests (spec.md §4.6).

use super::run;

#[test]
fn rounding_and_basic_functions() {
    run(r#"
        assert(math.abs(-5) == 5)
        assert(math.ceil(1.2) == 2)
        assert(math.floor(1.8) == 1)
        assert(math.sqrt(16) == 4.0)
        assert(math.max(1, 5, 3) == 5)
        assert(math.min(1, 5, 3) == 1)
        assert(math.fmod(7, 3) == 1)
        local ip, fp = math.modf(3.25)
        assert(ip == 3.0 and fp == 0.25)
    "#);
}

#[test]
fn type_predicates_and_constants() {
    run(r#"
        assert(math.type(1) == "integer")
        assert(math.type(1.0) == "float")
        assert(math.type("1") == nil)
        assert(math.tointeger(3.0) == 3)
        assert(math.tointeger(3.5) == nil)
        assert(math.huge > math.maxinteger)
        assert(math.ult(1, 2) == true)
        assert(math.ult(-1, 1) == false)
    "#);
}

#[test]
fn random_is_seedable_and_deterministic() {
    run(r#"
        math.randomseed(42)
        local a = math.random(1, 100)
        math.randomseed(42)
        local b = math.random(1, 100)
        assert(a == b)
        assert(a >= 1 and a <= 100)
    "#);
}

#[test]
fn trigonometry_roundtrip() {
    run(r#"
        assert(math.abs(math.sin(0)) < 1e-9)
        assert(math.abs(math.cos(0) - 1) < 1e-9)
        assert(math.abs(math.deg(math.rad(180)) - 180) < 1e-9)
    "#);
}
