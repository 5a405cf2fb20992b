//! Value model and coercion tests (spec.md §3, §4.2).

use super::run;

#[test]
fn truthiness() {
    run(r#"
        assert(nil == nil)
        assert(not nil)
        assert(not false)
        assert(0)
        assert("")
        assert({})
    "#);
}

#[test]
fn integer_float_equality() {
    run(r#"
        assert(1 == 1.0)
        assert(math.type(1) == "integer")
        assert(math.type(1.0) == "float")
        assert(1 // 1 == 1)
        assert(math.type(1 // 1) == "integer")
        assert(math.type(1 / 1) == "float")
    "#);
}

#[test]
fn string_number_coercion() {
    run(r#"
        assert("10" + 1 == 11)
        assert(10 .. 20 == "1020")
        assert(tostring(10) == "10")
        assert(tonumber("10") == 10)
        assert(tonumber("0x1A") == 26)
    "#);
}

#[test]
fn integer_overflow_wraps() {
    run(r#"
        assert(math.maxinteger + 1 == math.mininteger)
        assert(math.mininteger - 1 == math.maxinteger)
    "#);
}
