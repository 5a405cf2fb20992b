//! Operator and metamethod dispatch tests (spec.md §4.2, §4.5).

use super::run;

#[test]
fn arithmetic_and_bitwise() {
    run(r#"
        assert(1 + 2 == 3)
        assert(7 // 2 == 3)
        assert(7 % 2 == 1)
        assert(-7 % 2 == 1)
        assert(2 ^ 10 == 1024.0)
        assert(5 & 3 == 1)
        assert(5 | 2 == 7)
        assert(5 ~ 1 == 4)
        assert(~0 == -1)
        assert(1 << 4 == 16)
        assert(256 >> 4 == 16)
    "#);
}

#[test]
fn relational_and_logical() {
    run(r#"
        assert(1 < 2)
        assert("a" < "b")
        assert(not (1 < 1))
        assert((1 and 2) == 2)
        assert((false or 3) == 3)
        assert((nil and error("short-circuit failed")) == nil)
    "#);
}

#[test]
fn arithmetic_metamethods() {
    run(r#"
        local mt = {}
        mt.__add = function(a, b) return setmetatable({v = a.v + b.v}, mt) end
        mt.__tostring = function(a) return "V(" .. a.v .. ")" end
        local a = setmetatable({v = 1}, mt)
        local b = setmetatable({v = 2}, mt)
        local c = a + b
        assert(c.v == 3)
        assert(tostring(c) == "V(3)")
    "#);
}

#[test]
fn comparison_metamethods() {
    run(r#"
        local mt = {}
        mt.__lt = function(a, b) return a.v < b.v end
        mt.__le = function(a, b) return a.v <= b.v end
        mt.__eq = function(a, b) return a.v == b.v end
        local a = setmetatable({v = 1}, mt)
        local b = setmetatable({v = 2}, mt)
        local c = setmetatable({v = 1}, mt)
        assert(a < b)
        assert(a <= c)
        assert(a == c)
        assert(not (a == b))
    "#);
}

#[test]
fn index_and_newindex_metamethods() {
    run(r#"
        local backing = {}
        local proxy = setmetatable({}, {
            __index = function(_, k) return backing[k] end,
            __newindex = function(_, k, v) backing[k] = v end,
        })
        proxy.x = 10
        assert(proxy.x == 10)
        assert(backing.x == 10)
        assert(rawget(proxy, "x") == nil)
    "#);
}

#[test]
fn concat_type_errors() {
    let err = crate::execute("return {} .. 1");
    assert!(err.is_err());
}
