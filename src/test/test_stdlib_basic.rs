//! Basic library tests (spec.md §4.6).

use super::run;

#[test]
fn type_and_tostring() {
    run(r#"
        assert(type(nil) == "nil")
        assert(type(true) == "boolean")
        assert(type(1) == "number")
        assert(type("s") == "string")
        assert(type({}) == "table")
        assert(type(print) == "function")
        assert(tostring(nil) == "nil")
        assert(tostring(123) == "123")
    "#);
}

#[test]
fn pcall_captures_errors() {
    run(r#"
        local ok, err = pcall(function() error("oops") end)
        assert(ok == false)
        assert(string.find(err, "oops") ~= nil)

        local ok2, a, b = pcall(function() return 1, 2 end)
        assert(ok2 and a == 1 and b == 2)
    "#);
}

#[test]
fn pcall_preserves_non_string_error_values() {
    run(r#"
        local ok, err = pcall(function() error({code = 42}) end)
        assert(ok == false)
        assert(err.code == 42)
    "#);
}

#[test]
fn xpcall_runs_handler_on_failure() {
    run(r#"
        local handled
        local ok = xpcall(function() error("x") end, function(e) handled = e; return "handled" end)
        assert(ok == false)
        assert(string.find(handled, "x") ~= nil)
    "#);
}

#[test]
fn assert_forwards_extra_arguments() {
    run(r#"
        local a, b, c = assert(true, "msg", 99)
        assert(a == true and b == "msg" and c == 99)
    "#);
}

#[test]
fn select_handles_hash_and_indices() {
    run(r#"
        assert(select("#", 1, 2, 3) == 3)
        assert(select(2, "a", "b", "c") == "b")
    "#);
}

#[test]
fn rawequal_rawget_rawset_bypass_metamethods() {
    run(r#"
        local t = setmetatable({}, {__index = function() return "meta" end, __newindex = function() error("blocked") end})
        assert(t.anything == "meta")
        assert(rawget(t, "anything") == nil)
        rawset(t, "x", 1)
        assert(rawget(t, "x") == 1)
    "#);
}
