//! Coroutine tests (spec.md §4.7).

use super::run;

#[test]
fn basic_resume_yield_cycle() {
    run(r#"
        local co = coroutine.create(function(a, b)
            assert(a == 1 and b == 2)
            local c = coroutine.yield(a + b)
            assert(c == 10)
            return "done"
        end)
        local ok1, v1 = coroutine.resume(co, 1, 2)
        assert(ok1 and v1 == 3)
        assert(coroutine.status(co) == "suspended")
        local ok2, v2 = coroutine.resume(co, 10)
        assert(ok2 and v2 == "done")
        assert(coroutine.status(co) == "dead")
    "#);
}

#[test]
fn resume_after_error_reports_false_and_message() {
    run(r#"
        local co = coroutine.create(function() error("boom") end)
        local ok, err = coroutine.resume(co)
        assert(ok == false)
        assert(string.find(tostring(err), "boom") ~= nil)
        assert(coroutine.status(co) == "dead")
    "#);
}

#[test]
fn wrap_reraises_errors() {
    run(r#"
        local f = coroutine.wrap(function() error("wrapped boom") end)
        local ok = pcall(f)
        assert(ok == false)
    "#);
}

#[test]
fn isyieldable_and_running() {
    run(r#"
        assert(coroutine.isyieldable() == false)
        local co = coroutine.create(function()
            assert(coroutine.isyieldable() == true)
            local _, is_main = coroutine.running()
            assert(is_main == false)
        end)
        coroutine.resume(co)
    "#);
}
