//! `goto`/label and `<close>`/`<const>` attribute tests (spec.md §4.5).

use super::run;

#[test]
fn goto_skips_forward() {
    run(r#"
        local reached = false
        goto skip
        reached = true
        ::skip::
        assert(reached == false)
    "#);
}

#[test]
fn goto_loop_backward() {
    run(r#"
        local i = 0
        ::top::
        i = i + 1
        if i < 5 then goto top end
        assert(i == 5)
    "#);
}

#[test]
fn break_exits_innermost_loop_only() {
    run(r#"
        local outer_count = 0
        for i = 1, 3 do
            outer_count = outer_count + 1
            for j = 1, 3 do
                if j == 2 then break end
            end
        end
        assert(outer_count == 3)
    "#);
}

#[test]
fn close_attribute_runs_on_scope_exit() {
    run(r#"
        local log = {}
        do
            local guard <close> = setmetatable({}, {__close = function() table.insert(log, "closed") end})
            table.insert(log, "inside")
        end
        assert(#log == 2)
        assert(log[1] == "inside" and log[2] == "closed")
    "#);
}

#[test]
fn close_runs_on_error_unwind() {
    let result = crate::execute(r#"
        local log = {}
        local ok, err = pcall(function()
            local guard <close> = setmetatable({}, {__close = function() table.insert(log, "closed") end})
            error("boom")
        end)
        assert(ok == false)
        assert(#log == 1 and log[1] == "closed")
        return true
    "#);
    assert!(result.is_ok());
}

#[test]
fn const_attribute_rejects_reassignment() {
    let result = crate::execute(r#"
        local x <const> = 10
        x = 20
    "#);
    assert!(result.is_err());
}
