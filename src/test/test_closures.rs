//! Closure and upvalue-capture tests (spec.md §4.4).

use super::run;

#[test]
fn counter_closure_shares_upvalue() {
    run(r#"
        local function make_counter()
            local n = 0
            return function()
                n = n + 1
                return n
            end
        end
        local c1 = make_counter()
        local c2 = make_counter()
        assert(c1() == 1)
        assert(c1() == 2)
        assert(c2() == 1)
    "#);
}

#[test]
fn loop_variable_capture_per_iteration() {
    run(r#"
        local fns = {}
        for i = 1, 3 do
            fns[i] = function() return i end
        end
        assert(fns[1]() == 1)
        assert(fns[2]() == 2)
        assert(fns[3]() == 3)
    "#);
}

#[test]
fn mutual_recursion_via_forward_declaration() {
    run(r#"
        local is_even, is_odd
        is_even = function(n) if n == 0 then return true else return is_odd(n - 1) end end
        is_odd = function(n) if n == 0 then return false else return is_even(n - 1) end end
        assert(is_even(10))
        assert(is_odd(7))
    "#);
}

#[test]
fn varargs_forwarding() {
    run(r#"
        local function sum(...)
            local total = 0
            for _, v in ipairs({...}) do total = total + v end
            return total
        end
        local function wrapper(...)
            return sum(...)
        end
        assert(wrapper(1, 2, 3) == 6)
        assert(select("#", 1, 2, 3) == 3)
    "#);
}
