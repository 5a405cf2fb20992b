//! `table.move` and sort-with-comparator edge cases (spec.md §4.6).

use super::run;

#[test]
fn move_within_same_table_overlapping() {
    run(r#"
        local t = {1, 2, 3, 4, 5}
        table.move(t, 1, 3, 3)
        assert(t[3] == 1 and t[4] == 2 and t[5] == 3)
    "#);
}

#[test]
fn move_between_tables() {
    run(r#"
        local a = {1, 2, 3}
        local b = {}
        table.move(a, 1, 3, 1, b)
        assert(b[1] == 1 and b[2] == 2 and b[3] == 3)
    "#);
}

#[test]
fn sort_with_custom_comparator() {
    run(r#"
        local t = {3, 1, 2}
        table.sort(t, function(a, b) return a > b end)
        assert(t[1] == 3 and t[2] == 2 and t[3] == 1)
    "#);
}

#[test]
fn sort_propagates_comparator_errors() {
    let result = crate::execute(r#"
        local t = {3, 1, 2}
        table.sort(t, function(a, b) error("bad comparator") end)
    "#);
    assert!(result.is_err());
}
