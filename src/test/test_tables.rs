//! Table construction, array/hash split, and iteration tests (spec.md §4.3).

use super::run;

#[test]
fn constructors_and_raw_access() {
    run(r#"
        local t = {1, 2, 3, x = "hi", [10] = "ten"}
        assert(#t == 3)
        assert(t[1] == 1 and t[3] == 3)
        assert(t.x == "hi")
        assert(t[10] == "ten")
    "#);
}

#[test]
fn ipairs_stops_at_first_nil() {
    run(r#"
        local t = {10, 20, nil, 40}
        local seen = 0
        for i, v in ipairs(t) do
            seen = seen + 1
            assert(t[i] == v)
        end
        assert(seen == 2)
    "#);
}

#[test]
fn pairs_visits_every_key() {
    run(r#"
        local t = {a = 1, b = 2, c = 3}
        local count = 0
        local sum = 0
        for k, v in pairs(t) do
            count = count + 1
            sum = sum + v
        end
        assert(count == 3)
        assert(sum == 6)
    "#);
}

#[test]
fn insert_remove_sort() {
    run(r#"
        local t = {5, 3, 1, 4, 2}
        table.sort(t)
        assert(t[1] == 1 and t[5] == 5)
        table.insert(t, 1, 0)
        assert(t[1] == 0 and #t == 6)
        local removed = table.remove(t, 1)
        assert(removed == 0)
        assert(#t == 5)
    "#);
}

#[test]
fn table_concat_and_pack_unpack() {
    run(r#"
        local t = {"a", "b", "c"}
        assert(table.concat(t, ",") == "a,b,c")
        local packed = table.pack(1, 2, 3)
        assert(packed.n == 3)
        local a, b, c = table.unpack(packed, 1, packed.n)
        assert(a == 1 and b == 2 and c == 3)
    "#);
}

#[test]
fn metatable_get_set() {
    run(r#"
        local t = {}
        local mt = {__index = function() return "default" end}
        setmetatable(t, mt)
        assert(getmetatable(t) == mt)
        assert(t.anything == "default")
    "#);
}
