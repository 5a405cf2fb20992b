//! `utf8` library tests (spec.md §4.6).

use super::run;

#[test]
fn char_and_codepoint_roundtrip() {
    run(r#"
        local s = utf8.char(0x48, 0x65, 0x6C, 0x6C, 0x6F)
        assert(s == "Hello")
        assert(utf8.codepoint(s, 1) == 0x48)
        assert(utf8.codepoint(s, 1, 2) == 0x48)
    "#);
}

#[test]
fn len_counts_codepoints_not_bytes() {
    run(r#"
        local s = utf8.char(0x48, 0x2603, 0x21)
        assert(#s > utf8.len(s))
        assert(utf8.len(s) == 3)
    "#);
}

#[test]
fn codes_iterates_every_codepoint() {
    run(r#"
        local s = utf8.char(0x41, 0x2603, 0x42)
        local cps = {}
        for p, c in utf8.codes(s) do
            table.insert(cps, c)
        end
        assert(#cps == 3)
        assert(cps[1] == 0x41 and cps[2] == 0x2603 and cps[3] == 0x42)
    "#);
}

#[test]
fn offset_moves_by_codepoint_count() {
    run(r#"
        local s = utf8.char(0x41, 0x2603, 0x42)
        local pos = utf8.offset(s, 2)
        assert(pos == 2)
    "#);
}
