//! `string` library tests beyond pattern matching (spec.md §4.6).

use super::run;

#[test]
fn basic_string_functions() {
    run(r#"
        assert(string.len("hello") == 5)
        assert(("hello"):len() == 5)
        assert(string.upper("abc") == "ABC")
        assert(string.lower("ABC") == "abc")
        assert(string.reverse("abc") == "cba")
        assert(string.rep("ab", 3) == "ababab")
        assert(string.rep("ab", 3, "-") == "ab-ab-ab")
        assert(string.sub("hello", 2, 4) == "ell")
        assert(string.sub("hello", -3) == "llo")
        assert(string.byte("A") == 65)
        assert(string.char(65, 66) == "AB")
    "#);
}

#[test]
fn format_basic_conversions() {
    run(r#"
        assert(string.format("%d", 42) == "42")
        assert(string.format("%5d", 42) == "   42")
        assert(string.format("%-5d|", 42) == "42   |")
        assert(string.format("%05d", 42) == "00042")
        assert(string.format("%s", "hi") == "hi")
        assert(string.format("%x", 255) == "ff")
        assert(string.format("%.2f", 3.14159) == "3.14")
        assert(string.format("%%") == "%")
    "#);
}

#[test]
fn pack_unpack_roundtrip() {
    run(r#"
        local packed = string.pack("<i4", 1000)
        local value, next_pos = string.unpack("<i4", packed)
        assert(value == 1000)
        assert(next_pos == 5)
        assert(string.packsize("<i4") == 4)
    "#);
}
