//! Lexer/parser tests (spec.md §4.1–§4.3): numeral forms, string escapes,
//! long brackets, and precedence edge cases exercised end-to-end since the
//! parser has no separate public AST-inspection API.

use super::run;

#[test]
fn hex_and_float_numerals() {
    run(r#"
        assert(0x10 == 16)
        assert(0xA == 10)
        assert(1e2 == 100.0)
        assert(3.14 > 3 and 3.14 < 4)
        assert(0x1p4 == 16.0)
    "#);
}

#[test]
fn string_escapes_and_long_brackets() {
    run(r#"
        assert("a\tb\n" == "a" .. string.char(9) .. "b" .. string.char(10))
        assert("\65\66\67" == "ABC")
        assert("\x41\x42" == "AB")
        local s = [[
hello
world]]
        assert(s == "hello\nworld")
        local s2 = [==[ contains ]] inside ]==]
        assert(s2 == " contains ]] inside ")
    "#);
}

#[test]
fn comments_are_skipped() {
    run(r#"
        -- a line comment
        local x = 1 --[[ a block comment
        spanning lines ]] + 1
        assert(x == 2)
    "#);
}

#[test]
fn operator_precedence() {
    run(r#"
        assert(1 + 2 * 3 == 7)
        assert((1 + 2) * 3 == 9)
        assert(2 ^ 3 ^ 2 == 512.0)
        assert(5 & 3 == 1)
        assert(not 1 == 2 == false)
        assert(1 .. 2 .. 3 == "123")
        assert(-2 ^ 2 == -4.0)
    "#);
}

#[test]
fn syntax_error_is_reported() {
    let result = crate::execute("local x = ");
    assert!(result.is_err());
    let result2 = crate::execute("if true then");
    assert!(result2.is_err());
}

#[test]
fn unexpected_symbol_is_reported() {
    let result = crate::execute("local 1 = 2");
    assert!(result.is_err());
}
