//! Lua pattern-matching tests (spec.md §4.8).

use super::run;

#[test]
fn find_and_match_basics() {
    run(r#"
        local s = "hello world"
        local i, j = string.find(s, "world")
        assert(i == 7 and j == 11)
        assert(string.match(s, "(%w+) (%w+)") == "hello")
        local w1, w2 = string.match(s, "(%w+) (%w+)")
        assert(w1 == "hello" and w2 == "world")
    "#);
}

#[test]
fn anchored_and_character_classes() {
    run(r#"
        assert(string.match("   42", "^%s*(%d+)$") == "42")
        assert(string.find("abc123", "%d+") == 4)
        assert(string.match("key=value", "(%w+)=(%w+)") ~= nil)
    "#);
}

#[test]
fn gmatch_iterates_all_matches() {
    run(r#"
        local words = {}
        for w in string.gmatch("one two three", "%a+") do
            table.insert(words, w)
        end
        assert(#words == 3)
        assert(words[1] == "one" and words[3] == "three")
    "#);
}

#[test]
fn gsub_with_string_table_and_function_replacements() {
    run(r#"
        local s, n = string.gsub("hello world", "o", "0")
        assert(s == "hell0 w0rld" and n == 2)

        local s2 = string.gsub("$name is $age", "%$(%w+)", {name = "Ada", age = "36"})
        assert(s2 == "Ada is 36")

        local s3 = string.gsub("abc", "%a", function(c) return c:upper() end)
        assert(s3 == "ABC")
    "#);
}

#[test]
fn captures_with_position_and_balanced_match() {
    run(r#"
        assert(string.match("hello", "()ll()") == 3)
        assert(string.match("(a(b)c)", "%b()") == "(a(b)c)")
    "#);
}
