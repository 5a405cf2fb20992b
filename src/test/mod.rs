//! Test module organization, mirroring the teacher's `test/mod.rs` layout.

mod test_closures;
mod test_coroutines;
mod test_goto_close;
mod test_operators;
mod test_parser;
mod test_patterns;
mod test_stdlib_basic;
mod test_stdlib_io_os;
mod test_stdlib_math;
mod test_stdlib_string;
mod test_stdlib_table;
mod test_stdlib_utf8;
mod test_tables;
mod test_values;

/// Runs `src` at full trust and unwraps any error into a panic message,
/// for tests that only care whether the script's own `assert`s passed.
pub(crate) fn run(src: &str) -> Vec<crate::value::Value> {
    match crate::execute(src) {
        Ok(values) => values,
        Err(e) => panic!("script failed: {e}"),
    }
}
