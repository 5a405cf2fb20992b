//! `io` and `os` library tests (spec.md §4.6, §5). Uses real temp files since
//! this interpreter has no virtual filesystem — the teacher's own io tests
//! work the same way, against a scratch directory.

use crate::{State, StdlibTrustLevel};

fn trusted() -> State {
    State::new(StdlibTrustLevel::Trusted)
}

#[test]
fn write_then_read_back_a_file() {
    let path = std::env::temp_dir().join(format!("lua_core_test_{}.txt", std::process::id()));
    let path_str = path.to_string_lossy().into_owned();
    let mut state = trusted();
    state
        .run(
            &format!(
                r#"
        local f = io.open("{path}", "w")
        f:write("line one\n")
        f:write("line two\n")
        f:close()
    "#,
                path = path_str
            ),
            "test",
        )
        .unwrap();

    state
        .run(
            &format!(
                r#"
        local f = io.open("{path}", "r")
        local l1 = f:read("l")
        local l2 = f:read("l")
        local l3 = f:read("l")
        f:close()
        assert(l1 == "line one")
        assert(l2 == "line two")
        assert(l3 == nil)
    "#,
                path = path_str
            ),
            "test",
        )
        .unwrap();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn io_lines_iterates_and_closes() {
    let path = std::env::temp_dir().join(format!("lua_core_test_lines_{}.txt", std::process::id()));
    std::fs::write(&path, "a\nb\nc\n").unwrap();
    let mut state = trusted();
    state
        .run(
            &format!(
                r#"
        local count = 0
        for line in io.lines("{path}") do
            count = count + 1
        end
        assert(count == 3)
    "#,
                path = path.to_string_lossy()
            ),
            "test",
        )
        .unwrap();
    let _ = std::fs::remove_file(&path);
}

#[test]
fn untrusted_state_blocks_io() {
    let mut state = State::new(StdlibTrustLevel::Untrusted);
    let result = state.run(r#"return io"#, "test");
    assert!(matches!(result, Ok(values) if values[0].type_name() == "nil") || result.is_err());
}

#[test]
fn os_time_and_date_table_roundtrip() {
    let mut state = trusted();
    state
        .run(
            r#"
        local t = os.time({year = 2000, month = 1, day = 1, hour = 0, min = 0, sec = 0})
        assert(type(t) == "number")
        local d = os.date("!*t", t)
        assert(d.year == 2000 and d.month == 1 and d.day == 1)
    "#,
            "test",
        )
        .unwrap();
}

#[test]
fn os_execute_blocked_below_trusted() {
    let mut state = State::new(StdlibTrustLevel::Restricted);
    let result = state.run(r#"os.execute("true")"#, "test");
    assert!(result.is_err());
}
