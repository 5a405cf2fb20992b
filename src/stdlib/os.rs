//! `os` library (spec.md §4.6). Grounded on the teacher's `stdlib/os.rs`,
//! which already depends on `chrono` for `date`/`time` — kept as-is here.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

use crate::error::{LuaError, LuaResult};
use crate::interp::Interpreter;
use crate::lib_registry::LibraryModule;
use crate::value::{Table, Value};

use super::{arg, arg_error, check_str, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("os", crate::interp::StdlibTrustLevel::Restricted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("time", os_time);
    f!("date", os_date);
    f!("difftime", difftime);
    f!("clock", clock);
    f!("getenv", getenv);
    f!("remove", remove);
    f!("tmpname", tmpname);
    f!("exit", exit);
    f!("execute", execute);
    m
}

fn epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

fn os_time(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if let Value::Table(t) = arg(args, 0) {
        let t = t.borrow();
        let get = |key: &str, default: Option<i64>| -> LuaResult<i64> {
            match t.raw_get(&Value::from_string(key)) {
                Value::Nil => default.ok_or_else(|| LuaError::library(format!("field '{key}' missing in date table"))),
                v => v.as_integer_exact().ok_or_else(|| LuaError::library(format!("field '{key}' is not an integer"))),
            }
        };
        let year = get("year", None)?;
        let month = get("month", None)?;
        let day = get("day", None)?;
        let hour = get("hour", Some(12))?;
        let min = get("min", Some(0))?;
        let sec = get("sec", Some(0))?;
        let dt = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            .and_then(|d| d.and_hms_opt(hour as u32, min as u32, sec as u32))
            .ok_or_else(|| LuaError::library("invalid date table"))?;
        Ok(vec![Value::Integer(Utc.from_utc_datetime(&dt).timestamp())])
    } else {
        Ok(vec![Value::Integer(epoch_seconds())])
    }
}

fn os_date(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let fmt = if args.is_empty() || arg(args, 0).is_nil() {
        "%c".to_string()
    } else {
        check_str(args, 0, "date")?.to_string_lossy().into_owned()
    };
    let time = if args.len() >= 2 && !arg(args, 1).is_nil() {
        super::check_integer(args, 1, "date")?
    } else {
        epoch_seconds()
    };

    let (utc, rest) = if let Some(r) = fmt.strip_prefix('!') { (true, r) } else { (false, fmt.as_str()) };

    if rest == "*t" || rest == "!*t" {
        let dt = Utc.timestamp_opt(time, 0).single().ok_or_else(|| LuaError::library("time out of range"))?;
        let mut tbl = Table::new();
        macro_rules! set {
            ($k:expr, $v:expr) => {
                let _ = tbl.raw_set(Value::from_string($k), Value::Integer($v as i64));
            };
        }
        set!("year", dt.year());
        set!("month", dt.month());
        set!("day", dt.day());
        set!("hour", dt.hour());
        set!("min", dt.minute());
        set!("sec", dt.second());
        set!("wday", dt.weekday().num_days_from_sunday() + 1);
        set!("yday", dt.ordinal());
        let _ = tbl.raw_set(Value::from_string("isdst"), Value::Boolean(false));
        return Ok(vec![Value::new_table(tbl)]);
    }

    let rendered = if utc {
        let dt: DateTime<Utc> = Utc.timestamp_opt(time, 0).single().ok_or_else(|| LuaError::library("time out of range"))?;
        dt.format(&strftime_to_chrono(rest)).to_string()
    } else {
        let dt: DateTime<Local> = Local.timestamp_opt(time, 0).single().ok_or_else(|| LuaError::library("time out of range"))?;
        dt.format(&strftime_to_chrono(rest)).to_string()
    };
    Ok(vec![Value::from_string(rendered)])
}

/// `os.date`'s format string is already C `strftime` syntax, which is what
/// `chrono::format::strftime` consumes directly — this is an identity
/// function kept as a named seam in case a future format needs translation.
fn strftime_to_chrono(fmt: &str) -> String {
    fmt.to_string()
}

fn difftime(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t2 = super::check_number(args, 0, "difftime")?;
    let t1 = super::check_number(args, 1, "difftime")?;
    Ok(vec![Value::Float(t2 - t1)])
}

fn clock(_interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(std::time::Instant::now);
    Ok(vec![Value::Float(start.elapsed().as_secs_f64())])
}

fn getenv(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let name = check_str(args, 0, "getenv")?;
    Ok(vec![std::env::var(name.to_string_lossy().as_ref()).map(Value::from_string).unwrap_or(Value::Nil)])
}

fn remove(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_io() {
        return Ok(vec![Value::Nil, Value::from_string("io operations not permitted at this trust level")]);
    }
    let path = check_str(args, 0, "remove")?;
    match std::fs::remove_file(path.to_string_lossy().as_ref()) {
        Ok(()) => Ok(vec![Value::Boolean(true)]),
        Err(e) => Ok(vec![Value::Nil, Value::from_string(e.to_string())]),
    }
}

fn tmpname(interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_io() {
        return Err(LuaError::library("io operations not permitted at this trust level"));
    }
    let name = std::env::temp_dir().join(format!("lua_{}.tmp", epoch_seconds()));
    Ok(vec![Value::from_string(name.to_string_lossy())])
}

fn exit(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_os_execute() {
        return Err(LuaError::library("os.exit not permitted at this trust level"));
    }
    let code = match arg(args, 0) {
        Value::Nil | Value::Boolean(true) => 0,
        Value::Boolean(false) => 1,
        v => opt_integer(&[v], 0, "exit", 0)? as i32,
    };
    std::process::exit(code);
}

fn execute(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.is_empty() {
        return Ok(vec![Value::Boolean(interp.trust_level.allows_os_execute())]);
    }
    if !interp.trust_level.allows_os_execute() {
        return Err(arg_error("execute", 1, "os.execute not permitted at this trust level"));
    }
    let cmd = check_str(args, 0, "execute")?;
    let status = std::process::Command::new("/bin/sh").arg("-c").arg(cmd.to_string_lossy().as_ref()).status();
    match status {
        Ok(s) => Ok(vec![Value::Boolean(s.success()), Value::from_string("exit"), Value::Integer(s.code().unwrap_or(-1) as i64)]),
        Err(e) => Ok(vec![Value::Nil, Value::from_string("exit"), Value::from_string(e.to_string())]),
    }
}
