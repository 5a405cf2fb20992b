//! Standard library modules (spec.md §4.6), one file per Lua library,
//! matching the teacher's `stdlib/*.rs` layout directly — the module
//! crosswalk in SPEC_FULL.md calls this "the closest 1:1 mapping in the
//! whole crate".
//!
//! Every `fn module() -> LibraryModule` here is consumed by
//! [`crate::lib_registry::install_standard_library`].

pub mod basic;
pub mod coroutine;
pub mod debug;
pub mod io;
pub mod math;
pub mod os;
pub mod package;
pub mod string;
pub mod table;
pub mod utf8;

use crate::error::LuaError;
use crate::value::Value;

/// Shorthand for the common "wrong number/type of arguments" error shape
/// used across every library module.
pub(crate) fn arg_error(fname: &str, n: usize, message: impl std::fmt::Display) -> LuaError {
    LuaError::library(format!("bad argument #{n} to '{fname}' ({message})"))
}

pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Nil)
}

pub(crate) fn check_str(args: &[Value], i: usize, fname: &str) -> Result<crate::value::LuaStr, LuaError> {
    match arg(args, i) {
        Value::Str(s) => Ok(s),
        Value::Integer(n) => Ok(crate::value::LuaStr::new(crate::value::tostring_basic(&Value::Integer(n)).as_bytes())),
        Value::Float(f) => Ok(crate::value::LuaStr::new(crate::value::tostring_basic(&Value::Float(f)).as_bytes())),
        other => Err(arg_error(fname, i + 1, format!("string expected, got {}", other.type_name()))),
    }
}

pub(crate) fn check_number(args: &[Value], i: usize, fname: &str) -> Result<f64, LuaError> {
    let v = arg(args, i);
    v.coerce_to_float().ok_or_else(|| arg_error(fname, i + 1, format!("number expected, got {}", v.type_name())))
}

pub(crate) fn check_integer(args: &[Value], i: usize, fname: &str) -> Result<i64, LuaError> {
    let v = arg(args, i);
    match v.coerce_to_number() {
        Some(n) => n.as_integer_exact().ok_or_else(|| arg_error(fname, i + 1, "number has no integer representation")),
        None => Err(arg_error(fname, i + 1, format!("number expected, got {}", v.type_name()))),
    }
}

pub(crate) fn opt_integer(args: &[Value], i: usize, fname: &str, default: i64) -> Result<i64, LuaError> {
    if arg(args, i).is_nil() {
        Ok(default)
    } else {
        check_integer(args, i, fname)
    }
}

pub(crate) fn check_table(args: &[Value], i: usize, fname: &str) -> Result<std::rc::Rc<std::cell::RefCell<crate::value::Table>>, LuaError> {
    match arg(args, i) {
        Value::Table(t) => Ok(t),
        other => Err(arg_error(fname, i + 1, format!("table expected, got {}", other.type_name()))),
    }
}
