//! `table` library (spec.md §4.6).
//!
//! Grounded on the teacher's `stdlib/table.rs`. `sort`'s comparator may be
//! arbitrary Lua code, so it goes through [`crate::interp::call::call_value`]
//! exactly like the teacher's comparator callback.

use crate::error::{LuaError, LuaResult};
use crate::interp::{call, Interpreter};
use crate::lib_registry::LibraryModule;
use crate::value::Value;

use super::{arg, arg_error, check_table, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("table", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("insert", insert);
    f!("remove", remove);
    f!("concat", concat);
    f!("sort", sort);
    f!("pack", pack);
    f!("unpack", unpack);
    f!("move", table_move);
    m
}

fn insert(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "insert")?;
    let len = t.borrow().length();
    match args.len() {
        2 => {
            t.borrow_mut().raw_set(Value::Integer(len + 1), arg(args, 1)).map_err(LuaError::runtime)?;
            Ok(Vec::new())
        }
        3 => {
            let pos = super::check_integer(args, 1, "insert")?;
            if pos < 1 || pos > len + 1 {
                return Err(arg_error("insert", 2, "position out of bounds"));
            }
            let mut i = len + 1;
            while i > pos {
                let prev = t.borrow().raw_get(&Value::Integer(i - 1));
                t.borrow_mut().raw_set(Value::Integer(i), prev).map_err(LuaError::runtime)?;
                i -= 1;
            }
            t.borrow_mut().raw_set(Value::Integer(pos), arg(args, 2)).map_err(LuaError::runtime)?;
            Ok(Vec::new())
        }
        _ => Err(LuaError::library("wrong number of arguments to 'insert'")),
    }
}

fn remove(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "remove")?;
    let len = t.borrow().length();
    let pos = opt_integer(args, 1, "remove", len)?;
    if len == 0 {
        return Ok(vec![Value::Nil]);
    }
    if pos < 1 || pos > len + 1 {
        return Err(arg_error("remove", 2, "position out of bounds"));
    }
    let removed = t.borrow().raw_get(&Value::Integer(pos));
    let mut i = pos;
    while i < len {
        let next = t.borrow().raw_get(&Value::Integer(i + 1));
        t.borrow_mut().raw_set(Value::Integer(i), next).map_err(LuaError::runtime)?;
        i += 1;
    }
    t.borrow_mut().raw_set(Value::Integer(len), Value::Nil).map_err(LuaError::runtime)?;
    Ok(vec![removed])
}

fn concat(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "concat")?;
    let sep = match arg(args, 1) {
        Value::Nil => String::new(),
        v => super::check_str(&[v], 0, "concat")?.to_string_lossy().into_owned(),
    };
    let len = t.borrow().length();
    let i = opt_integer(args, 2, "concat", 1)?;
    let j = opt_integer(args, 3, "concat", len)?;
    let mut out = String::new();
    let mut k = i;
    while k <= j {
        let v = t.borrow().raw_get(&Value::Integer(k));
        let piece = match &v {
            Value::Str(_) | Value::Integer(_) | Value::Float(_) => crate::interp::operators::tostring(interp, &v)?,
            other => {
                return Err(LuaError::library(format!(
                    "invalid value (at index {k}) in table for 'concat' ({})",
                    other.type_name()
                )))
            }
        };
        out.push_str(&piece);
        if k < j {
            out.push_str(&sep);
        }
        k += 1;
    }
    Ok(vec![Value::from_string(out)])
}

fn sort(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "sort")?;
    let len = t.borrow().length();
    let mut items: Vec<Value> = (1..=len).map(|i| t.borrow().raw_get(&Value::Integer(i))).collect();
    let comparator = arg(args, 1);

    // A plain `sort_by` can't propagate a `Result` out of its comparator
    // closure, so any error raised mid-sort is stashed here and re-raised
    // after the sort finishes (the partial reordering is then discarded by
    // the caller via `?`, matching "an error aborts the sort").
    let mut error: Option<LuaError> = None;
    items.sort_by(|a, b| {
        if error.is_some() {
            return std::cmp::Ordering::Equal;
        }
        let less = if comparator.is_nil() {
            default_less(a, b)
        } else {
            call::call_value(interp, comparator.clone(), vec![a.clone(), b.clone()], 0)
                .map(|r| r.first().map(Value::is_truthy).unwrap_or(false))
        };
        match less {
            Ok(true) => std::cmp::Ordering::Less,
            Ok(false) => std::cmp::Ordering::Greater,
            Err(e) => {
                error = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    if let Some(e) = error {
        return Err(e);
    }
    for (idx, v) in items.into_iter().enumerate() {
        t.borrow_mut().raw_set(Value::Integer(idx as i64 + 1), v).map_err(LuaError::runtime)?;
    }
    Ok(Vec::new())
}

fn default_less(a: &Value, b: &Value) -> LuaResult<bool> {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            Ok(a.as_number().unwrap() < b.as_number().unwrap())
        }
        (Value::Str(x), Value::Str(y)) => Ok(x.as_bytes() < y.as_bytes()),
        _ => Err(LuaError::library(format!(
            "attempt to compare two {} values",
            a.type_name()
        ))),
    }
}

fn pack(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let mut t = crate::value::Table::new();
    for (i, v) in args.iter().enumerate() {
        let _ = t.raw_set(Value::Integer(i as i64 + 1), v.clone());
    }
    let _ = t.raw_set(Value::from_string("n"), Value::Integer(args.len() as i64));
    Ok(vec![Value::new_table(t)])
}

fn unpack(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "unpack")?;
    let i = opt_integer(args, 1, "unpack", 1)?;
    let j = opt_integer(args, 2, "unpack", t.borrow().length())?;
    if i > j {
        return Ok(Vec::new());
    }
    if (j - i) > 1_000_000 {
        return Err(LuaError::library("too many results to unpack"));
    }
    Ok((i..=j).map(|k| t.borrow().raw_get(&Value::Integer(k))).collect())
}

fn table_move(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let a1 = check_table(args, 0, "move")?;
    let f = super::check_integer(args, 1, "move")?;
    let e = super::check_integer(args, 2, "move")?;
    let t = super::check_integer(args, 3, "move")?;
    let a2 = if args.len() >= 5 && !arg(args, 4).is_nil() { check_table(args, 4, "move")? } else { a1.clone() };
    if e >= f {
        if t > e || t <= f || !std::rc::Rc::ptr_eq(&a1, &a2) {
            for i in 0..=(e - f) {
                let v = a1.borrow().raw_get(&Value::Integer(f + i));
                a2.borrow_mut().raw_set(Value::Integer(t + i), v).map_err(LuaError::runtime)?;
            }
        } else {
            for i in (0..=(e - f)).rev() {
                let v = a1.borrow().raw_get(&Value::Integer(f + i));
                a2.borrow_mut().raw_set(Value::Integer(t + i), v).map_err(LuaError::runtime)?;
            }
        }
    }
    Ok(vec![Value::Table(a2)])
}
