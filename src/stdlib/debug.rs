//! `debug` library (spec.md §4.6) — a stub, per SPEC_FULL.md's decision that
//! a tree-walking interpreter with no register stack or bytecode has nothing
//! meaningful to report beyond source location and a textual traceback.
//! Gated behind `Trusted` since it can otherwise leak host details.

use crate::error::LuaResult;
use crate::interp::Interpreter;
use crate::lib_registry::LibraryModule;
use crate::value::{Table, Value};

use super::{arg, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("debug", crate::interp::StdlibTrustLevel::Trusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("traceback", traceback);
    f!("getinfo", getinfo);
    f!("sethook", sethook);
    f!("gethook", gethook);
    m
}

fn traceback(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let message = match arg(args, 0) {
        Value::Nil => String::new(),
        Value::Str(s) => format!("{}\n", s.to_string_lossy()),
        other => return Ok(vec![other]),
    };
    let mut out = format!("{message}stack traceback:");
    for frame in interp.call_stack.iter().rev() {
        out.push_str(&format!("\n\t{}: in {}", interp.chunk_name, frame.name));
    }
    Ok(vec![Value::from_string(out)])
}

/// `debug.getinfo(f|level [, what])`. Only the fields this interpreter can
/// actually know about are populated: `short_src`, `what`, `source`, `name`.
/// Bytecode-only fields (`nparams`, `nups`, register counts) and
/// `currentline` (no per-call-site line is tracked on [`crate::interp::CallFrame`])
/// have no counterpart here and are omitted rather than faked.
fn getinfo(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let mut tbl = Table::new();
    let source = format!("@{}", interp.chunk_name);
    let _ = tbl.raw_set(Value::from_string("source"), Value::from_string(source.clone()));
    let _ = tbl.raw_set(Value::from_string("short_src"), Value::from_string(interp.chunk_name.clone()));

    match arg(args, 0) {
        Value::Function(f) => {
            let what = match f.as_ref() {
                crate::value::Function::Lua(_) => "Lua",
                crate::value::Function::Native { .. } => "C",
            };
            let _ = tbl.raw_set(Value::from_string("what"), Value::from_string(what));
        }
        _ => {
            let level = opt_integer(args, 0, "getinfo", 1)?;
            let frame = interp.call_stack.iter().rev().nth(level.max(0) as usize);
            let _ = tbl.raw_set(Value::from_string("what"), Value::from_string("Lua"));
            let _ = tbl.raw_set(
                Value::from_string("name"),
                frame.map(|f| Value::from_string(f.name.clone())).unwrap_or(Value::Nil),
            );
        }
    }
    Ok(vec![Value::new_table(tbl)])
}

/// No-op: this interpreter has no hook/instruction-count infrastructure to
/// attach to.
fn sethook(_interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![])
}

fn gethook(_interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Nil])
}
