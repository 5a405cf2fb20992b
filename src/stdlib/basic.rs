//! Basic library: globals installed directly into `_G` (spec.md §4.6).
//!
//! Grounded on the teacher's `stdlib/basic.rs` for the function roster and
//! error-message wording; re-targeted from stack-register returns to plain
//! `Vec<Value>`.

use std::rc::Rc;

use crate::error::{ErrorKind, LuaError, LuaResult};
use crate::interp::{operators, Interpreter};
use crate::lib_registry::LibraryModule;
use crate::value::Value;

use super::{arg, arg_error, check_integer, check_table, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("_G", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("print", print);
    f!("type", lua_type);
    f!("tostring", lua_tostring);
    f!("tonumber", tonumber);
    f!("ipairs", ipairs);
    f!("pairs", pairs);
    f!("next", next_fn);
    f!("select", select);
    f!("error", lua_error);
    f!("assert", assert);
    f!("pcall", pcall);
    f!("xpcall", xpcall);
    f!("setmetatable", setmetatable);
    f!("getmetatable", getmetatable);
    f!("rawget", rawget);
    f!("rawset", rawset);
    f!("rawequal", rawequal);
    f!("rawlen", rawlen);
    f!("require", crate::stdlib::package::require);
    f!("load", load);
    m.entries.push(crate::lib_registry::LibraryEntry::Value("_VERSION", || Value::from_string("Lua 5.4")));
    m
}

/// Installed separately by [`crate::interp::Interpreter::new`]'s caller
/// once `globals` exists, since `_G` must reference the table it lives in.
pub fn install_g_self_reference(interp: &mut Interpreter) {
    let g = Value::Table(interp.globals.clone());
    interp.set_global("_G", g);
}

fn print(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let mut out = String::new();
    for (i, v) in args.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&operators::tostring(interp, v)?);
    }
    println!("{out}");
    Ok(Vec::new())
}

fn lua_type(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::from_string(arg(args, 0).type_name())])
}

fn lua_tostring(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::from_string(operators::tostring(interp, &arg(args, 0))?)])
}

fn tonumber(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.len() >= 2 && !arg(args, 1).is_nil() {
        let base = check_integer(args, 1, "tonumber")?;
        if !(2..=36).contains(&base) {
            return Err(arg_error("tonumber", 2, "base out of range"));
        }
        let s = match arg(args, 0) {
            Value::Str(s) => s,
            other => return Err(arg_error("tonumber", 1, format!("string expected, got {}", other.type_name()))),
        };
        let text = s.to_string_lossy();
        let text = text.trim();
        let (neg, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if digits.is_empty() {
            return Ok(vec![Value::Nil]);
        }
        match i64::from_str_radix(digits, base as u32) {
            Ok(n) => Ok(vec![Value::Integer(if neg { -n } else { n })]),
            Err(_) => Ok(vec![Value::Nil]),
        }
    } else {
        Ok(vec![arg(args, 0).coerce_to_number().unwrap_or(Value::Nil)])
    }
}

fn ipairs_iter(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "ipairs")?;
    let i = check_integer(args, 1, "ipairs")? + 1;
    let v = t.borrow().raw_get(&Value::Integer(i));
    if v.is_nil() {
        Ok(vec![Value::Nil])
    } else {
        Ok(vec![Value::Integer(i), v])
    }
}

fn ipairs(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = arg(args, 0);
    if t.as_table().is_none() {
        return Err(arg_error("ipairs", 1, format!("table expected, got {}", t.type_name())));
    }
    Ok(vec![Value::native_fn("ipairs_iterator", ipairs_iter), t, Value::Integer(0)])
}

fn pairs(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = arg(args, 0);
    if let Some(handler) = operators::get_metamethod(interp, &t, "__pairs") {
        return crate::interp::call::call_value(interp, handler, vec![t], 0);
    }
    if t.as_table().is_none() {
        return Err(arg_error("pairs", 1, format!("table expected, got {}", t.type_name())));
    }
    Ok(vec![Value::native_fn("next", next_fn), t, Value::Nil])
}

fn next_fn(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "next")?;
    let key = arg(args, 1);
    match t.borrow().next(&key) {
        Ok(Some((k, v))) => Ok(vec![k, v]),
        Ok(None) => Ok(vec![Value::Nil]),
        Err(e) => Err(LuaError::library(e)),
    }
}

fn select(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let rest = &args[1.min(args.len())..];
    match arg(args, 0) {
        Value::Str(s) if s.as_bytes() == b"#" => Ok(vec![Value::Integer(rest.len() as i64)]),
        other => {
            let n = other
                .coerce_to_number()
                .and_then(|v| v.as_integer_exact())
                .ok_or_else(|| arg_error("select", 1, "number expected"))?;
            if n < 0 {
                let idx = rest.len() as i64 + n;
                if idx < 0 {
                    return Err(arg_error("select", 1, "index out of range"));
                }
                Ok(rest[idx as usize..].to_vec())
            } else if n == 0 {
                Err(arg_error("select", 1, "index out of range"))
            } else {
                Ok(rest.iter().skip(n as usize - 1).cloned().collect())
            }
        }
    }
}

fn lua_error(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let message = arg(args, 0);
    let level = opt_integer(args, 1, "error", 1)?;
    let value = if level != 0 {
        if let Value::Str(s) = &message {
            Value::from_string(format!("{}: {}", interp.chunk_name, s.to_string_lossy()))
        } else {
            message
        }
    } else {
        message
    };
    Err(LuaError::new(ErrorKind::RuntimeError, value))
}

fn assert(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if arg(args, 0).is_truthy() {
        Ok(args.to_vec())
    } else if args.len() >= 2 {
        Err(LuaError::new(ErrorKind::RuntimeError, arg(args, 1)))
    } else {
        Err(LuaError::runtime("assertion failed!"))
    }
}

fn pcall(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.is_empty() {
        return Err(arg_error("pcall", 1, "value expected"));
    }
    Ok(crate::interp::call::pcall(interp, args[0].clone(), args[1..].to_vec()))
}

fn xpcall(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.len() < 2 {
        return Err(arg_error("xpcall", 2, "value expected"));
    }
    Ok(crate::interp::call::xpcall(interp, args[0].clone(), args[1].clone(), args[2..].to_vec()))
}

fn setmetatable(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "setmetatable")?;
    if let Some(mt) = &t.borrow().metatable {
        if !mt.borrow().raw_get(&Value::from_string("__metatable")).is_nil() {
            return Err(LuaError::runtime("cannot change a protected metatable"));
        }
    }
    match arg(args, 1) {
        Value::Nil => t.borrow_mut().metatable = None,
        Value::Table(mt) => t.borrow_mut().metatable = Some(mt),
        other => return Err(arg_error("setmetatable", 2, format!("nil or table expected, got {}", other.type_name()))),
    }
    Ok(vec![Value::Table(t)])
}

fn getmetatable(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let v = arg(args, 0);
    let Some(mt) = operators::metatable_of(interp, &v) else { return Ok(vec![Value::Nil]) };
    let protected = mt.borrow().raw_get(&Value::from_string("__metatable"));
    if !protected.is_nil() {
        Ok(vec![protected])
    } else {
        Ok(vec![Value::Table(mt)])
    }
}

fn rawget(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "rawget")?;
    Ok(vec![t.borrow().raw_get(&arg(args, 1))])
}

fn rawset(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_table(args, 0, "rawset")?;
    t.borrow_mut().raw_set(arg(args, 1), arg(args, 2)).map_err(LuaError::runtime)?;
    Ok(vec![Value::Table(t)])
}

fn rawequal(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Boolean(arg(args, 0) == arg(args, 1))])
}

fn rawlen(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    match arg(args, 0) {
        Value::Table(t) => Ok(vec![Value::Integer(t.borrow().length())]),
        Value::Str(s) => Ok(vec![Value::Integer(s.len() as i64)]),
        other => Err(arg_error("rawlen", 1, format!("table or string expected, got {}", other.type_name()))),
    }
}

/// `load(chunk [, chunkname [, mode [, env]]])`. Only string chunks are
/// supported (a function chunk reader would need to repeatedly call back
/// into Lua to accumulate source, which this tree-walking core has no use
/// for beyond what `require`'s filesystem searcher already does).
fn load(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_load() {
        return Ok(vec![Value::Nil, Value::from_string("dynamic loading not supported")]);
    }
    let source = match arg(args, 0) {
        Value::Str(s) => s,
        other => {
            return Ok(vec![
                Value::Nil,
                Value::from_string(format!("load of {} chunks is not supported", other.type_name())),
            ])
        }
    };
    let chunk_name = match arg(args, 1) {
        Value::Str(s) => s.to_string_lossy().into_owned(),
        _ => "=(load)".to_string(),
    };
    match crate::parser::parse(source.as_bytes(), &chunk_name) {
        Ok(block) => {
            let body = Rc::new(block);
            let closure = crate::value::Closure {
                params: Vec::new(),
                is_vararg: true,
                body,
                upvalues: crate::interp::call::root_scope(),
                name: std::cell::RefCell::new(Some(chunk_name)),
            };
            Ok(vec![Value::Function(Rc::new(crate::value::Function::Lua(closure)))])
        }
        Err(diags) => {
            let msg = diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n");
            Ok(vec![Value::Nil, Value::from_string(msg)])
        }
    }
}
