//! `string` library (spec.md §4.6, §4.8).
//!
//! Grounded on the teacher's `stdlib/string/mod.rs` plus `pattern/engine.rs`
//! for `find`/`match`/`gmatch`/`gsub`, re-targeted at [`crate::pattern`]
//! (byte-based already, same as the teacher).

mod format;
mod pack;

use crate::error::{LuaError, LuaResult};
use crate::interp::{call, Interpreter};
use crate::lib_registry::LibraryModule;
use crate::value::{Table, Value};

use super::{arg, arg_error, check_integer, check_str, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("string", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("len", len);
    f!("sub", sub);
    f!("upper", upper);
    f!("lower", lower);
    f!("reverse", reverse);
    f!("rep", rep);
    f!("byte", byte);
    f!("char", char_fn);
    f!("find", find);
    f!("match", match_fn);
    f!("gmatch", gmatch);
    f!("gmatch_iterator", gmatch_iterator);
    f!("gsub", gsub);
    f!("format", format::format);
    f!("pack", pack::pack);
    f!("unpack", pack::unpack);
    f!("packsize", pack::packsize);
    m
}

/// Lua's 1-based, negative-from-end string index, clamped to `[1, len+1]`
/// for a start position or `[0, len]` for an end position.
fn str_index(i: i64, len: usize, is_end: bool) -> i64 {
    let len = len as i64;
    let i = if i < 0 { (len + i + 1).max(0) } else { i };
    if is_end {
        i.min(len)
    } else {
        i.max(1)
    }
}

fn len(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Integer(check_str(args, 0, "len")?.len() as i64)])
}

fn sub(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "sub")?;
    let bytes = s.as_bytes();
    let i = str_index(opt_integer(args, 1, "sub", 1)?, bytes.len(), false);
    let j = str_index(opt_integer(args, 2, "sub", -1)?, bytes.len(), true);
    if i > j {
        return Ok(vec![Value::from_string("")]);
    }
    Ok(vec![Value::from_bytes(&bytes[(i - 1) as usize..j as usize])])
}

fn upper(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "upper")?;
    Ok(vec![Value::from_bytes(&s.as_bytes().iter().map(|b| b.to_ascii_uppercase()).collect::<Vec<u8>>())])
}

fn lower(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "lower")?;
    Ok(vec![Value::from_bytes(&s.as_bytes().iter().map(|b| b.to_ascii_lowercase()).collect::<Vec<u8>>())])
}

fn reverse(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "reverse")?;
    let mut bytes = s.as_bytes().to_vec();
    bytes.reverse();
    Ok(vec![Value::from_bytes(&bytes)])
}

fn rep(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "rep")?;
    let n = check_integer(args, 1, "rep")?;
    let sep = if args.len() >= 3 && !arg(args, 2).is_nil() { check_str(args, 2, "rep")?.as_bytes().to_vec() } else { Vec::new() };
    if n <= 0 {
        return Ok(vec![Value::from_string("")]);
    }
    let mut out = Vec::with_capacity(s.len() * n as usize);
    for i in 0..n {
        if i > 0 {
            out.extend_from_slice(&sep);
        }
        out.extend_from_slice(s.as_bytes());
    }
    Ok(vec![Value::from_bytes(&out)])
}

fn byte(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "byte")?;
    let bytes = s.as_bytes();
    let i = str_index(opt_integer(args, 1, "byte", 1)?, bytes.len(), false);
    let j = str_index(opt_integer(args, 2, "byte", i)?, bytes.len(), true);
    if i > j {
        return Ok(Vec::new());
    }
    Ok(bytes[(i - 1) as usize..j as usize].iter().map(|b| Value::Integer(*b as i64)).collect())
}

fn char_fn(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let mut bytes = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        let code = check_integer(args, i, "char")?;
        if !(0..=255).contains(&code) {
            return Err(arg_error("char", i + 1, "value out of range"));
        }
        bytes.push(code as u8);
    }
    Ok(vec![Value::from_bytes(&bytes)])
}

fn capture_values(src: &[u8], m: &crate::pattern::MatchResult) -> Vec<Value> {
    if m.captures.is_empty() {
        vec![Value::from_bytes(&src[m.start..m.end])]
    } else {
        m.captures
            .iter()
            .map(|c| if c.is_position { Value::Integer(c.start as i64 + 1) } else { Value::from_bytes(&src[c.start..c.end]) })
            .collect()
    }
}

fn find(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "find")?;
    let pat = check_str(args, 1, "find")?;
    let bytes = s.as_bytes();
    let init = str_index(opt_integer(args, 2, "find", 1)?, bytes.len(), false) as usize - 1;
    let plain = args.len() >= 4 && arg(args, 3).is_truthy();

    if init > bytes.len() {
        return Ok(vec![Value::Nil]);
    }

    if plain || !pat.as_bytes().iter().any(|b| b"^$*+?.([%-".contains(b)) {
        return Ok(match find_plain(bytes, pat.as_bytes(), init) {
            Some(pos) => vec![Value::Integer(pos as i64 + 1), Value::Integer((pos + pat.len()) as i64)],
            None => vec![Value::Nil],
        });
    }

    match crate::pattern::search(bytes, pat.as_bytes(), init).map_err(LuaError::library)? {
        Some(m) => {
            let mut out = vec![Value::Integer(m.start as i64 + 1), Value::Integer(m.end as i64)];
            out.extend(m.captures.iter().map(|c| {
                if c.is_position { Value::Integer(c.start as i64 + 1) } else { Value::from_bytes(&bytes[c.start..c.end]) }
            }));
            Ok(out)
        }
        None => Ok(vec![Value::Nil]),
    }
}

fn find_plain(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    haystack.get(from..)?.windows(needle.len()).position(|w| w == needle).map(|p| p + from)
}

fn match_fn(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "match")?;
    let pat = check_str(args, 1, "match")?;
    let bytes = s.as_bytes();
    let init = str_index(opt_integer(args, 2, "match", 1)?, bytes.len(), false) as usize - 1;
    if init > bytes.len() {
        return Ok(vec![Value::Nil]);
    }
    match crate::pattern::search(bytes, pat.as_bytes(), init).map_err(LuaError::library)? {
        Some(m) => Ok(capture_values(bytes, &m)),
        None => Ok(vec![Value::Nil]),
    }
}

fn gmatch(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "gmatch")?;
    let pat = check_str(args, 1, "gmatch")?;
    let mut state = Table::new();
    let _ = state.raw_set(Value::from_string("src"), Value::Str(s));
    let _ = state.raw_set(Value::from_string("pat"), Value::Str(pat));
    let _ = state.raw_set(Value::from_string("pos"), Value::Integer(0));
    Ok(vec![Value::native_fn("gmatch_iterator", gmatch_iterator), Value::new_table(state), Value::Nil])
}

/// The iterator function returned by [`gmatch`]. Ignores the generic-for
/// control value — the scan position lives as a mutable field on the
/// invariant state table instead, since a plain `fn` pointer has no
/// upvalues to close over (spec.md §5: "iterators must be yield-transparent",
/// trivially true here since this never calls back into Lua).
fn gmatch_iterator(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let state = super::check_table(args, 0, "gmatch")?;
    let src = match state.borrow().raw_get(&Value::from_string("src")) {
        Value::Str(s) => s,
        _ => return Ok(Vec::new()),
    };
    let pat = match state.borrow().raw_get(&Value::from_string("pat")) {
        Value::Str(s) => s,
        _ => return Ok(Vec::new()),
    };
    let pos = match state.borrow().raw_get(&Value::from_string("pos")) {
        Value::Integer(i) => i as usize,
        _ => 0,
    };
    let bytes = src.as_bytes();
    if pos > bytes.len() {
        return Ok(Vec::new());
    }
    match crate::pattern::search(bytes, pat.as_bytes(), pos).map_err(LuaError::library)? {
        Some(m) => {
            let next_pos = if m.end > m.start { m.end } else { m.end + 1 };
            let _ = state.borrow_mut().raw_set(Value::from_string("pos"), Value::Integer(next_pos as i64));
            Ok(capture_values(bytes, &m))
        }
        None => Ok(Vec::new()),
    }
}

fn gsub(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "gsub")?;
    let pat = check_str(args, 1, "gsub")?;
    let repl = arg(args, 2);
    let max_n = opt_integer(args, 3, "gsub", i64::MAX)?;
    let bytes = s.as_bytes();

    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0usize;
    let mut count = 0i64;

    while pos <= bytes.len() && count < max_n {
        let Some(m) = crate::pattern::search(bytes, pat.as_bytes(), pos).map_err(LuaError::library)? else { break };
        out.extend_from_slice(&bytes[pos..m.start]);
        let whole = &bytes[m.start..m.end];
        let caps = capture_values(bytes, &m);

        let replacement = match &repl {
            Value::Str(r) => Some(expand_replacement(r.as_bytes(), whole, &caps)?),
            Value::Table(t) => {
                let key = caps[0].clone();
                let v = t.borrow().raw_get(&key);
                replacement_value(v, whole)?
            }
            Value::Function(_) => {
                let results = call::call_value(interp, repl.clone(), caps.clone(), 0)?;
                replacement_value(results.into_iter().next().unwrap_or(Value::Nil), whole)?
            }
            other => return Err(arg_error("gsub", 3, format!("string/function/table expected, got {}", other.type_name()))),
        };
        match replacement {
            Some(bytes) => out.extend_from_slice(&bytes),
            None => out.extend_from_slice(whole),
        }

        count += 1;
        pos = if m.end > m.start { m.end } else {
            if m.end < bytes.len() {
                out.push(bytes[m.end]);
            }
            m.end + 1
        };
        if pat.as_bytes().first() == Some(&b'^') {
            break;
        }
    }
    if pos < bytes.len() {
        out.extend_from_slice(&bytes[pos..]);
    }
    Ok(vec![Value::from_bytes(&out), Value::Integer(count)])
}

fn replacement_value(v: Value, whole: &[u8]) -> LuaResult<Option<Vec<u8>>> {
    match v {
        Value::Nil | Value::Boolean(false) => Ok(None),
        Value::Str(s) => Ok(Some(s.as_bytes().to_vec())),
        Value::Integer(_) | Value::Float(_) => Ok(Some(crate::value::tostring_basic(&v).into_bytes())),
        other => {
            let _ = whole;
            Err(LuaError::library(format!("invalid replacement value (a {})", other.type_name())))
        }
    }
}

fn expand_replacement(template: &[u8], whole: &[u8], caps: &[Value]) -> LuaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        if template[i] == b'%' && i + 1 < template.len() {
            let c = template[i + 1];
            if c == b'%' {
                out.push(b'%');
            } else if c == b'0' {
                out.extend_from_slice(whole);
            } else if c.is_ascii_digit() {
                let idx = (c - b'1') as usize;
                match caps.get(idx) {
                    Some(Value::Str(s)) => out.extend_from_slice(s.as_bytes()),
                    Some(v) => out.extend_from_slice(crate::value::tostring_basic(v).as_bytes()),
                    None => return Err(LuaError::library("invalid capture index in replacement string")),
                }
            } else {
                return Err(LuaError::library("invalid use of '%' in replacement string"));
            }
            i += 2;
        } else {
            out.push(template[i]);
            i += 1;
        }
    }
    Ok(out)
}
