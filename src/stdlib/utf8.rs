//! `utf8` library (spec.md §4.6). Grounded on the teacher's `stdlib/utf8.rs`
//! decoder; operates on raw bytes since [`crate::value::LuaStr`] is a byte
//! string, not necessarily valid UTF-8.

use crate::error::{LuaError, LuaResult};
use crate::interp::Interpreter;
use crate::lib_registry::LibraryModule;
use crate::value::Value;

use super::{arg_error, check_str, opt_integer};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("utf8", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("char", char_fn);
    f!("codepoint", codepoint);
    f!("len", len);
    f!("offset", offset);
    f!("codes", codes);
    m.entries.push(crate::lib_registry::LibraryEntry::Value("charpattern", || {
        Value::from_string("[\0-\u{7F}\u{C2}-\u{FD}][\u{80}-\u{BF}]*")
    }));
    m
}

/// Decodes one UTF-8 sequence starting at `bytes[i]`. Returns the codepoint
/// and the byte length consumed, or `None` on malformed input.
fn decode_at(bytes: &[u8], i: usize) -> Option<(u32, usize)> {
    let b0 = *bytes.get(i)?;
    let (len, mut cp, min) = if b0 < 0x80 {
        return Some((b0 as u32, 1));
    } else if b0 & 0xE0 == 0xC0 {
        (2, (b0 & 0x1F) as u32, 0x80)
    } else if b0 & 0xF0 == 0xE0 {
        (3, (b0 & 0x0F) as u32, 0x800)
    } else if b0 & 0xF8 == 0xF0 {
        (4, (b0 & 0x07) as u32, 0x10000)
    } else {
        return None;
    };
    for k in 1..len {
        let b = *bytes.get(i + k)?;
        if b & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | (b & 0x3F) as u32;
    }
    if cp < min || cp > 0x7FFFFFFF {
        return None;
    }
    Some((cp, len))
}

fn encode_codepoint(cp: u32, out: &mut Vec<u8>) -> Result<(), ()> {
    if cp < 0x80 {
        out.push(cp as u8);
    } else if cp < 0x800 {
        out.push(0xC0 | (cp >> 6) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else if cp < 0x10000 {
        out.push(0xE0 | (cp >> 12) as u8);
        out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else if cp < 0x200000 {
        out.push(0xF0 | (cp >> 18) as u8);
        out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
        out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else {
        return Err(());
    }
    Ok(())
}

fn char_fn(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let mut out = Vec::new();
    for i in 0..args.len() {
        let cp = super::check_integer(args, i, "char")?;
        if cp < 0 || encode_codepoint(cp as u32, &mut out).is_err() {
            return Err(arg_error("char", i + 1, "value out of range"));
        }
    }
    Ok(vec![Value::from_string(String::from_utf8_lossy(&out).into_owned())])
}

/// Resolves a 1-based, possibly negative, string-relative position to a
/// 0-based byte offset, the same convention [`super::str_index`] uses.
fn byte_pos(i: i64, len: usize) -> i64 {
    if i >= 0 { i } else { len as i64 + i + 1 }
}

fn codepoint(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "codepoint")?;
    let bytes = s.as_bytes();
    let len = bytes.len();
    let i = opt_integer(args, 1, "codepoint", 1)?;
    let j = opt_integer(args, 2, "codepoint", i)?;
    let start = byte_pos(i, len);
    let end = byte_pos(j, len);
    if start < 1 || end as usize > len {
        return Err(arg_error("codepoint", 2, "out of bounds"));
    }
    let mut out = Vec::new();
    let mut pos = (start - 1) as usize;
    while pos < end as usize {
        let (cp, used) = decode_at(bytes, pos).ok_or_else(|| LuaError::library("invalid UTF-8 code"))?;
        out.push(Value::Integer(cp as i64));
        pos += used;
    }
    Ok(out)
}

fn len(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "len")?;
    let bytes = s.as_bytes();
    let blen = bytes.len();
    let i = opt_integer(args, 1, "len", 1)?;
    let j = opt_integer(args, 2, "len", -1)?;
    let start = byte_pos(i, blen).max(1);
    let end = byte_pos(j, blen);

    let mut pos = (start - 1) as usize;
    let mut count = 0i64;
    while (pos as i64) < end {
        match decode_at(bytes, pos) {
            Some((_, used)) => {
                pos += used;
                count += 1;
            }
            None => return Ok(vec![Value::Nil, Value::Integer(pos as i64 + 1)]),
        }
    }
    Ok(vec![Value::Integer(count)])
}

fn offset(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "offset")?;
    let bytes = s.as_bytes();
    let blen = bytes.len();
    let n = super::check_integer(args, 1, "offset")?;
    let default_i = if n >= 0 { 1 } else { blen as i64 + 1 };
    let i = opt_integer(args, 2, "offset", default_i)?;
    let mut pos = byte_pos(i, blen) - 1;

    let is_cont = |p: i64| -> bool { p >= 0 && (p as usize) < blen && bytes[p as usize] & 0xC0 == 0x80 };

    if n == 0 {
        while is_cont(pos) {
            pos -= 1;
        }
        return Ok(vec![Value::Integer(pos + 1)]);
    }

    let mut n = n;
    if n > 0 {
        if pos < blen as i64 && is_cont(pos) {
            return Err(LuaError::library("initial position is a continuation byte"));
        }
        n -= 1;
        while n > 0 && pos < blen as i64 {
            pos += 1;
            while is_cont(pos) {
                pos += 1;
            }
            n -= 1;
        }
        if n > 0 {
            return Ok(vec![Value::Nil]);
        }
    } else {
        if pos < blen as i64 && is_cont(pos) {
            return Err(LuaError::library("initial position is a continuation byte"));
        }
        while n < 0 && pos > 0 {
            pos -= 1;
            while is_cont(pos) {
                pos -= 1;
            }
            n += 1;
        }
        if n < 0 {
            return Ok(vec![Value::Nil]);
        }
    }
    Ok(vec![Value::Integer(pos + 1)])
}

/// `utf8.codes(s)`: a stateless iterator factory. The control variable is the
/// previous byte position, so no upvalue state table is needed — unlike
/// [`super::string::gmatch`], the generic-for protocol carries everything.
fn codes(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "codes")?;
    Ok(vec![Value::native_fn("utf8.codes_iterator", codes_iterator), Value::Str(s), Value::Integer(0)])
}

fn codes_iterator(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let s = check_str(args, 0, "codes")?;
    let bytes = s.as_bytes();
    let prev = super::check_integer(args, 1, "codes")?;
    let mut pos = prev as usize;
    if pos > 0 {
        let (_, used) = decode_at(bytes, pos - 1).ok_or_else(|| LuaError::library("invalid UTF-8 code"))?;
        pos = pos - 1 + used;
    }
    if pos >= bytes.len() {
        return Ok(vec![Value::Nil]);
    }
    let (cp, _) = decode_at(bytes, pos).ok_or_else(|| LuaError::library("invalid UTF-8 code"))?;
    Ok(vec![Value::Integer(pos as i64 + 1), Value::Integer(cp as i64)])
}
