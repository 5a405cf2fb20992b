//! `string.pack`/`string.unpack`/`string.packsize` (SPEC_FULL.md supplement,
//! grounded on the teacher's `stdlib/string/pack.rs`): binary packing with
//! the standard format letters `<>=!bBhHiIlLjJTfdsczn` and repeat/size
//! counts. Alignment (`!n`) is accepted syntactically but has no effect —
//! this engine never needs to match a C struct's padding, only round-trip
//! through `pack`/`unpack` itself.

use crate::error::{LuaError, LuaResult};
use crate::interp::Interpreter;
use crate::value::Value;

use super::super::{arg_error, check_integer, check_str};

#[derive(Clone, Copy, PartialEq)]
enum Endian {
    Little,
    Big,
}

enum Item {
    Int { size: usize, signed: bool },
    Float,
    Double,
    FixedStr(usize),
    LenPrefixedStr(usize),
    ZeroStr,
    Padding,
}

struct FormatIter<'a> {
    bytes: &'a [u8],
    i: usize,
    endian: Endian,
}

fn native_endian() -> Endian {
    Endian::Little
}

impl<'a> FormatIter<'a> {
    fn new(fmt: &'a [u8]) -> Self {
        FormatIter { bytes: fmt, i: 0, endian: native_endian() }
    }

    fn read_count(&mut self, default: usize) -> LuaResult<usize> {
        let start = self.i;
        while matches!(self.bytes.get(self.i), Some(c) if c.is_ascii_digit()) {
            self.i += 1;
        }
        if self.i > start {
            std::str::from_utf8(&self.bytes[start..self.i])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| LuaError::library("invalid format string"))
        } else {
            Ok(default)
        }
    }

    fn next_item(&mut self) -> LuaResult<Option<(Item, Endian)>> {
        loop {
            let Some(&c) = self.bytes.get(self.i) else { return Ok(None) };
            self.i += 1;
            match c {
                b' ' => continue,
                b'<' => {
                    self.endian = Endian::Little;
                    continue;
                }
                b'>' => {
                    self.endian = Endian::Big;
                    continue;
                }
                b'=' => {
                    self.endian = native_endian();
                    continue;
                }
                b'!' => {
                    self.read_count(8)?;
                    continue;
                }
                b'b' => return Ok(Some((Item::Int { size: 1, signed: true }, self.endian))),
                b'B' => return Ok(Some((Item::Int { size: 1, signed: false }, self.endian))),
                b'h' => return Ok(Some((Item::Int { size: 2, signed: true }, self.endian))),
                b'H' => return Ok(Some((Item::Int { size: 2, signed: false }, self.endian))),
                b'i' => {
                    let size = self.read_count(4)?;
                    return Ok(Some((Item::Int { size, signed: true }, self.endian)));
                }
                b'I' => {
                    let size = self.read_count(4)?;
                    return Ok(Some((Item::Int { size, signed: false }, self.endian)));
                }
                b'l' => return Ok(Some((Item::Int { size: 8, signed: true }, self.endian))),
                b'L' => return Ok(Some((Item::Int { size: 8, signed: false }, self.endian))),
                b'j' => return Ok(Some((Item::Int { size: 8, signed: true }, self.endian))),
                b'J' => return Ok(Some((Item::Int { size: 8, signed: false }, self.endian))),
                b'T' => return Ok(Some((Item::Int { size: 8, signed: false }, self.endian))),
                b'f' => return Ok(Some((Item::Float, self.endian))),
                b'd' | b'n' => return Ok(Some((Item::Double, self.endian))),
                b's' => {
                    let size = self.read_count(8)?;
                    return Ok(Some((Item::LenPrefixedStr(size), self.endian)));
                }
                b'c' => {
                    let size = self.read_count(0)?;
                    return Ok(Some((Item::FixedStr(size), self.endian)));
                }
                b'z' => return Ok(Some((Item::ZeroStr, self.endian))),
                b'x' => return Ok(Some((Item::Padding, self.endian))),
                other => return Err(LuaError::library(format!("invalid format option '{}'", other as char))),
            }
        }
    }
}

pub fn pack(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let fmt = check_str(args, 0, "pack")?;
    let mut iter = FormatIter::new(fmt.as_bytes());
    let mut out = Vec::new();
    let mut arg_idx = 1usize;

    while let Some((item, endian)) = iter.next_item()? {
        match item {
            Item::Padding => out.push(0),
            Item::Int { size, .. } => {
                let n = check_integer(args, arg_idx, "pack")?;
                write_int(&mut out, n, size, endian);
                arg_idx += 1;
            }
            Item::Float => {
                let n = super::super::check_number(args, arg_idx, "pack")? as f32;
                write_bytes(&mut out, &n.to_le_bytes(), endian);
                arg_idx += 1;
            }
            Item::Double => {
                let n = super::super::check_number(args, arg_idx, "pack")?;
                write_bytes(&mut out, &n.to_le_bytes(), endian);
                arg_idx += 1;
            }
            Item::FixedStr(size) => {
                let s = check_str(args, arg_idx, "pack")?;
                let bytes = s.as_bytes();
                if bytes.len() > size {
                    return Err(arg_error("pack", arg_idx + 1, "string longer than given size"));
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + (size - bytes.len()), 0);
                arg_idx += 1;
            }
            Item::LenPrefixedStr(size) => {
                let s = check_str(args, arg_idx, "pack")?;
                write_int(&mut out, s.len() as i64, size, endian);
                out.extend_from_slice(s.as_bytes());
                arg_idx += 1;
            }
            Item::ZeroStr => {
                let s = check_str(args, arg_idx, "pack")?;
                if s.as_bytes().contains(&0) {
                    return Err(arg_error("pack", arg_idx + 1, "string contains zeros"));
                }
                out.extend_from_slice(s.as_bytes());
                out.push(0);
                arg_idx += 1;
            }
        }
    }
    Ok(vec![Value::from_bytes(&out)])
}

fn write_bytes(out: &mut Vec<u8>, le_bytes: &[u8], endian: Endian) {
    if endian == Endian::Little {
        out.extend_from_slice(le_bytes);
    } else {
        out.extend(le_bytes.iter().rev());
    }
}

fn write_int(out: &mut Vec<u8>, n: i64, size: usize, endian: Endian) {
    let full = (n as i128 as u128).to_le_bytes();
    write_bytes(out, &full[..size.min(16)], endian);
}

pub fn unpack(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let fmt = check_str(args, 0, "unpack")?;
    let data = check_str(args, 1, "unpack")?;
    let bytes = data.as_bytes();
    let mut pos = (super::super::opt_integer(args, 2, "unpack", 1)? - 1).max(0) as usize;

    let mut iter = FormatIter::new(fmt.as_bytes());
    let mut results = Vec::new();

    while let Some((item, endian)) = iter.next_item()? {
        match item {
            Item::Padding => pos += 1,
            Item::Int { size, signed } => {
                let slice = slice_at(bytes, pos, size)?;
                results.push(Value::Integer(read_int(slice, size, signed, endian)));
                pos += size;
            }
            Item::Float => {
                let slice = slice_at(bytes, pos, 4)?;
                let le = reordered(slice, endian);
                results.push(Value::Float(f32::from_le_bytes(le.try_into().unwrap()) as f64));
                pos += 4;
            }
            Item::Double => {
                let slice = slice_at(bytes, pos, 8)?;
                let le = reordered(slice, endian);
                results.push(Value::Float(f64::from_le_bytes(le.try_into().unwrap())));
                pos += 8;
            }
            Item::FixedStr(size) => {
                let slice = slice_at(bytes, pos, size)?;
                results.push(Value::from_bytes(slice));
                pos += size;
            }
            Item::LenPrefixedStr(size) => {
                let len_slice = slice_at(bytes, pos, size)?;
                let len = read_int(len_slice, size, false, endian) as usize;
                pos += size;
                let slice = slice_at(bytes, pos, len)?;
                results.push(Value::from_bytes(slice));
                pos += len;
            }
            Item::ZeroStr => {
                let end = bytes[pos..].iter().position(|&b| b == 0).ok_or_else(|| LuaError::library("unfinished string for format 'z'"))?;
                results.push(Value::from_bytes(&bytes[pos..pos + end]));
                pos += end + 1;
            }
        }
    }
    results.push(Value::Integer(pos as i64 + 1));
    Ok(results)
}

fn slice_at(bytes: &[u8], pos: usize, size: usize) -> LuaResult<&[u8]> {
    bytes.get(pos..pos + size).ok_or_else(|| LuaError::library("data string too short"))
}

fn reordered(slice: &[u8], endian: Endian) -> Vec<u8> {
    if endian == Endian::Little {
        slice.to_vec()
    } else {
        slice.iter().rev().copied().collect()
    }
}

fn read_int(slice: &[u8], size: usize, signed: bool, endian: Endian) -> i64 {
    let le = reordered(slice, endian);
    let mut buf = [0u8; 16];
    buf[..size].copy_from_slice(&le);
    let unsigned = u128::from_le_bytes(buf);
    if signed && size < 16 {
        let shift = (16 - size) * 8;
        ((unsigned << shift) as i128 >> shift) as i64
    } else {
        unsigned as i64
    }
}

pub fn packsize(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let fmt = check_str(args, 0, "packsize")?;
    let mut iter = FormatIter::new(fmt.as_bytes());
    let mut total = 0usize;
    while let Some((item, _)) = iter.next_item()? {
        total += match item {
            Item::Padding => 1,
            Item::Int { size, .. } => size,
            Item::Float => 4,
            Item::Double => 8,
            Item::FixedStr(size) => size,
            Item::ZeroStr | Item::LenPrefixedStr(_) => {
                return Err(LuaError::library("variable-size format in packsize"))
            }
        };
    }
    Ok(vec![Value::Integer(total as i64)])
}
