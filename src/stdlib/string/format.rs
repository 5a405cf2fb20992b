//! `string.format` (spec.md §4.6): a printf-style formatter supporting
//! `%s %q %d %i %u %o %x %X %e %E %f %g %G %c %%` with the usual
//! flags/width/precision grammar. Grounded on the teacher's
//! `stdlib/string/format.rs`.

use crate::error::{LuaError, LuaResult};
use crate::interp::{operators, Interpreter};
use crate::value::Value;

use super::super::arg_error;

struct Spec {
    flags: String,
    width: Option<usize>,
    precision: Option<usize>,
    conv: u8,
}

pub fn format(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let fmt = super::super::check_str(args, 0, "format")?;
    let template = fmt.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(template.len());
    let mut arg_idx = 1usize;
    let mut i = 0usize;

    while i < template.len() {
        if template[i] != b'%' {
            out.push(template[i]);
            i += 1;
            continue;
        }
        i += 1;
        if template.get(i) == Some(&b'%') {
            out.push(b'%');
            i += 1;
            continue;
        }
        let (spec, next) = parse_spec(template, i)?;
        i = next;
        let value = args.get(arg_idx).cloned().unwrap_or(Value::Nil);
        let rendered = render(interp, &spec, &value, arg_idx)?;
        out.extend_from_slice(rendered.as_bytes());
        arg_idx += 1;
    }
    Ok(vec![Value::from_bytes(&out)])
}

fn parse_spec(template: &[u8], mut i: usize) -> LuaResult<(Spec, usize)> {
    let start = i;
    while matches!(template.get(i), Some(b'-') | Some(b'+') | Some(b' ') | Some(b'#') | Some(b'0')) {
        i += 1;
    }
    let flags = String::from_utf8_lossy(&template[start..i]).into_owned();

    let wstart = i;
    while matches!(template.get(i), Some(c) if c.is_ascii_digit()) {
        i += 1;
    }
    let width = if i > wstart { std::str::from_utf8(&template[wstart..i]).ok().and_then(|s| s.parse().ok()) } else { None };

    let precision = if template.get(i) == Some(&b'.') {
        i += 1;
        let pstart = i;
        while matches!(template.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
        Some(std::str::from_utf8(&template[pstart..i]).ok().and_then(|s| s.parse().ok()).unwrap_or(0))
    } else {
        None
    };

    let Some(&conv) = template.get(i) else { return Err(LuaError::library("invalid conversion to 'format'")) };
    i += 1;
    Ok((Spec { flags, width, precision, conv }, i))
}

fn pad(s: String, spec: &Spec) -> String {
    let Some(width) = spec.width else { return s };
    if s.len() >= width {
        return s;
    }
    let fill = width - s.len();
    if spec.flags.contains('-') {
        format!("{s}{}", " ".repeat(fill))
    } else if spec.flags.contains('0') && !s.starts_with(' ') {
        let (sign, rest) = if s.starts_with('-') || s.starts_with('+') { s.split_at(1) } else { ("", s.as_str()) };
        format!("{sign}{}{rest}", "0".repeat(fill))
    } else {
        format!("{}{s}", " ".repeat(fill))
    }
}

fn sign_prefix(spec: &Spec, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if spec.flags.contains('+') {
        "+"
    } else if spec.flags.contains(' ') {
        " "
    } else {
        ""
    }
}

fn render(interp: &mut Interpreter, spec: &Spec, value: &Value, arg_n: usize) -> LuaResult<String> {
    match spec.conv {
        b's' => {
            let mut s = operators::tostring(interp, value)?;
            if let Some(p) = spec.precision {
                s.truncate(p);
            }
            Ok(pad(s, spec))
        }
        b'q' => Ok(quote(value)),
        b'd' | b'i' => {
            let n = require_integer(value, arg_n)?;
            let body = n.unsigned_abs().to_string();
            Ok(pad(format!("{}{body}", sign_prefix(spec, n < 0)), spec))
        }
        b'u' => {
            let n = require_integer(value, arg_n)?;
            Ok(pad((n as u64).to_string(), spec))
        }
        b'o' => {
            let n = require_integer(value, arg_n)?;
            Ok(pad(format!("{:o}", n as u64), spec))
        }
        b'x' => {
            let n = require_integer(value, arg_n)?;
            let body = format!("{:x}", n as u64);
            Ok(pad(if spec.flags.contains('#') { format!("0x{body}") } else { body }, spec))
        }
        b'X' => {
            let n = require_integer(value, arg_n)?;
            let body = format!("{:X}", n as u64);
            Ok(pad(if spec.flags.contains('#') { format!("0X{body}") } else { body }, spec))
        }
        b'c' => {
            let n = require_integer(value, arg_n)?;
            Ok((n as u8 as char).to_string())
        }
        b'f' | b'F' => {
            let n = require_number(value, arg_n)?;
            let prec = spec.precision.unwrap_or(6);
            Ok(pad(format!("{}{:.*}", sign_prefix(spec, n.is_sign_negative()), prec, n.abs()), spec))
        }
        b'e' | b'E' => {
            let n = require_number(value, arg_n)?;
            let prec = spec.precision.unwrap_or(6);
            let s = format_exp(n.abs(), prec, spec.conv == b'E');
            Ok(pad(format!("{}{s}", sign_prefix(spec, n.is_sign_negative())), spec))
        }
        b'g' | b'G' => {
            let n = require_number(value, arg_n)?;
            Ok(pad(format_general(n, spec.precision.unwrap_or(6).max(1), spec.conv == b'G'), spec))
        }
        b'a' | b'A' => {
            let n = require_number(value, arg_n)?;
            Ok(pad(format!("{:x}", n.to_bits()), spec))
        }
        other => Err(arg_error("format", arg_n, format!("invalid conversion '%{}'", other as char))),
    }
}

fn require_integer(value: &Value, arg_n: usize) -> LuaResult<i64> {
    value
        .coerce_to_number()
        .and_then(|v| v.as_integer_exact())
        .ok_or_else(|| arg_error("format", arg_n, "number expected, or number has no integer representation"))
}

fn require_number(value: &Value, arg_n: usize) -> LuaResult<f64> {
    value.coerce_to_float().ok_or_else(|| arg_error("format", arg_n, "number expected"))
}

fn format_exp(abs: f64, prec: usize, upper: bool) -> String {
    if abs == 0.0 {
        return format!("{:.*}{}+00", prec, 0.0, if upper { "E" } else { "e" });
    }
    let exp = abs.log10().floor() as i32;
    let mantissa = abs / 10f64.powi(exp);
    let (mantissa, exp) = if mantissa >= 10.0 { (mantissa / 10.0, exp + 1) } else { (mantissa, exp) };
    format!("{:.*}{}{}{:02}", prec, mantissa, if upper { "E" } else { "e" }, if exp >= 0 { "+" } else { "-" }, exp.abs())
}

fn format_general(n: f64, prec: usize, upper: bool) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let exp = n.abs().log10().floor() as i32;
    if exp < -4 || exp >= prec as i32 {
        let s = format_exp(n.abs(), prec.saturating_sub(1), upper);
        let s = trim_general(&s);
        format!("{}{s}", if n.is_sign_negative() { "-" } else { "" })
    } else {
        let decimals = (prec as i32 - 1 - exp).max(0) as usize;
        let s = format!("{:.*}", decimals, n);
        trim_general(&s)
    }
}

fn trim_general(s: &str) -> String {
    if let Some(epos) = s.find(['e', 'E']) {
        let (mantissa, exp) = s.split_at(epos);
        format!("{}{exp}", trim_trailing(mantissa))
    } else {
        trim_trailing(s)
    }
}

fn trim_trailing(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let t = s.trim_end_matches('0');
    let t = t.trim_end_matches('.');
    t.to_string()
}

fn quote(value: &Value) -> String {
    match value {
        Value::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for &b in s.as_bytes() {
                match b {
                    b'"' => out.push_str("\\\""),
                    b'\\' => out.push_str("\\\\"),
                    b'\n' => out.push_str("\\n"),
                    b'\r' => out.push_str("\\r"),
                    0 => out.push_str("\\0"),
                    c if c < 0x20 || c == 0x7f => out.push_str(&format!("\\{c}")),
                    c => out.push(c as char),
                }
            }
            out.push('"');
            out
        }
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => crate::value::fmt_float(*f),
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        other => crate::value::tostring_basic(other),
    }
}
