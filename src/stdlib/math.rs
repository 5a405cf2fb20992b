//! `math` library (spec.md §4.6).
//!
//! Grounded on the teacher's `stdlib/math.rs` for the function roster;
//! `random`/`randomseed` use `rand` exactly as the teacher does.

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::LuaResult;
use crate::interp::Interpreter;
use crate::lib_registry::LibraryModule;
use crate::value::{float_to_integer_exact, Value};

use super::{arg, arg_error, check_integer, check_number, opt_integer};

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
}

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("math", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("abs", abs);
    f!("ceil", ceil);
    f!("floor", floor);
    f!("fmod", fmod);
    f!("modf", modf);
    f!("sqrt", sqrt);
    f!("exp", exp);
    f!("log", log);
    f!("pow", pow);
    f!("max", max);
    f!("min", min);
    f!("random", random);
    f!("randomseed", randomseed);
    f!("sin", sin);
    f!("cos", cos);
    f!("tan", tan);
    f!("asin", asin);
    f!("acos", acos);
    f!("atan", atan);
    f!("deg", deg);
    f!("rad", rad);
    f!("tointeger", tointeger);
    f!("type", math_type);
    f!("ult", ult);
    m.entries.push(crate::lib_registry::LibraryEntry::Value("pi", || Value::Float(std::f64::consts::PI)));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("huge", || Value::Float(f64::INFINITY)));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("maxinteger", || Value::Integer(i64::MAX)));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("mininteger", || Value::Integer(i64::MIN)));
    m
}

fn abs(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    match arg(args, 0) {
        Value::Integer(i) => Ok(vec![Value::Integer(i.wrapping_abs())]),
        other => Ok(vec![Value::Float(check_number(&[other], 0, "abs")?.abs())]),
    }
}

fn ceil(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if let Value::Integer(i) = arg(args, 0) {
        return Ok(vec![Value::Integer(i)]);
    }
    let n = check_number(args, 0, "ceil")?.ceil();
    int_or_error("ceil", n)
}

fn floor(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if let Value::Integer(i) = arg(args, 0) {
        return Ok(vec![Value::Integer(i)]);
    }
    let n = check_number(args, 0, "floor")?.floor();
    int_or_error("floor", n)
}

fn int_or_error(fname: &str, n: f64) -> LuaResult<Vec<Value>> {
    float_to_integer_exact(n)
        .map(|i| vec![Value::Integer(i)])
        .ok_or_else(|| arg_error(fname, 1, "number has no integer representation"))
}

fn fmod(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if let (Value::Integer(a), Value::Integer(b)) = (arg(args, 0), arg(args, 1)) {
        if b == 0 {
            return Err(arg_error("fmod", 2, "zero"));
        }
        return Ok(vec![Value::Integer(a.wrapping_rem(b))]);
    }
    let a = check_number(args, 0, "fmod")?;
    let b = check_number(args, 1, "fmod")?;
    Ok(vec![Value::Float(a % b)])
}

fn modf(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let n = check_number(args, 0, "modf")?;
    let int_part = n.trunc();
    let frac = if n.is_infinite() { 0.0 } else { n - int_part };
    Ok(vec![Value::Float(int_part), Value::Float(frac)])
}

fn sqrt(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Float(check_number(args, 0, "sqrt")?.sqrt())])
}

fn exp(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Float(check_number(args, 0, "exp")?.exp())])
}

fn log(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let x = check_number(args, 0, "log")?;
    if args.len() >= 2 && !arg(args, 1).is_nil() {
        let base = check_number(args, 1, "log")?;
        Ok(vec![Value::Float(if base == 2.0 {
            x.log2()
        } else if base == 10.0 {
            x.log10()
        } else {
            x.ln() / base.ln()
        })])
    } else {
        Ok(vec![Value::Float(x.ln())])
    }
}

fn pow(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let a = check_number(args, 0, "pow")?;
    let b = check_number(args, 1, "pow")?;
    Ok(vec![Value::Float(a.powf(b))])
}

fn max(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.is_empty() {
        return Err(arg_error("max", 1, "value expected"));
    }
    let mut best = args[0].clone();
    for v in &args[1..] {
        if numeric_less(&best, v)? {
            best = v.clone();
        }
    }
    Ok(vec![best])
}

fn min(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if args.is_empty() {
        return Err(arg_error("min", 1, "value expected"));
    }
    let mut best = args[0].clone();
    for v in &args[1..] {
        if numeric_less(v, &best)? {
            best = v.clone();
        }
    }
    Ok(vec![best])
}

fn numeric_less(a: &Value, b: &Value) -> LuaResult<bool> {
    let (an, bn) = (
        a.as_number().ok_or_else(|| arg_error("max/min", 1, format!("number expected, got {}", a.type_name())))?,
        b.as_number().ok_or_else(|| arg_error("max/min", 2, format!("number expected, got {}", b.type_name())))?,
    );
    Ok(an < bn)
}

fn random(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        match args.len() {
            0 => Ok(vec![Value::Float(rng.gen::<f64>())]),
            1 => {
                let m = check_integer(args, 0, "random")?;
                if m == 0 {
                    return Ok(vec![Value::Integer(rng.gen::<i64>())]);
                }
                if m < 1 {
                    return Err(arg_error("random", 1, "interval is empty"));
                }
                Ok(vec![Value::Integer(rng.gen_range(1..=m))])
            }
            _ => {
                let lo = check_integer(args, 0, "random")?;
                let hi = check_integer(args, 1, "random")?;
                if lo > hi {
                    return Err(arg_error("random", 2, "interval is empty"));
                }
                Ok(vec![Value::Integer(rng.gen_range(lo..=hi))])
            }
        }
    })
}

fn randomseed(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let seed = opt_integer(args, 0, "randomseed", 0)? as u64;
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed));
    Ok(Vec::new())
}

macro_rules! unary_float_fn {
    ($name:ident, $fname:expr, $method:ident) => {
        fn $name(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
            Ok(vec![Value::Float(check_number(args, 0, $fname)?.$method())])
        }
    };
}

unary_float_fn!(sin, "sin", sin);
unary_float_fn!(cos, "cos", cos);
unary_float_fn!(tan, "tan", tan);
unary_float_fn!(asin, "asin", asin);
unary_float_fn!(acos, "acos", acos);
unary_float_fn!(deg, "deg", to_degrees);
unary_float_fn!(rad, "rad", to_radians);

fn atan(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let y = check_number(args, 0, "atan")?;
    let x = if args.len() >= 2 && !arg(args, 1).is_nil() { check_number(args, 1, "atan")? } else { 1.0 };
    Ok(vec![Value::Float(y.atan2(x))])
}

fn tointeger(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![arg(args, 0).as_integer_exact().map(Value::Integer).unwrap_or(Value::Nil)])
}

fn math_type(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![match arg(args, 0) {
        Value::Integer(_) => Value::from_string("integer"),
        Value::Float(_) => Value::from_string("float"),
        _ => Value::Nil,
    }])
}

fn ult(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let a = check_integer(args, 0, "ult")? as u64;
    let b = check_integer(args, 1, "ult")? as u64;
    Ok(vec![Value::Boolean(a < b)])
}
