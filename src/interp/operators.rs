//! Arithmetic/relational/bitwise/concat operators and metamethod dispatch
//! (spec.md §4.2, §4.5 "Operators & Coercions").
//!
//! Grounded on the teacher's `lua_vm/execute/arithmetic_instructions.rs`,
//! `comparison_ops.rs` and `metamethod.rs` — same coercion rules and
//! metamethod fallback order, re-targeted from register operands to plain
//! `Value`s since there is no bytecode operand pair to read here.

use std::rc::Rc;

use crate::error::{LuaError, LuaResult};
use crate::parser::ast::BinOp;
use crate::value::{float_to_integer_exact, tostring_basic, Table, Value};

use super::Interpreter;

pub fn metatable_of(interp: &Interpreter, value: &Value) -> Option<Rc<std::cell::RefCell<Table>>> {
    match value {
        Value::Table(t) => t.borrow().metatable.clone(),
        Value::UserData(u) => u.borrow().metatable.clone(),
        Value::Str(_) => Some(Rc::clone(&interp.string_metatable)),
        _ => None,
    }
}

pub fn get_metamethod_with(mt: Option<&Rc<std::cell::RefCell<Table>>>, name: &str) -> Option<Value> {
    let mt = mt?;
    let v = mt.borrow().raw_get(&Value::from_string(name));
    if v.is_nil() {
        None
    } else {
        Some(v)
    }
}

pub fn get_metamethod(interp: &Interpreter, value: &Value, name: &str) -> Option<Value> {
    get_metamethod_with(metatable_of(interp, value).as_ref(), name)
}

/// Used by [`crate::env::Scope::declare`] to validate `<close>` locals
/// without a full `Interpreter` in scope (only the metatable lookup is
/// needed, and strings/non-reference types never carry one).
pub fn has_metamethod(value: &Value, name: &str) -> bool {
    let mt = match value {
        Value::Table(t) => t.borrow().metatable.clone(),
        Value::UserData(u) => u.borrow().metatable.clone(),
        _ => None,
    };
    get_metamethod_with(mt.as_ref(), name).is_some()
}

/// `t[k]` with `__index` fallback (function or table, chased transitively).
pub fn index(interp: &mut Interpreter, obj: &Value, key: &Value) -> LuaResult<Value> {
    if let Value::Table(t) = obj {
        let raw = t.borrow().raw_get(key);
        if !raw.is_nil() {
            return Ok(raw);
        }
        let Some(handler) = get_metamethod(interp, obj, "__index") else { return Ok(Value::Nil) };
        return apply_index_handler(interp, handler, obj, key);
    }
    if let Some(handler) = get_metamethod(interp, obj, "__index") {
        return apply_index_handler(interp, handler, obj, key);
    }
    Err(LuaError::type_error(format!("attempt to index a {} value", obj.type_name())))
}

fn apply_index_handler(interp: &mut Interpreter, handler: Value, obj: &Value, key: &Value) -> LuaResult<Value> {
    match handler {
        Value::Function(_) => {
            let results = super::call::call_value(interp, handler, vec![obj.clone(), key.clone()], 0)?;
            Ok(results.into_iter().next().unwrap_or(Value::Nil))
        }
        other => index(interp, &other, key),
    }
}

/// `t[k] = v` with `__newindex` fallback.
pub fn newindex(interp: &mut Interpreter, obj: &Value, key: &Value, value: Value) -> LuaResult<()> {
    if let Value::Table(t) = obj {
        let has_raw = !t.borrow().raw_get(key).is_nil();
        if has_raw {
            t.borrow_mut().raw_set(key.clone(), value).map_err(LuaError::runtime)?;
            return Ok(());
        }
        let Some(handler) = get_metamethod(interp, obj, "__newindex") else {
            t.borrow_mut().raw_set(key.clone(), value).map_err(LuaError::runtime)?;
            return Ok(());
        };
        return apply_newindex_handler(interp, handler, obj, key, value);
    }
    if let Some(handler) = get_metamethod(interp, obj, "__newindex") {
        return apply_newindex_handler(interp, handler, obj, key, value);
    }
    Err(LuaError::type_error(format!("attempt to index a {} value", obj.type_name())))
}

fn apply_newindex_handler(interp: &mut Interpreter, handler: Value, obj: &Value, key: &Value, value: Value) -> LuaResult<()> {
    match handler {
        Value::Function(_) => {
            super::call::call_value(interp, handler, vec![obj.clone(), key.clone(), value], 0)?;
            Ok(())
        }
        other => newindex(interp, &other, key, value),
    }
}

/// `tostring(v)` consulting `__tostring`/`__name` (§4.6 basic library).
pub fn tostring(interp: &mut Interpreter, value: &Value) -> LuaResult<String> {
    if let Some(handler) = get_metamethod(interp, value, "__tostring") {
        let results = super::call::call_value(interp, handler, vec![value.clone()], 0)?;
        return Ok(match results.into_iter().next() {
            Some(Value::Str(s)) => s.to_string_lossy().into_owned(),
            Some(other) => tostring_basic(&other),
            None => "nil".to_string(),
        });
    }
    if let Some(Value::Str(name)) = get_metamethod(interp, value, "__name") {
        return Ok(format!("{}: {:p}", name.to_string_lossy(), addr_of(value)));
    }
    Ok(tostring_basic(value))
}

fn addr_of(value: &Value) -> *const () {
    match value {
        Value::Table(t) => Rc::as_ptr(t) as *const (),
        Value::UserData(u) => Rc::as_ptr(u) as *const (),
        Value::Function(f) => Rc::as_ptr(f) as *const (),
        Value::Thread(t) => Rc::as_ptr(t) as *const (),
        _ => std::ptr::null(),
    }
}

/// `#v`: string byte length, table border (or `__len`).
pub fn length(interp: &mut Interpreter, value: &Value) -> LuaResult<Value> {
    match value {
        Value::Str(s) => Ok(Value::Integer(s.len() as i64)),
        Value::Table(t) => {
            if let Some(handler) = get_metamethod(interp, value, "__len") {
                let results = super::call::call_value(interp, handler, vec![value.clone()], 0)?;
                return Ok(results.into_iter().next().unwrap_or(Value::Nil));
            }
            Ok(Value::Integer(t.borrow().length()))
        }
        _ => Err(LuaError::type_error(format!("attempt to get length of a {} value", value.type_name()))),
    }
}

/// `a == b`: raw equality, falling back to `__eq` only when both operands
/// are tables (or both userdata) and raw equality failed (§4.2).
pub fn lua_eq(interp: &mut Interpreter, a: &Value, b: &Value) -> LuaResult<bool> {
    if a == b {
        return Ok(true);
    }
    let same_kind = matches!((a, b), (Value::Table(_), Value::Table(_)) | (Value::UserData(_), Value::UserData(_)));
    if !same_kind {
        return Ok(false);
    }
    let handler = get_metamethod(interp, a, "__eq").or_else(|| get_metamethod(interp, b, "__eq"));
    let Some(handler) = handler else { return Ok(false) };
    let results = super::call::call_value(interp, handler, vec![a.clone(), b.clone()], 0)?;
    Ok(results.into_iter().next().map(|v| v.is_truthy()).unwrap_or(false))
}

fn binary_metamethod(interp: &mut Interpreter, a: &Value, b: &Value, name: &str) -> Option<Value> {
    get_metamethod(interp, a, name).or_else(|| get_metamethod(interp, b, name))
}

fn call_binary_metamethod(interp: &mut Interpreter, handler: Value, a: Value, b: Value) -> LuaResult<Value> {
    let results = super::call::call_value(interp, handler, vec![a, b], 0)?;
    Ok(results.into_iter().next().unwrap_or(Value::Nil))
}

enum Num {
    Int(i64),
    Float(f64),
}

fn to_num(v: &Value) -> Option<Num> {
    match v.coerce_to_number()? {
        Value::Integer(i) => Some(Num::Int(i)),
        Value::Float(f) => Some(Num::Float(f)),
        _ => None,
    }
}

fn to_float(n: &Num) -> f64 {
    match n {
        Num::Int(i) => *i as f64,
        Num::Float(f) => *f,
    }
}

const ARITH_METHODS: &[(BinOp, &str)] = &[
    (BinOp::Add, "__add"), (BinOp::Sub, "__sub"), (BinOp::Mul, "__mul"),
    (BinOp::Div, "__div"), (BinOp::Mod, "__mod"), (BinOp::Pow, "__pow"),
    (BinOp::IDiv, "__idiv"), (BinOp::BAnd, "__band"), (BinOp::BOr, "__bor"),
    (BinOp::BXor, "__bxor"), (BinOp::Shl, "__shl"), (BinOp::Shr, "__shr"),
    (BinOp::Concat, "__concat"),
];

/// Dispatch for every [`BinOp`] except `And`/`Or` (handled in `eval.rs` for
/// short-circuiting) and the relational family (handled by [`relational`]).
pub fn eval_binary(interp: &mut Interpreter, op: BinOp, a: Value, b: Value) -> LuaResult<Value> {
    use BinOp::*;
    match op {
        Eq => Ok(Value::Boolean(lua_eq(interp, &a, &b)?)),
        Ne => Ok(Value::Boolean(!lua_eq(interp, &a, &b)?)),
        Lt | Le | Gt | Ge => relational(interp, op, a, b),
        Concat => concat(interp, a, b),
        And | Or => unreachable!("short-circuit ops handled in eval.rs"),
        _ => arithmetic(interp, op, a, b),
    }
}

fn arith_name(op: BinOp) -> &'static str {
    ARITH_METHODS.iter().find(|(o, _)| *o == op).map(|(_, n)| *n).unwrap_or("__add")
}

fn arithmetic(interp: &mut Interpreter, op: BinOp, a: Value, b: Value) -> LuaResult<Value> {
    use BinOp::*;
    let is_bitwise = matches!(op, BAnd | BOr | BXor | Shl | Shr);
    let na = to_num(&a);
    let nb = to_num(&b);
    if let (Some(na), Some(nb)) = (na, nb) {
        if is_bitwise {
            let ia = as_bitwise_int(&a, &na)?;
            let ib = as_bitwise_int(&b, &nb)?;
            return Ok(Value::Integer(bitwise(op, ia, ib)));
        }
        return Ok(match op {
            Add => numeric_op(na, nb, i64::wrapping_add, |x, y| x + y),
            Sub => numeric_op(na, nb, i64::wrapping_sub, |x, y| x - y),
            Mul => numeric_op(na, nb, i64::wrapping_mul, |x, y| x * y),
            Mod => lua_mod(na, nb)?,
            IDiv => lua_idiv(na, nb)?,
            Div => Value::Float(to_float(&na) / to_float(&nb)),
            Pow => Value::Float(to_float(&na).powf(to_float(&nb))),
            _ => unreachable!(),
        });
    }
    if let Some(handler) = binary_metamethod(interp, &a, &b, arith_name(op)) {
        return call_binary_metamethod(interp, handler, a, b);
    }
    let bad = if na.is_none() { &a } else { &b };
    if is_bitwise && (na.is_some() || nb.is_some()) {
        return Err(LuaError::arithmetic("number has no integer representation"));
    }
    Err(LuaError::arithmetic(format!(
        "attempt to perform arithmetic on a {} value",
        bad.type_name()
    )))
}

fn as_bitwise_int(original: &Value, n: &Num) -> LuaResult<i64> {
    match n {
        Num::Int(i) => Ok(*i),
        Num::Float(f) => float_to_integer_exact(*f).ok_or_else(|| {
            let _ = original;
            LuaError::arithmetic("number has no integer representation")
        }),
    }
}

fn bitwise(op: BinOp, a: i64, b: i64) -> i64 {
    use BinOp::*;
    match op {
        BAnd => a & b,
        BOr => a | b,
        BXor => a ^ b,
        Shl => shift_left(a, b),
        Shr => shift_left(a, -b),
        _ => unreachable!(),
    }
}

/// Lua's shift semantics: shifts by >=64 (either direction) produce 0, and a
/// negative `Shl` count shifts right (spec.md §4.2).
fn shift_left(a: i64, by: i64) -> i64 {
    if by <= -64 || by >= 64 {
        0
    } else if by >= 0 {
        ((a as u64) << by) as i64
    } else {
        ((a as u64) >> -by) as i64
    }
}

fn numeric_op(a: Num, b: Num, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Value {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Value::Integer(int_op(x, y)),
        (a, b) => Value::Float(float_op(to_float(&a), to_float(&b))),
    }
}

fn lua_mod(a: Num, b: Num) -> LuaResult<Value> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(LuaError::arithmetic("attempt to perform 'n%%0'"));
            }
            let r = x.wrapping_rem(y);
            Ok(Value::Integer(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
        }
        (a, b) => {
            let (x, y) = (to_float(&a), to_float(&b));
            let r = x - (x / y).floor() * y;
            Ok(Value::Float(r))
        }
    }
}

fn lua_idiv(a: Num, b: Num) -> LuaResult<Value> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(LuaError::arithmetic("attempt to perform 'n//0'"));
            }
            // Floor division, not `div_euclid` (which floors toward zero's
            // *remainder sign*, not toward negative infinity): `7 // -2` is
            // `-4`, matching `lua_mod`'s floored remainder above.
            let q = x.wrapping_div(y);
            let r = x.wrapping_rem(y);
            Ok(Value::Integer(if r != 0 && (r < 0) != (y < 0) { q - 1 } else { q }))
        }
        (a, b) => Ok(Value::Float((to_float(&a) / to_float(&b)).floor())),
    }
}

fn relational(interp: &mut Interpreter, op: BinOp, a: Value, b: Value) -> LuaResult<Value> {
    use BinOp::*;
    let (op, a, b) = match op {
        Gt => (Lt, b, a),
        Ge => (Le, b, a),
        other => (other, a, b),
    };
    if let (Some(na), Some(nb)) = (numeric_only(&a), numeric_only(&b)) {
        let (x, y) = (to_float(&na), to_float(&nb));
        return Ok(Value::Boolean(if op == Lt { x < y } else { x <= y }));
    }
    if let (Value::Str(sa), Value::Str(sb)) = (&a, &b) {
        return Ok(Value::Boolean(if op == Lt {
            sa.as_bytes() < sb.as_bytes()
        } else {
            sa.as_bytes() <= sb.as_bytes()
        }));
    }
    let name = if op == Lt { "__lt" } else { "__le" };
    if let Some(handler) = binary_metamethod(interp, &a, &b, name) {
        let result = call_binary_metamethod(interp, handler, a, b)?;
        return Ok(Value::Boolean(result.is_truthy()));
    }
    Err(LuaError::type_error(format!(
        "attempt to compare {} with {}",
        a.type_name(),
        b.type_name()
    )))
}

/// Relational coercion is number-only: unlike arithmetic, numeral *strings*
/// do not compare as numbers (spec.md §4.2: `"10" < 9` is a type error).
fn numeric_only(v: &Value) -> Option<Num> {
    match v {
        Value::Integer(i) => Some(Num::Int(*i)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

fn concat(interp: &mut Interpreter, a: Value, b: Value) -> LuaResult<Value> {
    if let (Some(sa), Some(sb)) = (concat_str(&a), concat_str(&b)) {
        let mut out = sa;
        out.extend_from_slice(&sb);
        return Ok(Value::from_bytes(&out));
    }
    if let Some(handler) = binary_metamethod(interp, &a, &b, "__concat") {
        return call_binary_metamethod(interp, handler, a, b);
    }
    let bad = if concat_str(&a).is_none() { &a } else { &b };
    Err(LuaError::type_error(format!("attempt to concatenate a {} value", bad.type_name())))
}

/// Raw bytes a value contributes to `..`. Lua strings are 8-bit byte
/// sequences (§3), so this must not go through lossy UTF-8 conversion —
/// `"\xff" .. "a"` must keep the literal `0xff` byte, not U+FFFD.
fn concat_str(v: &Value) -> Option<Vec<u8>> {
    match v {
        Value::Str(s) => Some(s.as_bytes().to_vec()),
        Value::Integer(_) | Value::Float(_) => Some(tostring_basic(v).into_bytes()),
        _ => None,
    }
}

/// Unary `-`: numeric negation, falling back to `__unm`.
pub fn unary_neg(interp: &mut Interpreter, v: Value) -> LuaResult<Value> {
    match to_num(&v) {
        Some(Num::Int(i)) => Ok(Value::Integer(i.wrapping_neg())),
        Some(Num::Float(f)) => Ok(Value::Float(-f)),
        None => {
            if let Some(handler) = get_metamethod(interp, &v, "__unm") {
                return call_binary_metamethod(interp, handler, v.clone(), v);
            }
            Err(LuaError::arithmetic(format!("attempt to perform arithmetic on a {} value", v.type_name())))
        }
    }
}

/// Unary `~`: bitwise complement, falling back to `__bnot`.
pub fn unary_bnot(interp: &mut Interpreter, v: Value) -> LuaResult<Value> {
    if let Some(n) = to_num(&v) {
        let i = as_bitwise_int(&v, &n)?;
        return Ok(Value::Integer(!i));
    }
    if let Some(handler) = get_metamethod(interp, &v, "__bnot") {
        return call_binary_metamethod(interp, handler, v.clone(), v);
    }
    Err(LuaError::arithmetic(format!("attempt to perform bitwise operation on a {} value", v.type_name())))
}
