//! The Lua value model (spec.md §3, §4.2).
//!
//! `Value` is a plain tagged sum rather than the teacher's bit-packed
//! `TValue`/`GCObject` arena (`lua_value/lua_value.rs`). Design Notes §9
//! explicitly sanctions this simplification for a systems language that
//! doesn't need register-file-compatible layout: "model `Value` as a tagged
//! sum over `Nil | Bool | Int | Float | Str | Table(ref) | ...`". Tables,
//! closures, threads and userdata are shared via `Rc<RefCell<_>>`.

mod function;
mod lua_str;
mod table;
mod thread;
mod userdata;

pub use function::{Closure, Function, NativeFn};
pub use lua_str::LuaStr;
pub use table::Table;
pub use thread::{Thread, ThreadStatus};
pub use userdata::UserData;

use std::rc::Rc;

/// The seven primitive kinds of spec.md §3 plus metatable-based extensibility.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(LuaStr),
    Table(Rc<std::cell::RefCell<Table>>),
    Function(Rc<Function>),
    Thread(Rc<std::cell::RefCell<Thread>>),
    UserData(Rc<std::cell::RefCell<UserData>>),
}

/// `type(v)` names, spec.md §4.6 basic library.
pub const TYPE_NIL: &str = "nil";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_NUMBER: &str = "number";
pub const TYPE_STRING: &str = "string";
pub const TYPE_TABLE: &str = "table";
pub const TYPE_FUNCTION: &str = "function";
pub const TYPE_THREAD: &str = "thread";
pub const TYPE_USERDATA: &str = "userdata";

impl Value {
    pub fn from_string(s: impl AsRef<str>) -> Value {
        Value::Str(LuaStr::new(s.as_ref().as_bytes()))
    }

    pub fn from_bytes(b: &[u8]) -> Value {
        Value::Str(LuaStr::new(b))
    }

    pub fn new_table(t: Table) -> Value {
        Value::Table(Rc::new(std::cell::RefCell::new(t)))
    }

    pub fn native_fn(name: &'static str, f: NativeFn) -> Value {
        Value::Function(Rc::new(Function::Native { name, f }))
    }

    /// Truthiness: spec.md §3 invariant — only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => TYPE_NIL,
            Value::Boolean(_) => TYPE_BOOLEAN,
            Value::Integer(_) | Value::Float(_) => TYPE_NUMBER,
            Value::Str(_) => TYPE_STRING,
            Value::Table(_) => TYPE_TABLE,
            Value::Function(_) => TYPE_FUNCTION,
            Value::Thread(_) => TYPE_THREAD,
            Value::UserData(_) => TYPE_USERDATA,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_table(&self) -> Option<&Rc<std::cell::RefCell<Table>>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<&Rc<std::cell::RefCell<Thread>>> {
        match self {
            Value::Thread(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Numeric value of integers/floats only (no string coercion). Used by
    /// `math` library functions that require a genuine number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_integer_exact(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => float_to_integer_exact(*f),
            _ => None,
        }
    }

    /// String->number coercion for arithmetic contexts (spec.md §4.2):
    /// the *entire* string, trimmed of ASCII whitespace, must parse as a
    /// numeral in the lexer's grammar.
    pub fn coerce_to_number(&self) -> Option<Value> {
        match self {
            Value::Integer(_) | Value::Float(_) => Some(self.clone()),
            Value::Str(s) => {
                let text = s.to_string_lossy();
                crate::lexer::parse_numeral_str(text.trim())
            }
            _ => None,
        }
    }

    pub fn coerce_to_float(&self) -> Option<f64> {
        self.coerce_to_number().and_then(|v| v.as_number())
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }
}

/// `a // b == 0 mod 1` exactness check used for bitwise-op coercion and
/// `math.tointeger`.
pub fn float_to_integer_exact(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() != 0.0 {
        return None;
    }
    if f < -(2f64.powi(63)) || f >= 2f64.powi(63) {
        return None;
    }
    Some(f as i64)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // Integer/float equality holds iff the float exactly equals the integer.
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b && float_to_integer_exact(*b) == Some(*a)
            }
            (Value::Str(a), Value::Str(b)) => a.as_bytes() == b.as_bytes(),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => Rc::ptr_eq(a, b),
            (Value::UserData(a), Value::UserData(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", tostring_basic(self))
    }
}

/// `tostring` without consulting `__tostring` — used for error messages and
/// as the fallback the interpreter's full `tostring` delegates to.
pub fn tostring_basic(v: &Value) -> String {
    match v {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => {
            let mut buf = itoa::Buffer::new();
            buf.format(*i).to_string()
        }
        Value::Float(f) => fmt_float(*f),
        Value::Str(s) => s.to_string_lossy().into_owned(),
        Value::Table(t) => format!("table: {:p}", Rc::as_ptr(t)),
        Value::Function(f) => format!("function: {:p}", Rc::as_ptr(f)),
        Value::Thread(t) => format!("thread: {:p}", Rc::as_ptr(t)),
        Value::UserData(u) => format!("userdata: {:p}", Rc::as_ptr(u)),
    }
}

/// `%.14g`-equivalent float formatting (Open Question 4 in SPEC_FULL.md):
/// 14 significant digits, trailing zeros and a bare trailing `.` trimmed,
/// falling back to exponential notation outside `[1e-4, 1e15)`.
pub fn fmt_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0".to_string() } else { "0.0".to_string() };
    }

    let abs = f.abs();
    let use_exp = abs < 1e-4 || abs >= 1e15;
    let mut s = if use_exp {
        format!("{:.13e}", f)
    } else {
        format!("{:.*}", 13usize.saturating_sub(integer_digit_count(abs)), f)
    };

    if use_exp {
        // Rust gives "1.2345678901234e5"; Lua/C want "1.2345678901234e+05".
        if let Some(epos) = s.find('e') {
            let (mantissa, exp) = s.split_at(epos);
            let exp_val: i32 = exp[1..].parse().unwrap_or(0);
            let mantissa = trim_trailing_zeros(mantissa);
            s = format!("{mantissa}e{}{:02}", if exp_val >= 0 { "+" } else { "-" }, exp_val.abs());
        }
    } else {
        s = trim_trailing_zeros(&s);
        if !s.contains('.') {
            s.push_str(".0");
        }
    }
    s
}

fn integer_digit_count(abs: f64) -> usize {
    if abs < 1.0 {
        1
    } else {
        (abs.log10().floor() as usize) + 1
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
