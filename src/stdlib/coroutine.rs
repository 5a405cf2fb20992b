//! `coroutine` library (spec.md §4.6, §4.7).
//!
//! Thin native-function wrappers over [`crate::interp::coroutine`], which
//! does the actual OS-thread-backed scheduling. Grounded on the teacher's
//! `stdlib/coroutine.rs` for the function roster and `wrap`'s
//! error-surfacing convention (re-raises instead of returning `false, err`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::LuaResult;
use crate::interp::{coroutine as co, Interpreter};
use crate::lib_registry::LibraryModule;
use crate::value::{Table, Thread, Value};

use super::{arg, arg_error};

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("coroutine", crate::interp::StdlibTrustLevel::Untrusted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("create", create);
    f!("resume", resume);
    f!("yield", yield_fn);
    f!("status", status);
    f!("wrap", wrap);
    f!("isyieldable", isyieldable);
    f!("running", running);
    f!("close", close);
    m
}

fn check_thread(v: &Value, fname: &str) -> LuaResult<Rc<RefCell<Thread>>> {
    match v {
        Value::Thread(t) => Ok(t.clone()),
        other => Err(arg_error(fname, 1, format!("coroutine expected, got {}", other.type_name()))),
    }
}

fn create(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return Err(arg_error("create", 1, format!("function expected, got {}", f.type_name())));
    }
    Ok(vec![Value::Thread(Rc::new(RefCell::new(Thread::new(f))))])
}

fn resume(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_thread(&arg(args, 0), "resume")?;
    match co::resume(interp, &t, args[1.min(args.len())..].to_vec()) {
        co::ResumeOutcome::Yielded(mut values) => {
            let mut out = vec![Value::Boolean(true)];
            out.append(&mut values);
            Ok(out)
        }
        co::ResumeOutcome::Returned(mut values) => {
            let mut out = vec![Value::Boolean(true)];
            out.append(&mut values);
            Ok(out)
        }
        co::ResumeOutcome::Errored(e) => Ok(vec![Value::Boolean(false), e.value]),
    }
}

fn yield_fn(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    co::yield_now(args.to_vec())
}

fn status(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_thread(&arg(args, 0), "status")?;
    let is_current = interp.coroutine_stack.last().map(|c| Rc::ptr_eq(c, &t)).unwrap_or(false);
    let s = if is_current { "running" } else { t.borrow().status.as_str() };
    Ok(vec![Value::from_string(s)])
}

/// `coroutine.wrap(f)`: like `create` but returns a plain callable that
/// re-raises on error instead of returning `(false, err)`. The wrapper
/// closure has to be a Lua-callable `Value`, so it's represented as a
/// one-field table plus a native function reading its own thread back out
/// of an upvalue-style state table — the same trick [`super::string::gmatch`]
/// uses for iterator state, since a plain `fn` pointer has no upvalues.
fn wrap(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return Err(arg_error("wrap", 1, format!("function expected, got {}", f.type_name())));
    }
    let thread = Value::Thread(Rc::new(RefCell::new(Thread::new(f))));
    let mut state = Table::new();
    let _ = state.raw_set(Value::from_string("co"), thread);
    let mut mt = Table::new();
    let _ = mt.raw_set(Value::from_string("__call"), Value::native_fn("coroutine.wrap", wrap_call));
    state.metatable = Some(Rc::new(RefCell::new(mt)));
    Ok(vec![Value::new_table(state)])
}

fn wrap_call(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let state = super::check_table(args, 0, "coroutine.wrap")?;
    let t = check_thread(&state.borrow().raw_get(&Value::from_string("co")), "coroutine.wrap")?;
    match co::resume(interp, &t, args[1..].to_vec()) {
        co::ResumeOutcome::Yielded(values) | co::ResumeOutcome::Returned(values) => Ok(values),
        co::ResumeOutcome::Errored(e) => Err(e),
    }
}

fn isyieldable(_interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    Ok(vec![Value::Boolean(co::is_yieldable())])
}

fn running(interp: &mut Interpreter, _args: &[Value]) -> LuaResult<Vec<Value>> {
    match interp.coroutine_stack.last() {
        Some(t) => Ok(vec![Value::Thread(t.clone()), Value::Boolean(false)]),
        None => Ok(vec![Value::Thread(interp.main_thread.clone()), Value::Boolean(true)]),
    }
}

fn close(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let t = check_thread(&arg(args, 0), "close")?;
    match co::close(&t) {
        Ok(()) => Ok(vec![Value::Boolean(true)]),
        Err(e) => Ok(vec![Value::Boolean(false), e.value]),
    }
}
