//! Function call machinery (spec.md §4.5 "Calls", §6.2 `Call`).
//!
//! `call_value` is the single funnel every call path goes through — plain
//! calls, method calls, metamethod dispatch (`__index`/`__call`/...), and
//! the host-facing [`super::State::call`] — mirroring how the teacher's
//! `LuaVM::call_value` is the one place that pushes a `LuaCallFrame`
//! (`lua_vm/lua_call_frame.rs`) regardless of caller.

use crate::env::Scope;
use crate::error::{LuaError, LuaResult};
use crate::value::{Function, Value};

use super::{exec, operators, CallFrame, Interpreter};

/// Invoke any callable value (closure, native function, or a value with a
/// `__call` metamethod) with `args`, returning every value it produced.
pub fn call_value(interp: &mut Interpreter, callee: Value, args: Vec<Value>, line: u32) -> LuaResult<Vec<Value>> {
    interp.check_call_depth()?;
    match &callee {
        Value::Function(f) => call_function(interp, f.clone(), args),
        other => {
            let Some(handler) = operators::get_metamethod(interp, other, "__call") else {
                return Err(interp.error_at(line, format!("attempt to call a {} value", other.type_name())));
            };
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(callee.clone());
            full_args.extend(args);
            call_value(interp, handler, full_args, line)
        }
    }
}

fn call_function(interp: &mut Interpreter, f: std::rc::Rc<Function>, args: Vec<Value>) -> LuaResult<Vec<Value>> {
    match &*f {
        Function::Native { name, f } => {
            interp.call_stack.push(CallFrame { name: name.to_string(), varargs: Vec::new() });
            let result = f(interp, &args);
            interp.call_stack.pop();
            result
        }
        Function::Lua(closure) => {
            let scope = closure.upvalues.child();
            let mut args = args.into_iter();
            for param in &closure.params {
                scope.declare(param.clone(), args.next().unwrap_or(Value::Nil), crate::parser::ast::Attrib::None)
                    .map_err(|e| LuaError::runtime(e.message()))?;
            }
            let varargs: Vec<Value> = if closure.is_vararg { args.collect() } else { Vec::new() };
            let frame_name = closure.name.borrow().clone().unwrap_or_else(|| "?".to_string());
            interp.call_stack.push(CallFrame { name: frame_name, varargs: varargs.clone() });
            let result = exec::exec_block(interp, &scope, &varargs, &closure.body);
            interp.call_stack.pop();
            match result? {
                exec::StepResult::Return(values) => Ok(values),
                _ => Ok(Vec::new()),
            }
        }
    }
}

/// `pcall(f, ...)`: run `f` with protection, returning `(true, results...)`
/// on success or `(false, errorValue)` on failure (spec.md §4.5 "Protected
/// calls").
pub fn pcall(interp: &mut Interpreter, f: Value, args: Vec<Value>) -> Vec<Value> {
    let depth = interp.call_stack.len();
    match call_value(interp, f, args, 0) {
        Ok(mut results) => {
            let mut out = Vec::with_capacity(results.len() + 1);
            out.push(Value::Boolean(true));
            out.append(&mut results);
            out
        }
        Err(e) => {
            interp.call_stack.truncate(depth);
            vec![Value::Boolean(false), e.value]
        }
    }
}

/// `xpcall(f, handler, ...)`: like [`pcall`] but runs `handler` on the
/// error value (with the failing stack still notionally "current") before
/// unwinding further.
pub fn xpcall(interp: &mut Interpreter, f: Value, handler: Value, args: Vec<Value>) -> Vec<Value> {
    let depth = interp.call_stack.len();
    match call_value(interp, f, args, 0) {
        Ok(mut results) => {
            let mut out = Vec::with_capacity(results.len() + 1);
            out.push(Value::Boolean(true));
            out.append(&mut results);
            out
        }
        Err(e) => {
            interp.call_stack.truncate(depth);
            let handled = call_value(interp, handler, vec![e.value], 0)
                .unwrap_or_else(|he| vec![he.value]);
            let mut out = vec![Value::Boolean(false)];
            out.extend(handled.into_iter().take(1));
            out
        }
    }
}

/// Reference a fresh root scope for contexts (tests, `load`) that need to
/// run a parsed chunk as an independent vararg function without going
/// through [`super::State`].
pub fn root_scope() -> Scope {
    Scope::root()
}
