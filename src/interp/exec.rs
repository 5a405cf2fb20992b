//! Statement execution (spec.md §4.5: control flow, assignment, for/while/
//! repeat, goto/labels, `<close>` unwind).
//!
//! The teacher dispatches one bytecode instruction per iteration of its
//! fetch loop (`lua_vm/execute/mod.rs`); here the "fetch loop" is just Rust
//! recursion over the AST, with [`StepResult`] standing in for the
//! teacher's `callstatus`/branch-target bookkeeping (`CIST_*` flags in
//! `lua_call_frame.rs`) since there's no program counter to jump.

use std::rc::Rc;

use smol_str::SmolStr;

use crate::env::Scope;
use crate::error::{LuaError, LuaResult};
use crate::parser::ast::{Block, Expr, Stmt};
use crate::value::Value;

use super::{call, eval, operators, Interpreter};

/// Outcome of executing one statement or block: either control falls
/// through normally, or it's unwinding for `break`, `goto`, or `return`.
pub enum StepResult {
    Normal,
    Break,
    Goto(SmolStr),
    Return(Vec<Value>),
}

fn find_label(block: &Block, name: &str) -> Option<usize> {
    block.iter().position(|s| matches!(s, Stmt::Label(l, _) if l.as_str() == name))
}

/// Close every `<close>` local declared directly in `scope`, in reverse
/// declaration order, per spec.md §4.4. If more than one handler raises,
/// only the first exception surfaces, with the rest dropped the way Lua's
/// own `luaF_close` leaves all but the first "in the air" — kept simple
/// here since the spec does not require preserving every intermediate
/// failure, only that *a* failure during unwind is reported.
fn close_scope(interp: &mut Interpreter, scope: &Scope, pending_err: Option<&LuaError>) -> LuaResult<()> {
    let mut cells = scope.close_cells();
    cells.reverse();
    for cell in cells {
        let value = cell.value.borrow().clone();
        if matches!(value, Value::Nil | Value::Boolean(false)) {
            continue;
        }
        if let Some(handler) = operators::get_metamethod(interp, &value, "__close") {
            let err_arg = pending_err.map(|e| e.value.clone()).unwrap_or(Value::Nil);
            call::call_value(interp, handler, vec![value, err_arg], 0)?;
        }
    }
    Ok(())
}

/// Run `block` in a fresh child scope of `parent`, closing any `<close>`
/// locals declared in it on every exit path (normal, break, goto, return,
/// or error) and chaining a `__close` failure onto a prior in-flight error.
fn exec_scoped(interp: &mut Interpreter, parent: &Scope, varargs: &[Value], block: &Block) -> LuaResult<StepResult> {
    let scope = parent.child();
    let result = exec_block(interp, &scope, varargs, block);
    match result {
        Ok(step) => {
            close_scope(interp, &scope, None)?;
            Ok(step)
        }
        Err(e) => match close_scope(interp, &scope, Some(&e)) {
            Ok(()) => Err(e),
            Err(close_err) => Err(LuaError::chain(close_err, e)),
        },
    }
}

/// Execute a sequence of statements, handling in-block `goto` targets by
/// jumping the statement index rather than recursing.
pub fn exec_block(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], block: &Block) -> LuaResult<StepResult> {
    let mut i = 0;
    while i < block.len() {
        match exec_stmt(interp, scope, varargs, &block[i])? {
            StepResult::Normal => i += 1,
            StepResult::Goto(label) => {
                if let Some(target) = find_label(block, &label) {
                    i = target + 1;
                } else {
                    return Ok(StepResult::Goto(label));
                }
            }
            other => return Ok(other),
        }
    }
    Ok(StepResult::Normal)
}

fn exec_stmt(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], stmt: &Stmt) -> LuaResult<StepResult> {
    interp.check_call_depth()?;
    match stmt {
        Stmt::Empty | Stmt::Label(..) => Ok(StepResult::Normal),
        Stmt::Break(_) => Ok(StepResult::Break),
        Stmt::Goto(name, _) => Ok(StepResult::Goto(name.clone())),
        Stmt::Return(exprs, _) => {
            Ok(StepResult::Return(eval::eval_exprlist(interp, scope, varargs, exprs)?))
        }
        Stmt::ExprStat(expr) => {
            eval::eval_multi(interp, scope, varargs, expr)?;
            Ok(StepResult::Normal)
        }
        Stmt::Local { names, values, pos } => {
            let mut vals = eval::eval_exprlist(interp, scope, varargs, values)?;
            vals.resize(names.len(), Value::Nil);
            for ((name, attrib), value) in names.iter().zip(vals) {
                scope.declare(name.clone(), value, *attrib).map_err(|e| interp.error_at(pos.line, e.message()))?;
            }
            Ok(StepResult::Normal)
        }
        Stmt::Assign { targets, values, pos } => {
            let mut vals = eval::eval_exprlist(interp, scope, varargs, values)?;
            vals.resize(targets.len(), Value::Nil);
            for (target, value) in targets.iter().zip(vals) {
                assign_target(interp, scope, varargs, target, value, pos.line)?;
            }
            Ok(StepResult::Normal)
        }
        Stmt::LocalFunction { name, body, pos } => {
            // Declare first (as nil) so the closure can capture itself for
            // recursion, then fill in the real value (spec.md §4.4).
            scope.declare(name.clone(), Value::Nil, crate::parser::ast::Attrib::None)
                .map_err(|e| interp.error_at(pos.line, e.message()))?;
            let fn_expr = Expr::Function(Rc::clone(body));
            let closure = eval::eval_expr(interp, scope, varargs, &fn_expr)?;
            scope.assign(name, closure)?;
            Ok(StepResult::Normal)
        }
        Stmt::FunctionDecl { target, body, pos } => {
            let fn_expr = Expr::Function(Rc::clone(body));
            let closure = eval::eval_expr(interp, scope, varargs, &fn_expr)?;
            assign_target(interp, scope, varargs, target, closure, pos.line)?;
            Ok(StepResult::Normal)
        }
        Stmt::Do(block) => exec_scoped(interp, scope, varargs, block),
        Stmt::If { arms, else_block, .. } => {
            for (cond, body) in arms {
                if eval::eval_expr(interp, scope, varargs, cond)?.is_truthy() {
                    return exec_scoped(interp, scope, varargs, body);
                }
            }
            match else_block {
                Some(body) => exec_scoped(interp, scope, varargs, body),
                None => Ok(StepResult::Normal),
            }
        }
        Stmt::While { cond, body, .. } => {
            while eval::eval_expr(interp, scope, varargs, cond)?.is_truthy() {
                match exec_scoped(interp, scope, varargs, body)? {
                    StepResult::Break => break,
                    StepResult::Normal => {}
                    other => return Ok(other),
                }
            }
            Ok(StepResult::Normal)
        }
        Stmt::Repeat { body, cond, .. } => {
            loop {
                // `until` can see locals from the body, so both share one
                // child scope per iteration (spec.md §4.1 grammar note).
                let iter_scope = scope.child();
                match exec_block(interp, &iter_scope, varargs, body) {
                    Ok(StepResult::Normal) => {
                        let done = eval::eval_expr(interp, &iter_scope, varargs, cond)?.is_truthy();
                        close_scope(interp, &iter_scope, None)?;
                        if done {
                            break;
                        }
                    }
                    Ok(StepResult::Break) => {
                        close_scope(interp, &iter_scope, None)?;
                        break;
                    }
                    Ok(other) => {
                        close_scope(interp, &iter_scope, None)?;
                        return Ok(other);
                    }
                    Err(e) => {
                        return match close_scope(interp, &iter_scope, Some(&e)) {
                            Ok(()) => Err(e),
                            Err(ce) => Err(LuaError::chain(ce, e)),
                        };
                    }
                }
            }
            Ok(StepResult::Normal)
        }
        Stmt::NumericFor { var, start, stop, step, body, pos } => {
            exec_numeric_for(interp, scope, varargs, var, start, stop, step.as_ref(), body, pos.line)
        }
        Stmt::GenericFor { names, exprs, body, pos } => {
            exec_generic_for(interp, scope, varargs, names, exprs, body, pos.line)
        }
    }
}

fn assign_target(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], target: &Expr, value: Value, line: u32) -> LuaResult<()> {
    match target {
        Expr::Name(name, pos) => eval::assign_name(interp, scope, name, value, pos.line),
        Expr::Index { obj, key, pos } => {
            let o = eval::eval_expr(interp, scope, varargs, obj)?;
            let k = eval::eval_expr(interp, scope, varargs, key)?;
            operators::newindex(interp, &o, &k, value).map_err(|e| interp.error_at(pos.line, e.message()))
        }
        _ => Err(interp.error_at(line, "cannot assign to this expression")),
    }
}

fn for_number(v: &Value) -> LuaResult<f64_or_i64::Num> {
    v.coerce_to_number()
        .and_then(|n| match n {
            Value::Integer(i) => Some(f64_or_i64::Num::Int(i)),
            Value::Float(f) => Some(f64_or_i64::Num::Float(f)),
            _ => None,
        })
        .ok_or_else(|| LuaError::runtime("'for' initial value must be a number"))
}

mod f64_or_i64 {
    #[derive(Clone, Copy)]
    pub enum Num {
        Int(i64),
        Float(f64),
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_numeric_for(
    interp: &mut Interpreter,
    scope: &Scope,
    varargs: &[Value],
    var: &SmolStr,
    start: &Expr,
    stop: &Expr,
    step: Option<&Expr>,
    body: &Block,
    line: u32,
) -> LuaResult<StepResult> {
    use f64_or_i64::Num;
    let start = for_number(&eval::eval_expr(interp, scope, varargs, start)?).map_err(|e| interp.error_at(line, e.message()))?;
    let stop = for_number(&eval::eval_expr(interp, scope, varargs, stop)?).map_err(|e| interp.error_at(line, e.message()))?;
    let step = match step {
        Some(e) => for_number(&eval::eval_expr(interp, scope, varargs, e)?).map_err(|e| interp.error_at(line, e.message()))?,
        None => Num::Int(1),
    };

    // If any of the three is a float, the whole loop runs in floats
    // (spec.md §4.5 numeric `for` rules).
    let all_int = matches!((start, stop, step), (Num::Int(_), Num::Int(_), Num::Int(_)));

    if all_int {
        let (Num::Int(mut i), Num::Int(stop), Num::Int(step)) = (start, stop, step) else { unreachable!() };
        if step == 0 {
            return Err(interp.error_at(line, "'for' step is zero"));
        }
        loop {
            if step > 0 && i > stop {
                break;
            }
            if step < 0 && i < stop {
                break;
            }
            let iter_scope = scope.child();
            iter_scope.declare(var.clone(), Value::Integer(i), crate::parser::ast::Attrib::None)
                .map_err(|e| interp.error_at(line, e.message()))?;
            match exec_block(interp, &iter_scope, varargs, body) {
                Ok(StepResult::Break) => {
                    close_scope(interp, &iter_scope, None)?;
                    break;
                }
                Ok(StepResult::Normal) => close_scope(interp, &iter_scope, None)?,
                Ok(other) => {
                    close_scope(interp, &iter_scope, None)?;
                    return Ok(other);
                }
                Err(e) => {
                    return match close_scope(interp, &iter_scope, Some(&e)) {
                        Ok(()) => Err(e),
                        Err(ce) => Err(LuaError::chain(ce, e)),
                    };
                }
            }
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    } else {
        let to_f = |n: Num| match n {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        };
        let (mut i, stop, step) = (to_f(start), to_f(stop), to_f(step));
        if step == 0.0 {
            return Err(interp.error_at(line, "'for' step is zero"));
        }
        loop {
            if step > 0.0 && i > stop {
                break;
            }
            if step < 0.0 && i < stop {
                break;
            }
            let iter_scope = scope.child();
            iter_scope.declare(var.clone(), Value::Float(i), crate::parser::ast::Attrib::None)
                .map_err(|e| interp.error_at(line, e.message()))?;
            match exec_block(interp, &iter_scope, varargs, body) {
                Ok(StepResult::Break) => {
                    close_scope(interp, &iter_scope, None)?;
                    break;
                }
                Ok(StepResult::Normal) => close_scope(interp, &iter_scope, None)?,
                Ok(other) => {
                    close_scope(interp, &iter_scope, None)?;
                    return Ok(other);
                }
                Err(e) => {
                    return match close_scope(interp, &iter_scope, Some(&e)) {
                        Ok(()) => Err(e),
                        Err(ce) => Err(LuaError::chain(ce, e)),
                    };
                }
            }
            i += step;
        }
    }
    Ok(StepResult::Normal)
}

fn exec_generic_for(
    interp: &mut Interpreter,
    scope: &Scope,
    varargs: &[Value],
    names: &[SmolStr],
    exprs: &[Expr],
    body: &Block,
    line: u32,
) -> LuaResult<StepResult> {
    let mut init = eval::eval_exprlist(interp, scope, varargs, exprs)?;
    init.resize(4, Value::Nil);
    let closing = init[3].clone();
    let f = init[0].clone();
    let state = init[1].clone();
    let mut control = init[2].clone();

    let run = (|| -> LuaResult<StepResult> {
        loop {
            let mut results = call::call_value(interp, f.clone(), vec![state.clone(), control.clone()], line)?;
            results.resize(names.len().max(1), Value::Nil);
            if results[0].is_nil() {
                return Ok(StepResult::Normal);
            }
            control = results[0].clone();
            let iter_scope = scope.child();
            for (name, value) in names.iter().zip(results.into_iter()) {
                iter_scope.declare(name.clone(), value, crate::parser::ast::Attrib::None)
                    .map_err(|e| interp.error_at(line, e.message()))?;
            }
            match exec_block(interp, &iter_scope, varargs, body) {
                Ok(StepResult::Break) => {
                    close_scope(interp, &iter_scope, None)?;
                    return Ok(StepResult::Normal);
                }
                Ok(StepResult::Normal) => close_scope(interp, &iter_scope, None)?,
                Ok(other) => {
                    close_scope(interp, &iter_scope, None)?;
                    return Ok(other);
                }
                Err(e) => {
                    return match close_scope(interp, &iter_scope, Some(&e)) {
                        Ok(()) => Err(e),
                        Err(ce) => Err(LuaError::chain(ce, e)),
                    };
                }
            }
        }
    })();

    if !closing.is_nil() {
        if let Some(handler) = operators::get_metamethod(interp, &closing, "__close") {
            let err_arg = match &run {
                Err(e) => e.value.clone(),
                _ => Value::Nil,
            };
            let close_result = call::call_value(interp, handler, vec![closing, err_arg], line);
            if let Err(close_err) = close_result {
                return match run {
                    Err(e) => Err(LuaError::chain(close_err, e)),
                    Ok(_) => Err(close_err),
                };
            }
        }
    }
    run
}
