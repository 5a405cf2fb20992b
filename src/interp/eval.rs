//! Expression evaluation (spec.md §4.5).
//!
//! Mirrors the teacher's expression-side opcode handlers
//! (`lua_vm/execute/*`) one AST node at a time instead of one opcode at a
//! time; the multi-value/adjustment rules (`eval_multi`/`eval_exprlist`)
//! are the tree-walking equivalent of the teacher's `LUA_MULTRET` handling
//! in `lua_call_frame.rs`.

use std::rc::Rc;

use crate::env::Scope;
use crate::error::LuaResult;
use crate::parser::ast::{BinOp, Expr, Field, FunctionBody, UnOp};
use crate::value::{Closure, Function, Table, Value};

use super::{call, operators, Interpreter};

/// Evaluate `expr` to exactly one value (Lua's usual single-value context:
/// anywhere but the tail of an explist).
pub fn eval_expr(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], expr: &Expr) -> LuaResult<Value> {
    match expr {
        Expr::Nil => Ok(Value::Nil),
        Expr::True => Ok(Value::Boolean(true)),
        Expr::False => Ok(Value::Boolean(false)),
        Expr::Int(i) => Ok(Value::Integer(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(bytes) => Ok(Value::from_bytes(bytes)),
        Expr::Vararg(_) => Ok(varargs.first().cloned().unwrap_or(Value::Nil)),
        Expr::Name(name, pos) => resolve_name(interp, scope, name, pos.line),
        Expr::Paren(inner) => eval_expr(interp, scope, varargs, inner),
        Expr::Index { obj, key, pos } => {
            let o = eval_expr(interp, scope, varargs, obj)?;
            let k = eval_expr(interp, scope, varargs, key)?;
            operators::index(interp, &o, &k).map_err(|e| interp.error_at(pos.line, e.message()))
        }
        Expr::Call { .. } | Expr::MethodCall { .. } => {
            Ok(eval_multi(interp, scope, varargs, expr)?.into_iter().next().unwrap_or(Value::Nil))
        }
        Expr::Function(body) => Ok(make_closure(scope, body)),
        Expr::Table(fields, pos) => eval_table_ctor(interp, scope, varargs, fields, pos.line),
        Expr::Binary { op: BinOp::And, lhs, rhs, .. } => {
            let l = eval_expr(interp, scope, varargs, lhs)?;
            if l.is_truthy() {
                eval_expr(interp, scope, varargs, rhs)
            } else {
                Ok(l)
            }
        }
        Expr::Binary { op: BinOp::Or, lhs, rhs, .. } => {
            let l = eval_expr(interp, scope, varargs, lhs)?;
            if l.is_truthy() {
                Ok(l)
            } else {
                eval_expr(interp, scope, varargs, rhs)
            }
        }
        Expr::Binary { op, lhs, rhs, pos } => {
            let l = eval_expr(interp, scope, varargs, lhs)?;
            let r = eval_expr(interp, scope, varargs, rhs)?;
            operators::eval_binary(interp, *op, l, r).map_err(|e| interp.error_at(pos.line, e.message()))
        }
        Expr::Unary { op, expr, pos } => {
            let v = eval_expr(interp, scope, varargs, expr)?;
            eval_unary(interp, *op, v).map_err(|e| interp.error_at(pos.line, e.message()))
        }
    }
}

fn eval_unary(interp: &mut Interpreter, op: UnOp, v: Value) -> LuaResult<Value> {
    match op {
        UnOp::Not => Ok(Value::Boolean(!v.is_truthy())),
        UnOp::Neg => operators::unary_neg(interp, v),
        UnOp::Len => operators::length(interp, &v),
        UnOp::BNot => operators::unary_bnot(interp, v),
    }
}

fn resolve_name(interp: &mut Interpreter, scope: &Scope, name: &str, line: u32) -> LuaResult<Value> {
    if let Some(v) = scope.lookup(name) {
        return Ok(v);
    }
    let globals = Value::Table(Rc::clone(&interp.globals));
    operators::index(interp, &globals, &Value::from_string(name)).map_err(|e| interp.error_at(line, e.message()))
}

pub fn assign_name(interp: &mut Interpreter, scope: &Scope, name: &str, value: Value, line: u32) -> LuaResult<()> {
    if scope.assign(name, value.clone())? {
        return Ok(());
    }
    let globals = Value::Table(Rc::clone(&interp.globals));
    operators::newindex(interp, &globals, &Value::from_string(name), value).map_err(|e| interp.error_at(line, e.message()))
}

/// Evaluate `expr` in a context that accepts multiple values (the tail of
/// an explist, `return`, call arguments): only calls and `...` expand.
pub fn eval_multi(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], expr: &Expr) -> LuaResult<Vec<Value>> {
    match expr {
        Expr::Vararg(_) => Ok(varargs.to_vec()),
        Expr::Call { func, args, pos } => {
            let f = eval_expr(interp, scope, varargs, func)?;
            let argv = eval_exprlist(interp, scope, varargs, args)?;
            call::call_value(interp, f, argv, pos.line)
        }
        Expr::MethodCall { obj, method, args, pos } => {
            let o = eval_expr(interp, scope, varargs, obj)?;
            let f = operators::index(interp, &o, &Value::from_string(method.as_str()))
                .map_err(|e| interp.error_at(pos.line, e.message()))?;
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(o);
            argv.extend(eval_exprlist(interp, scope, varargs, args)?);
            call::call_value(interp, f, argv, pos.line)
        }
        other => Ok(vec![eval_expr(interp, scope, varargs, other)?]),
    }
}

/// Evaluate an explist with Lua's adjustment rule: every element but the
/// last contributes exactly one value; the last expands if it's a call or
/// `...` (spec.md §4.5).
pub fn eval_exprlist(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], exprs: &[Expr]) -> LuaResult<Vec<Value>> {
    let mut out = Vec::with_capacity(exprs.len());
    for (i, e) in exprs.iter().enumerate() {
        if i + 1 == exprs.len() && e.is_multi() {
            out.extend(eval_multi(interp, scope, varargs, e)?);
        } else {
            out.push(eval_expr(interp, scope, varargs, e)?);
        }
    }
    Ok(out)
}

fn make_closure(scope: &Scope, body: &Rc<FunctionBody>) -> Value {
    let closure = Closure {
        params: body.params.clone(),
        is_vararg: body.is_vararg,
        body: Rc::clone(&body.body),
        upvalues: scope.clone(),
        name: std::cell::RefCell::new(body.name_hint.clone()),
    };
    Value::Function(Rc::new(Function::Lua(closure)))
}

fn eval_table_ctor(interp: &mut Interpreter, scope: &Scope, varargs: &[Value], fields: &[Field], line: u32) -> LuaResult<Value> {
    let mut table = Table::new();
    let mut next_index: i64 = 1;
    for (i, field) in fields.iter().enumerate() {
        match field {
            Field::Named(name, value_expr) => {
                let v = eval_expr(interp, scope, varargs, value_expr)?;
                table.raw_set(Value::from_string(name.as_str()), v).map_err(|e| interp.error_at(line, e))?;
            }
            Field::Indexed(key_expr, value_expr) => {
                let k = eval_expr(interp, scope, varargs, key_expr)?;
                let v = eval_expr(interp, scope, varargs, value_expr)?;
                table.raw_set(k, v).map_err(|e| interp.error_at(line, e))?;
            }
            Field::Positional(value_expr) => {
                if i + 1 == fields.len() && value_expr.is_multi() {
                    for v in eval_multi(interp, scope, varargs, value_expr)? {
                        table.raw_set(Value::Integer(next_index), v).map_err(|e| interp.error_at(line, e))?;
                        next_index += 1;
                    }
                } else {
                    let v = eval_expr(interp, scope, varargs, value_expr)?;
                    table.raw_set(Value::Integer(next_index), v).map_err(|e| interp.error_at(line, e))?;
                    next_index += 1;
                }
            }
        }
    }
    Ok(Value::new_table(table))
}
