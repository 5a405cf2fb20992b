use std::cell::RefCell;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::env::Scope;
use crate::error::LuaResult;
use crate::interp::Interpreter;
use crate::parser::ast::Block;

/// Signature for host-registered callables (§6.3): `(args) -> Value[]`.
/// Unlike the teacher's stack-based `CFunction` (`fn(&mut LuaState) ->
/// LuaResult<usize>`, reading/writing a shared VM stack), native functions
/// here take and return plain slices/vectors — there is no VM register
/// stack in a tree-walking evaluator.
pub type NativeFn = fn(&mut Interpreter, &[crate::value::Value]) -> LuaResult<Vec<crate::value::Value>>;

/// A user-defined closure: parameters, AST body, captured environment, and
/// vararg flag (spec.md §3).
pub struct Closure {
    pub params: Vec<SmolStr>,
    pub is_vararg: bool,
    pub body: Rc<Block>,
    /// Upvalue chain, captured *by reference* (`CaptureForClosure`, spec.md
    /// §4.4) so mutations by the defining scope are observed on later calls.
    pub upvalues: Scope,
    pub name: RefCell<Option<String>>,
}

pub enum Function {
    Native { name: &'static str, f: NativeFn },
    Lua(Closure),
}

impl Function {
    pub fn name(&self) -> String {
        match self {
            Function::Native { name, .. } => name.to_string(),
            Function::Lua(c) => c.name.borrow().clone().unwrap_or_else(|| "?".to_string()),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Function::Native { .. })
    }
}
