//! Lexically scoped environment chain (spec.md §3 "Environment", §4.4).
//!
//! The teacher has no direct analogue — it targets a register file, not a
//! name-indexed scope chain — so this module follows Design Notes §9's
//! guidance directly: scopes are `Rc`-shared frames so closures can capture
//! them by reference (`CaptureForClosure`) and observe later mutation by the
//! defining scope.
//!
//! Global variables are *not* modeled as a frame here: §4.4 describes the
//! globals frame as "accessible as `_ENV` and via `_G`", i.e. an ordinary
//! table value, so [`crate::interp::Interpreter`] falls back to a raw table
//! the scope chain doesn't know about once a name resolves to nothing here.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use smol_str::SmolStr;

use crate::error::{LuaError, LuaResult};
use crate::parser::ast::Attrib;
use crate::value::Value;

/// A single variable binding: value, attribute, declaration order (for
/// `<close>` unwind) and name (for error messages).
pub struct Cell {
    pub value: RefCell<Value>,
    pub attrib: Attrib,
    pub name: SmolStr,
}

struct Frame {
    vars: RefCell<AHashMap<SmolStr, Rc<Cell>>>,
    /// `<close>` cells declared in this frame, in declaration order.
    close_order: RefCell<Vec<Rc<Cell>>>,
    parent: Option<Scope>,
}

/// A lexical scope frame. Cheaply `Clone`-able (an `Rc` bump) so closures can
/// keep a handle to the frames they were defined in.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(Frame {
            vars: RefCell::new(AHashMap::default()),
            close_order: RefCell::new(Vec::new()),
            parent: None,
        }))
    }

    /// `PushScope`: open a new block frame chained to `self`.
    pub fn child(&self) -> Self {
        Scope(Rc::new(Frame {
            vars: RefCell::new(AHashMap::default()),
            close_order: RefCell::new(Vec::new()),
            parent: Some(self.clone()),
        }))
    }

    /// `DeclareLocal`: introduce (or shadow) a binding in this frame.
    /// `<close>` cells are validated here per §4.4: the initial value must be
    /// nil/false or carry a `__close` metamethod.
    pub fn declare(&self, name: SmolStr, value: Value, attrib: Attrib) -> LuaResult<()> {
        if attrib == Attrib::Close {
            let ok = matches!(value, Value::Nil | Value::Boolean(false))
                || crate::interp::operators::has_metamethod(&value, "__close");
            if !ok {
                return Err(LuaError::runtime(format!(
                    "variable '{name}' got a non-closable value"
                )));
            }
        }
        let cell = Rc::new(Cell { value: RefCell::new(value), attrib, name: name.clone() });
        if attrib == Attrib::Close {
            self.0.close_order.borrow_mut().push(Rc::clone(&cell));
        }
        self.0.vars.borrow_mut().insert(name, cell);
        Ok(())
    }

    fn find(&self, name: &str) -> Option<Rc<Cell>> {
        if let Some(cell) = self.0.vars.borrow().get(name) {
            return Some(Rc::clone(cell));
        }
        self.0.parent.as_ref().and_then(|p| p.find(name))
    }

    /// `Lookup`: returns `None` (not an error) for unknown names; caller
    /// falls back to the globals table.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.find(name).map(|c| c.value.borrow().clone())
    }

    /// `Assign`: walks frames outward; returns `false` if `name` isn't bound
    /// anywhere in the chain (caller then assigns the global).
    pub fn assign(&self, name: &str, value: Value) -> LuaResult<bool> {
        let Some(cell) = self.find(name) else { return Ok(false) };
        if cell.attrib == Attrib::Const {
            return Err(LuaError::name_error(format!("attempt to assign to const variable '{name}'")));
        }
        *cell.value.borrow_mut() = value;
        Ok(true)
    }

    /// `<close>` cells declared directly in this frame, in declaration order
    /// (caller reverses for unwind per §4.4).
    pub fn close_cells(&self) -> Vec<Rc<Cell>> {
        self.0.close_order.borrow().clone()
    }
}
