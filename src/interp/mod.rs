//! Tree-walking interpreter (spec.md §4.5, §6.2).
//!
//! The teacher compiles to a register-based bytecode and dispatches opcodes
//! (`lua_vm/execute/*`); Design Notes §9 explicitly sanctions trading that
//! for direct AST evaluation in a systems language that doesn't need a
//! portable bytecode format. The call-frame bookkeeping here (`CallFrame`,
//! depth limit, vararg handling) is still grounded on the teacher's
//! `lua_vm/lua_call_frame.rs`, just re-targeted at an AST node instead of a
//! `code_ptr`/`pc` pair.

pub mod call;
pub mod coroutine;
pub mod eval;
pub mod exec;
pub mod operators;

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::env::Scope;
use crate::error::{LuaError, LuaResult};
use crate::value::{Table, Value};

/// §6.2 trust levels, governing which stdlib surface `lib_registry` wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StdlibTrustLevel {
    Untrusted,
    Sandbox,
    Restricted,
    Trusted,
    FullTrust,
}

impl StdlibTrustLevel {
    pub fn allows_io(self) -> bool {
        self >= StdlibTrustLevel::Restricted
    }

    pub fn allows_os_execute(self) -> bool {
        self >= StdlibTrustLevel::Trusted
    }

    pub fn allows_debug(self) -> bool {
        self >= StdlibTrustLevel::Trusted
    }

    pub fn allows_filesystem_require(self) -> bool {
        self >= StdlibTrustLevel::Restricted
    }

    pub fn allows_load(self) -> bool {
        self >= StdlibTrustLevel::Trusted
    }
}

/// One entry of the call stack, used for recursion-depth limiting and for
/// `debug.traceback`/error location context. Unlike the teacher's
/// `LuaCallFrame`, there is no `code_ptr`/register base to track — a tree
/// walker's "program counter" is just the Rust call stack.
pub struct CallFrame {
    pub name: String,
    pub varargs: Vec<Value>,
}

/// Hard cap on nested Lua calls, standing in for the teacher's native stack
/// overflow guard (`LuaError::StackOverflow`). Picked well below the host
/// process's own stack limit since each level here costs several real Rust
/// stack frames (eval -> exec -> call -> eval ...).
pub const MAX_CALL_DEPTH: usize = 200;

pub struct Interpreter {
    pub globals: Rc<RefCell<Table>>,
    /// Shared metatable installed on every string value so `("x"):upper()`
    /// resolves through `string.upper` (§4.6).
    pub string_metatable: Rc<RefCell<Table>>,
    pub trust_level: StdlibTrustLevel,
    pub call_stack: Vec<CallFrame>,
    pub chunk_name: String,
    /// Placeholder `Thread` value representing the main thread, returned by
    /// `coroutine.running()` when nothing is resumed (spec.md §4.7).
    pub main_thread: Rc<RefCell<crate::value::Thread>>,
    /// Stack of currently-running coroutines, main thread excluded (empty
    /// when running on the main thread). See [`coroutine`].
    pub(crate) coroutine_stack: Vec<Rc<RefCell<crate::value::Thread>>>,
}

impl Interpreter {
    fn new(trust_level: StdlibTrustLevel) -> Self {
        let mut main_thread = crate::value::Thread::new(Value::Nil);
        main_thread.status = crate::value::ThreadStatus::Running;
        Interpreter {
            globals: Rc::new(RefCell::new(Table::new())),
            string_metatable: Rc::new(RefCell::new(Table::new())),
            trust_level,
            call_stack: Vec::new(),
            chunk_name: String::new(),
            main_thread: Rc::new(RefCell::new(main_thread)),
            coroutine_stack: Vec::new(),
        }
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let _ = self.globals.borrow_mut().raw_set(Value::from_string(name), value);
    }

    pub fn get_global(&self, name: &str) -> Value {
        self.globals.borrow().raw_get(&Value::from_string(name))
    }

    pub fn error_at(&self, line: u32, message: impl Into<String>) -> LuaError {
        LuaError::runtime(message).with_location(&self.chunk_name, line)
    }

    pub fn check_call_depth(&self) -> LuaResult<()> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            Err(LuaError::stack_overflow())
        } else {
            Ok(())
        }
    }
}

/// A Lua execution context (§6.2 `State`): globals, loaded standard library,
/// and a call stack. Hosts create one `State` per independent Lua "world".
pub struct State {
    pub(crate) interp: Interpreter,
}

impl State {
    /// `NewState(trustLevel)`.
    pub fn new(trust_level: StdlibTrustLevel) -> Self {
        let mut interp = Interpreter::new(trust_level);
        crate::lib_registry::install_standard_library(&mut interp);
        debug!("new State at trust level {:?}", trust_level);
        State { interp }
    }

    pub fn trust_level(&self) -> StdlibTrustLevel {
        self.interp.trust_level
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.interp.set_global(name, value);
    }

    pub fn get_global(&self, name: &str) -> Value {
        self.interp.get_global(name)
    }

    /// `Parse` + `Execute` in one step: parses `source` as a top-level chunk
    /// named `chunk_name` and runs it to completion.
    pub fn run(&mut self, source: &str, chunk_name: &str) -> LuaResult<Vec<Value>> {
        let block = crate::parser::parse(source.as_bytes(), chunk_name)
            .map_err(|diags| LuaError::runtime(render_diagnostics(&diags)))?;
        self.execute(Rc::new(block), chunk_name)
    }

    /// `Execute(state, ast)`: run an already-parsed chunk as a vararg
    /// function with no parameters, closed over an empty root scope.
    pub fn execute(&mut self, block: Rc<crate::parser::ast::Block>, chunk_name: &str) -> LuaResult<Vec<Value>> {
        self.interp.chunk_name = chunk_name.to_string();
        let root = Scope::root();
        self.interp.call_stack.push(CallFrame { name: chunk_name.to_string(), varargs: Vec::new() });
        let result = exec::exec_block(&mut self.interp, &root, &[], &block);
        self.interp.call_stack.pop();
        match result? {
            exec::StepResult::Return(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }

    /// `Call(state, value, args)`: invoke any callable Lua value from the
    /// host side.
    pub fn call(&mut self, value: Value, args: Vec<Value>) -> LuaResult<Vec<Value>> {
        call::call_value(&mut self.interp, value, args, 0)
    }
}

fn render_diagnostics(diags: &[crate::error::Diagnostic]) -> String {
    diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}
