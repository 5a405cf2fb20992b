//! Lua 5.4 core: lexer, parser, value model, and a tree-walking interpreter.
//!
//! This crate implements the *engine* — the question of how a Lua program
//! computes its result. It deliberately does not provide a script runner,
//! a REPL, or an embedding facade; those are collaborators built on top of
//! [`State`](interp::State)/[`Parser`](parser::Parser).

#[cfg(test)]
mod test;

pub mod env;
pub mod error;
pub mod gc;
pub mod interp;
pub mod lexer;
pub mod lib_registry;
pub mod parser;
pub mod pattern;
pub mod stdlib;
pub mod value;

pub use error::{Diagnostic, LuaError, Severity};
pub use interp::{State, StdlibTrustLevel};
pub use parser::Parser;
pub use value::{Table, Value};

/// Parse and execute a chunk of Lua source with a fully trusted state,
/// returning whatever values the chunk's top-level `return` produced.
///
/// This is the one-shot convenience entry point; hosts that need to reuse
/// a `State` across many chunks should call [`State::new`] and
/// [`State::execute`] directly (see §6 of the design document).
pub fn execute(source: &str) -> Result<Vec<Value>, LuaError> {
    let mut state = State::new(StdlibTrustLevel::Trusted);
    state.run(source, "chunk")
}
