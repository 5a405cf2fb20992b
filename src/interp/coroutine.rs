//! Coroutine scheduling (spec.md §4.7, §5 "Concurrency & Resource Model").
//!
//! The teacher's coroutines are stackful but still run inside the one VM's
//! register stack (`stdlib/coroutine.rs`, `ThreadId`-addressed). Design
//! Notes §9 sanctions a different strategy for a tree-walking evaluator
//! that can't easily snapshot/restore a Rust call stack: each Lua
//! coroutine gets its own OS thread, and `resume`/`yield` are a blocking
//! handoff over a pair of zero-capacity channels, so exactly one thread is
//! ever executing Lua code at a time (spec.md §5: "a state's coroutines
//! never run concurrently").
//!
//! That single-runner guarantee is what makes the `unsafe impl Send` below
//! sound: `Value`/`LuaError` carry `Rc`s and are not `Send`, but they never
//! cross threads while *live* on two threads at once — the sender always
//! blocks until the receiver has taken exclusive ownership, so there is
//! never a moment where both the resuming and resumed thread can reach the
//! same `Rc` concurrently.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

use log::debug;

use crate::error::LuaError;
use crate::value::{Thread, ThreadStatus, Value};

use super::Interpreter;

enum Message {
    Resume(Vec<Value>),
}

enum Response {
    Yield(Vec<Value>),
    Return(Vec<Value>),
    Error(LuaError),
}

/// Smuggle a non-`Send` value across the resume/yield handoff. Safe only
/// under the single-runner invariant documented on this module.
struct ForceSend<T>(T);
unsafe impl<T> Send for ForceSend<T> {}

pub struct CoroutineHandle {
    to_co: mpsc::SyncSender<ForceSend<Message>>,
    from_co: mpsc::Receiver<ForceSend<Response>>,
}

struct YieldChannel {
    to_main: mpsc::SyncSender<ForceSend<Response>>,
    from_main: mpsc::Receiver<ForceSend<Message>>,
}

thread_local! {
    /// Set once, at the top of a coroutine's OS thread, so `yield_now`
    /// (running deep in that same thread's call stack) can find its way
    /// back to whichever thread resumed it.
    static YIELD_CHANNEL: RefCell<Option<YieldChannel>> = const { RefCell::new(None) };
}

pub enum ResumeOutcome {
    Yielded(Vec<Value>),
    Returned(Vec<Value>),
    Errored(LuaError),
}

/// `coroutine.resume(co, ...)` (driven from whichever thread is currently
/// running Lua code — main or another coroutine).
pub fn resume(interp: &mut Interpreter, thread: &Rc<RefCell<Thread>>, args: Vec<Value>) -> ResumeOutcome {
    {
        let status = thread.borrow().status;
        match status {
            ThreadStatus::Dead => return ResumeOutcome::Errored(LuaError::coroutine("cannot resume dead coroutine")),
            ThreadStatus::Running | ThreadStatus::Normal => {
                return ResumeOutcome::Errored(LuaError::coroutine("cannot resume non-suspended coroutine"))
            }
            ThreadStatus::Suspended => {}
        }
    }

    if thread.borrow().handle.is_none() {
        spawn_coroutine(interp, thread);
    }

    thread.borrow_mut().status = ThreadStatus::Running;
    interp.coroutine_stack.push(Rc::clone(thread));

    let send_result = {
        let t = thread.borrow();
        t.handle.as_ref().unwrap().to_co.send(ForceSend(Message::Resume(args)))
    };
    if send_result.is_err() {
        interp.coroutine_stack.pop();
        thread.borrow_mut().status = ThreadStatus::Dead;
        return ResumeOutcome::Errored(LuaError::coroutine("coroutine thread terminated unexpectedly"));
    }

    let response = {
        let t = thread.borrow();
        t.handle.as_ref().unwrap().from_co.recv()
    };
    interp.coroutine_stack.pop();

    match response {
        Ok(ForceSend(Response::Yield(values))) => {
            thread.borrow_mut().status = ThreadStatus::Suspended;
            ResumeOutcome::Yielded(values)
        }
        Ok(ForceSend(Response::Return(values))) => {
            thread.borrow_mut().status = ThreadStatus::Dead;
            ResumeOutcome::Returned(values)
        }
        Ok(ForceSend(Response::Error(e))) => {
            thread.borrow_mut().status = ThreadStatus::Dead;
            ResumeOutcome::Errored(e)
        }
        Err(_) => {
            thread.borrow_mut().status = ThreadStatus::Dead;
            ResumeOutcome::Errored(LuaError::coroutine("coroutine thread terminated unexpectedly"))
        }
    }
}

fn spawn_coroutine(interp: &mut Interpreter, thread: &Rc<RefCell<Thread>>) {
    let (to_co_tx, to_co_rx) = mpsc::sync_channel::<ForceSend<Message>>(0);
    let (from_co_tx, from_co_rx) = mpsc::sync_channel::<ForceSend<Response>>(0);

    let function = thread.borrow().function.clone();
    let interp_ptr: *mut Interpreter = interp;

    let payload = ForceSend((interp_ptr, function, to_co_rx, from_co_tx));
    let builder = thread::Builder::new().name("lua-coroutine".to_string());
    let join = builder.spawn(move || {
        let ForceSend((interp_ptr, function, to_co_rx, from_co_tx)) = payload;

        let first_args = match to_co_rx.recv() {
            Ok(ForceSend(Message::Resume(args))) => args,
            Err(_) => return,
        };

        YIELD_CHANNEL.with(|c| {
            *c.borrow_mut() = Some(YieldChannel { to_main: from_co_tx.clone(), from_main: to_co_rx });
        });

        // SAFETY: see the module-level invariant — the resuming thread is
        // blocked on `from_co.recv()` for the entire duration this
        // coroutine thread touches `*interp_ptr`.
        let interp: &mut Interpreter = unsafe { &mut *interp_ptr };
        let outcome = super::call::call_value(interp, function, first_args, 0);

        let response = match outcome {
            Ok(values) => Response::Return(values),
            Err(e) => Response::Error(e),
        };
        let _ = from_co_tx.send(ForceSend(response));
    });

    let join = match join {
        Ok(j) => j,
        Err(e) => {
            debug!("failed to spawn coroutine thread: {e}");
            return;
        }
    };
    // Detached: the thread lives for as long as it has work, and is never
    // explicitly joined (dropping a `JoinHandle` does not stop the thread).
    drop(join);

    thread.borrow_mut().handle = Some(CoroutineHandle { to_co: to_co_tx, from_co: from_co_rx });
}

/// `coroutine.yield(...)`, called from inside a coroutine's own OS thread.
pub fn yield_now(values: Vec<Value>) -> Result<Vec<Value>, LuaError> {
    YIELD_CHANNEL.with(|c| {
        let channel = c.borrow();
        let Some(channel) = channel.as_ref() else {
            return Err(LuaError::coroutine("attempt to yield from outside a coroutine"));
        };
        channel
            .to_main
            .send(ForceSend(Response::Yield(values)))
            .map_err(|_| LuaError::coroutine("coroutine channel closed"))?;
        match channel.from_main.recv() {
            Ok(ForceSend(Message::Resume(args))) => Ok(args),
            Err(_) => Err(LuaError::coroutine("coroutine channel closed")),
        }
    })
}

pub fn is_yieldable() -> bool {
    YIELD_CHANNEL.with(|c| c.borrow().is_some())
}

/// `coroutine.close(co)`: force a suspended or dead coroutine closed.
/// Dropping the handle closes its channels, which unblocks a coroutine
/// parked in [`yield_now`] with a `RecvError` that it surfaces as a
/// coroutine error and then exits on its own thread.
pub fn close(thread: &Rc<RefCell<Thread>>) -> Result<(), LuaError> {
    let status = thread.borrow().status;
    if status == ThreadStatus::Running || status == ThreadStatus::Normal {
        return Err(LuaError::coroutine("cannot close a running coroutine"));
    }
    thread.borrow_mut().handle = None;
    thread.borrow_mut().status = ThreadStatus::Dead;
    Ok(())
}
