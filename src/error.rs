//! Error and diagnostic types.
//!
//! Two distinct error shapes are used throughout the crate, mirroring the
//! split the teacher draws between `LuaParseError` (located, collected,
//! non-fatal to the batch) and `LuaError`/`LuaFullError` (a single runtime
//! error that unwinds until a protected-call boundary or the host).

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A located, structured diagnostic produced by the lexer or parser.
///
/// Matches §6.1: `{code, severity, message, file, line, column, help?}`.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, file: &str, line: u32, column: u32) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {} [{}]", self.file, self.line, self.column, self.message, self.code)?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

/// The kind of a runtime [`LuaError`]. Kept separate from the payload so a
/// `match` on kind doesn't need to touch the (possibly large) `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RuntimeError,
    TypeError,
    NameError,
    ArithmeticError,
    CoroutineError,
    LibraryError,
    HostError,
    StackOverflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::RuntimeError => "runtime error",
            ErrorKind::TypeError => "type error",
            ErrorKind::NameError => "name error",
            ErrorKind::ArithmeticError => "arithmetic error",
            ErrorKind::CoroutineError => "coroutine error",
            ErrorKind::LibraryError => "library error",
            ErrorKind::HostError => "host error",
            ErrorKind::StackOverflow => "stack overflow",
        };
        write!(f, "{s}")
    }
}

/// A runtime error. The payload is an arbitrary Lua [`Value`] (S6 requires
/// `error({code=42})` to survive a round trip through `pcall`), optionally
/// chained to a cause (used when a `<close>` handler raises during unwind).
#[derive(Debug, Clone)]
pub struct LuaError {
    pub kind: ErrorKind,
    pub value: Value,
    cause: Option<Rc<LuaError>>,
}

impl LuaError {
    pub fn new(kind: ErrorKind, value: Value) -> Self {
        LuaError { kind, value, cause: None }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::RuntimeError, Value::from_string(message.into()))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::TypeError, Value::from_string(message.into()))
    }

    pub fn name_error(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::NameError, Value::from_string(message.into()))
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::ArithmeticError, Value::from_string(message.into()))
    }

    pub fn library(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::LibraryError, Value::from_string(message.into()))
    }

    pub fn coroutine(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::CoroutineError, Value::from_string(message.into()))
    }

    pub fn host(message: impl Into<String>) -> Self {
        LuaError::new(ErrorKind::HostError, Value::from_string(message.into()))
    }

    pub fn stack_overflow() -> Self {
        LuaError::new(ErrorKind::StackOverflow, Value::from_string("stack overflow"))
    }

    /// Prefix a string error value with `file:line:`, the way `error(msg, level)`
    /// does when `msg` is a string (non-string error objects are left alone).
    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        if let Value::Str(s) = &self.value {
            let text = s.to_string_lossy();
            self.value = Value::from_string(format!("{file}:{line}: {text}"));
        }
        self
    }

    /// Chain this error as the cause of a new one, as happens when a
    /// `__close` handler itself raises during scope unwind.
    pub fn chain(new: LuaError, cause: LuaError) -> Self {
        let mut chained = new;
        chained.cause = Some(Rc::new(cause));
        chained
    }

    pub fn cause(&self) -> Option<&LuaError> {
        self.cause.as_deref()
    }

    /// Best-effort human readable rendering of the error's value, used for
    /// unhandled errors reaching the host boundary (§7).
    pub fn message(&self) -> String {
        match &self.value {
            Value::Str(s) => s.to_string_lossy().into_owned(),
            other => crate::value::tostring_basic(other),
        }
    }
}

impl fmt::Display for LuaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())?;
        if let Some(cause) = &self.cause {
            write!(f, "\n  while handling: {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LuaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type LuaResult<T> = Result<T, LuaError>;
