//! `io` library (spec.md §4.6, §5 "file handles are `<close>`-eligible").
//!
//! Grounded on the teacher's `stdlib/io.rs` for the function roster; file
//! handles are host [`crate::value::UserData`] carrying a `__close`
//! metamethod, exactly the shape §6.3 describes for resource-owning
//! userdata.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::rc::Rc;

use crate::error::{LuaError, LuaResult};
use crate::interp::Interpreter;
use crate::lib_registry::LibraryModule;
use crate::value::{Table, UserData, Value};

use super::{arg, arg_error, check_str};

enum Handle {
    File(BufReader<File>),
    WriteFile(File),
    Stdin,
    Stdout,
    Stderr,
    Closed,
}

const FILE_TYPE: &str = "FILE*";

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("io", crate::interp::StdlibTrustLevel::Restricted);
    macro_rules! f {
        ($name:expr, $func:expr) => {
            m.entries.push(crate::lib_registry::LibraryEntry::Function($name, $func))
        };
    }
    f!("open", open);
    f!("close", close);
    f!("read", read);
    f!("write", write);
    f!("lines", lines);
    f!("type", io_type);
    m.entries.push(crate::lib_registry::LibraryEntry::Value("stdin", || make_handle(Handle::Stdin)));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("stdout", || make_handle(Handle::Stdout)));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("stderr", || make_handle(Handle::Stderr)));
    m
}

fn file_metatable() -> Rc<RefCell<Table>> {
    thread_local! {
        static MT: Rc<RefCell<Table>> = Rc::new(RefCell::new(build_metatable()));
    }
    MT.with(|mt| mt.clone())
}

fn build_metatable() -> Table {
    let mut mt = Table::new();
    let mut methods = Table::new();
    let _ = methods.raw_set(Value::from_string("write"), Value::native_fn("file.write", write));
    let _ = methods.raw_set(Value::from_string("read"), Value::native_fn("file.read", read));
    let _ = methods.raw_set(Value::from_string("close"), Value::native_fn("file.close", close));
    let _ = methods.raw_set(Value::from_string("lines"), Value::native_fn("file.lines", lines));
    let _ = mt.raw_set(Value::from_string("__index"), Value::new_table(methods));
    let _ = mt.raw_set(Value::from_string("__close"), Value::native_fn("file.__close", file_close_mm));
    let _ = mt.raw_set(Value::from_string("__gc"), Value::native_fn("file.__gc", file_close_mm));
    mt
}

fn file_close_mm(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    close(_interp, args)
}

fn make_handle(h: Handle) -> Value {
    let mut ud = UserData::new(FILE_TYPE, h);
    ud.metatable = Some(file_metatable());
    Value::UserData(Rc::new(RefCell::new(ud)))
}

fn with_handle<T>(v: &Value, fname: &str, f: impl FnOnce(&mut Handle) -> LuaResult<T>) -> LuaResult<T> {
    let Value::UserData(ud) = v else { return Err(arg_error(fname, 1, format!("file expected, got {}", v.type_name()))) };
    let mut ud = ud.borrow_mut();
    let Some(handle) = ud.downcast_mut::<Handle>() else {
        return Err(arg_error(fname, 1, "file expected, got userdata"));
    };
    f(handle)
}

fn open(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_io() {
        return Ok(vec![Value::Nil, Value::from_string("io operations not permitted at this trust level")]);
    }
    let path = check_str(args, 0, "open")?;
    let mode = if args.len() >= 2 && !arg(args, 1).is_nil() { check_str(args, 1, "open")?.to_string_lossy().into_owned() } else { "r".to_string() };
    let path = path.to_string_lossy().into_owned();

    let result = if mode.contains('w') {
        File::create(&path).map(Handle::WriteFile)
    } else if mode.contains('a') {
        std::fs::OpenOptions::new().create(true).append(true).open(&path).map(Handle::WriteFile)
    } else {
        File::open(&path).map(|f| Handle::File(BufReader::new(f)))
    };

    match result {
        Ok(h) => Ok(vec![make_handle(h)]),
        Err(e) => Ok(vec![Value::Nil, Value::from_string(format!("{path}: {e}"))]),
    }
}

fn close(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let v = arg(args, 0);
    with_handle(&v, "close", |h| {
        if let Handle::WriteFile(f) = h {
            let _ = f.flush();
        }
        *h = Handle::Closed;
        Ok(())
    })?;
    Ok(vec![Value::Boolean(true)])
}

fn read_one(h: &mut Handle, fmt: &str, fname: &str) -> LuaResult<Value> {
    let fmt = fmt.trim_start_matches('*');
    match h {
        Handle::File(r) => read_from(r, fmt),
        Handle::Stdin => read_from(&mut std::io::stdin().lock(), fmt),
        Handle::Closed => Err(LuaError::library("attempt to use a closed file")),
        _ => Err(arg_error(fname, 1, "file not open for reading")),
    }
}

fn read_from(r: &mut impl BufRead, fmt: &str) -> LuaResult<Value> {
    match fmt {
        "l" | "" => {
            let mut line = String::new();
            let n = r.read_line(&mut line).map_err(|e| LuaError::library(e.to_string()))?;
            if n == 0 {
                return Ok(Value::Nil);
            }
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::from_string(line))
        }
        "L" => {
            let mut line = String::new();
            let n = r.read_line(&mut line).map_err(|e| LuaError::library(e.to_string()))?;
            if n == 0 {
                return Ok(Value::Nil);
            }
            Ok(Value::from_string(line))
        }
        "a" => {
            let mut buf = String::new();
            r.read_to_string(&mut buf).map_err(|e| LuaError::library(e.to_string()))?;
            Ok(Value::from_string(buf))
        }
        "n" => {
            let mut word = String::new();
            let mut byte = [0u8; 1];
            loop {
                match r.read(&mut byte) {
                    Ok(0) => break,
                    Ok(_) => {
                        let c = byte[0] as char;
                        if c.is_ascii_digit() || c == '.' || c == '-' || c == 'e' || c == 'E' || c == '+' {
                            word.push(c);
                        } else if !word.is_empty() {
                            break;
                        }
                    }
                    Err(e) => return Err(LuaError::library(e.to_string())),
                }
            }
            Ok(word.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Nil))
        }
        other => Err(LuaError::library(format!("invalid format '{other}'"))),
    }
}

fn read(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let v = arg(args, 0);
    let fmts: Vec<String> = if args.len() <= 1 {
        vec!["l".to_string()]
    } else {
        args[1..].iter().map(|a| match a {
            Value::Str(s) => s.to_string_lossy().into_owned(),
            other => crate::value::tostring_basic(other),
        }).collect()
    };
    let mut out = Vec::with_capacity(fmts.len());
    with_handle(&v, "read", |h| {
        for fmt in &fmts {
            out.push(read_one(h, fmt, "read")?);
        }
        Ok(())
    })?;
    Ok(out)
}

fn write(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let v = arg(args, 0);
    with_handle(&v, "write", |h| {
        for piece in &args[1..] {
            let s = crate::interp::operators::tostring(interp, piece)?;
            match h {
                Handle::WriteFile(f) => f.write_all(s.as_bytes()).map_err(|e| LuaError::library(e.to_string()))?,
                Handle::Stdout => print!("{s}"),
                Handle::Stderr => eprint!("{s}"),
                Handle::Closed => return Err(LuaError::library("attempt to use a closed file")),
                _ => return Err(arg_error("write", 1, "file not open for writing")),
            }
        }
        Ok(())
    })?;
    Ok(vec![v])
}

fn lines(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let handle_value = if let Value::Str(_) = arg(args, 0) {
        open(interp, &[arg(args, 0), Value::from_string("r")])?.into_iter().next().unwrap_or(Value::Nil)
    } else {
        arg(args, 0)
    };
    let mut state = Table::new();
    let _ = state.raw_set(Value::from_string("handle"), handle_value);
    Ok(vec![Value::native_fn("io.lines_iterator", lines_iterator), Value::new_table(state), Value::Nil])
}

fn lines_iterator(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let state = super::check_table(args, 0, "lines")?;
    let handle = state.borrow().raw_get(&Value::from_string("handle"));
    let line = with_handle(&handle, "lines", |h| read_one(h, "l", "lines"))?;
    if line.is_nil() {
        let _ = with_handle(&handle, "lines", |h| {
            *h = Handle::Closed;
            Ok(())
        });
    }
    Ok(vec![line])
}

fn io_type(_interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let v = arg(args, 0);
    let Value::UserData(ud) = &v else { return Ok(vec![Value::Nil]) };
    if ud.borrow().type_name != FILE_TYPE {
        return Ok(vec![Value::Nil]);
    }
    let closed = with_handle(&v, "type", |h| Ok(matches!(h, Handle::Closed))).unwrap_or(false);
    Ok(vec![Value::from_string(if closed { "closed file" } else { "file" })])
}
