//! `package` table and `require` (spec.md §6.4).
//!
//! Grounded on the teacher's module-resolution notes; the default searcher
//! chain is `package.preload` then a filesystem searcher gated by trust
//! level, each entry a `(name) -> value` Lua-callable the way §6.4 describes.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::error::{LuaError, LuaResult};
use crate::interp::{call, Interpreter};
use crate::lib_registry::LibraryModule;
use crate::value::{Table, Value};

use super::check_str;

pub fn module() -> LibraryModule {
    let mut m = LibraryModule::new("package", crate::interp::StdlibTrustLevel::Untrusted);
    let loaded = Value::new_table(Table::new());
    let preload = Value::new_table(Table::new());
    let searchers_list = Value::new_table({
        let mut t = Table::new();
        let _ = t.raw_set(Value::Integer(1), Value::native_fn("preload_searcher", preload_searcher));
        let _ = t.raw_set(Value::Integer(2), Value::native_fn("fs_searcher", fs_searcher));
        t
    });
    m.entries.push(crate::lib_registry::LibraryEntry::Constant("loaded", loaded));
    m.entries.push(crate::lib_registry::LibraryEntry::Constant("preload", preload));
    m.entries.push(crate::lib_registry::LibraryEntry::Constant("searchers", searchers_list));
    m.entries.push(crate::lib_registry::LibraryEntry::Value("path", || Value::from_string("./?.lua;./?/init.lua")));
    m
}

fn package_table(interp: &mut Interpreter) -> Option<Rc<RefCell<Table>>> {
    match interp.get_global("package") {
        Value::Table(t) => Some(t),
        _ => None,
    }
}

fn sub_table(pkg: &Rc<RefCell<Table>>, key: &str) -> Option<Rc<RefCell<Table>>> {
    match pkg.borrow().raw_get(&Value::from_string(key)) {
        Value::Table(t) => Some(t),
        _ => None,
    }
}

/// `require(name)`. Installed as a global (not under `package.*`) to match
/// real Lua's surface, re-using `package.loaded`/`preload`/`searchers` for
/// bookkeeping.
pub fn require(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let name = check_str(args, 0, "require")?;
    let name_str = name.to_string_lossy().into_owned();
    let Some(pkg) = package_table(interp) else { return Err(LuaError::library("package table missing")) };

    if let Some(loaded) = sub_table(&pkg, "loaded") {
        let cached = loaded.borrow().raw_get(&Value::from_string(&name_str));
        if !cached.is_nil() {
            debug!("require: cache hit for '{name_str}'");
            return Ok(vec![cached]);
        }
    }
    debug!("require: cache miss for '{name_str}', consulting searchers");

    let Some(searchers) = sub_table(&pkg, "searchers") else { return Err(LuaError::library("package.searchers missing")) };
    let count = searchers.borrow().array_len() as i64;
    for i in 1..=count {
        let searcher = searchers.borrow().raw_get(&Value::Integer(i));
        if searcher.is_nil() {
            continue;
        }
        let mut results = call::call_value(interp, searcher, vec![Value::from_string(&name_str)], 0)?;
        if results.is_empty() || results[0].is_nil() {
            continue;
        }
        let loader = results.remove(0);
        let extra = results.into_iter().next().unwrap_or(Value::Nil);
        let mut loaded_values = call::call_value(interp, loader, vec![Value::from_string(&name_str), extra], 0)?;
        let value = if loaded_values.is_empty() || loaded_values[0].is_nil() { Value::Boolean(true) } else { loaded_values.remove(0) };
        if let Some(loaded) = sub_table(&pkg, "loaded") {
            let _ = loaded.borrow_mut().raw_set(Value::from_string(&name_str), value.clone());
        }
        return Ok(vec![value]);
    }
    Err(LuaError::library(format!("module '{name_str}' not found")))
}

fn preload_searcher(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    let name = check_str(args, 0, "require")?;
    let Some(pkg) = package_table(interp) else { return Ok(vec![Value::Nil]) };
    let Some(preload) = sub_table(&pkg, "preload") else { return Ok(vec![Value::Nil]) };
    let loader = preload.borrow().raw_get(&Value::from_string(name.to_string_lossy().as_ref()));
    if loader.is_nil() {
        Ok(vec![Value::Nil])
    } else {
        Ok(vec![loader])
    }
}

fn fs_searcher(interp: &mut Interpreter, args: &[Value]) -> LuaResult<Vec<Value>> {
    if !interp.trust_level.allows_filesystem_require() {
        return Ok(vec![Value::from_string("\n\tfilesystem require not permitted at this trust level")]);
    }
    let name = check_str(args, 0, "require")?.to_string_lossy().into_owned();
    let Some(pkg) = package_table(interp) else { return Ok(vec![Value::Nil]) };
    let path_template = match pkg.borrow().raw_get(&Value::from_string("path")) {
        Value::Str(s) => s.to_string_lossy().into_owned(),
        _ => "./?.lua".to_string(),
    };
    let modname_path = name.replace('.', std::path::MAIN_SEPARATOR_STR);

    let mut tried = String::new();
    for template in path_template.split(';') {
        let candidate = template.replace('?', &modname_path);
        match std::fs::read_to_string(&candidate) {
            Ok(source) => {
                return match crate::parser::parse(source.as_bytes(), &candidate) {
                    Ok(block) => {
                        let closure = crate::value::Closure {
                            params: Vec::new(),
                            is_vararg: true,
                            body: Rc::new(block),
                            upvalues: call::root_scope(),
                            name: RefCell::new(Some(candidate.clone())),
                        };
                        Ok(vec![
                            Value::Function(Rc::new(crate::value::Function::Lua(closure))),
                            Value::from_string(candidate),
                        ])
                    }
                    Err(diags) => Err(LuaError::library(
                        diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n"),
                    )),
                };
            }
            Err(_) => {
                tried.push_str(&format!("\n\tno file '{candidate}'"));
            }
        }
    }
    Ok(vec![Value::from_string(tried)])
}
