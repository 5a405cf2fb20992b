//! Standard library registration (spec.md §4.6).
//!
//! Grounded on the teacher's `lib_registry.rs` (`LibraryModule`, the
//! `lib_module!` macro, `LibraryRegistry::load_all`), adapted from the
//! teacher's stack-based `CFunction: fn(&mut LuaState) -> LuaResult<usize>`
//! convention to this crate's direct value-list `NativeFn` (there is no VM
//! register stack to push return values onto).

use crate::interp::{Interpreter, StdlibTrustLevel};
use crate::value::{NativeFn, Value};

/// A named Rust function or constant to install in a library table.
pub enum LibraryEntry {
    Function(&'static str, NativeFn),
    Value(&'static str, fn() -> Value),
    /// A pre-built value, for entries (like `package.loaded`) that need to
    /// close over shared state a bare `fn() -> Value` can't capture.
    Constant(&'static str, Value),
}

/// A library module: a name (`"math"`, `"string"`, ...) plus its entries.
/// `name == "_G"` means the entries are installed directly as globals
/// rather than inside a sub-table, matching the teacher's convention for
/// the basic library.
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<LibraryEntry>,
    pub min_trust: StdlibTrustLevel,
}

impl LibraryModule {
    pub fn new(name: &'static str, min_trust: StdlibTrustLevel) -> Self {
        LibraryModule { name, entries: Vec::new(), min_trust }
    }
}

/// Builds a [`LibraryModule`] from a brace-delimited list of `"name" =>
/// function` pairs, the same shape as the teacher's `lib_module!`.
#[macro_export]
macro_rules! lib_module {
    ($name:expr, $trust:expr, { $($item_name:expr => $item:expr),* $(,)? }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name, $trust);
        $(
            module.entries.push($crate::lib_registry::LibraryEntry::Function($item_name, $item));
        )*
        module
    }};
}

fn install_module(interp: &mut Interpreter, module: LibraryModule) {
    if module.min_trust > interp.trust_level {
        return;
    }
    if module.name == "_G" {
        for entry in module.entries {
            match entry {
                LibraryEntry::Function(name, f) => interp.set_global(name, Value::native_fn(name, f)),
                LibraryEntry::Value(name, init) => interp.set_global(name, init()),
                LibraryEntry::Constant(name, value) => interp.set_global(name, value),
            }
        }
        return;
    }

    let mut table = crate::value::Table::new();
    for entry in module.entries {
        match entry {
            LibraryEntry::Function(name, f) => {
                let _ = table.raw_set(Value::from_string(name), Value::native_fn(name, f));
            }
            LibraryEntry::Value(name, init) => {
                let _ = table.raw_set(Value::from_string(name), init());
            }
            LibraryEntry::Constant(name, value) => {
                let _ = table.raw_set(Value::from_string(name), value);
            }
        }
    }
    let table_value = Value::new_table(table);

    if module.name == "string" {
        // `("x"):upper()` resolves through the shared string metatable's
        // `__index`, matching how the teacher installs `string` as the
        // metatable for every string value.
        let _ = interp
            .string_metatable
            .borrow_mut()
            .raw_set(Value::from_string("__index"), table_value.clone());
    }

    interp.set_global(module.name, table_value.clone());

    if let Value::Table(package) = interp.get_global("package") {
        if let Value::Table(loaded) = package.borrow().raw_get(&Value::from_string("loaded")) {
            let _ = loaded.borrow_mut().raw_set(Value::from_string(module.name), table_value);
        }
    }
}

/// Registers every standard-library module allowed at `interp`'s trust
/// level (spec.md §6.2). Called once from [`crate::interp::State::new`].
pub fn install_standard_library(interp: &mut Interpreter) {
    install_module(interp, crate::stdlib::package::module());
    install_module(interp, crate::stdlib::basic::module());
    crate::stdlib::basic::install_g_self_reference(interp);
    install_module(interp, crate::stdlib::string::module());
    install_module(interp, crate::stdlib::table::module());
    install_module(interp, crate::stdlib::math::module());
    install_module(interp, crate::stdlib::os::module());
    install_module(interp, crate::stdlib::io::module());
    install_module(interp, crate::stdlib::utf8::module());
    install_module(interp, crate::stdlib::coroutine::module());
    install_module(interp, crate::stdlib::debug::module());
}
