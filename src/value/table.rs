//! Hybrid array + hash table (spec.md §3, §4.3).
//!
//! Grounded on the teacher's `lua_value/lua_table.rs` split between a dense
//! array part and a hash part, simplified to a plain `Vec`/`HashMap` pair
//! instead of the teacher's `hashbrown`-backed `NativeTable` with raw GC
//! pointers — the array-growth and rehash strategy is the same idea, just
//! without the custom allocator plumbing.

use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{float_to_integer_exact, Value};

/// A table key. Keys are normalized so that `t[1]` and `t[1.0]` address the
/// same slot (spec.md §4.2: integer/float equality). `Nil` and `NaN` keys
/// are rejected before a `TableKey` is ever constructed (see [`Table::set`]).
#[derive(Clone)]
struct TableKey(Value);

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for TableKey {}

impl std::hash::Hash for TableKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Nil => 0u8.hash(state),
            Value::Boolean(b) => { 1u8.hash(state); b.hash(state); }
            Value::Integer(i) => { 2u8.hash(state); i.hash(state); }
            Value::Float(f) => { 2u8.hash(state); (*f as i64).hash(state); } // only reached for non-integral floats is impossible post-normalization; kept defensive
            Value::Str(s) => { 3u8.hash(state); s.as_bytes().hash(state); }
            Value::Table(t) => { 4u8.hash(state); (Rc::as_ptr(t) as usize).hash(state); }
            Value::Function(f) => { 5u8.hash(state); (Rc::as_ptr(f) as usize).hash(state); }
            Value::Thread(t) => { 6u8.hash(state); (Rc::as_ptr(t) as usize).hash(state); }
            Value::UserData(u) => { 7u8.hash(state); (Rc::as_ptr(u) as usize).hash(state); }
        }
    }
}

/// Normalize a key the way Lua's `luaH_get`/`luaH_newkey` do: integral floats
/// become integers so `t[1]` and `t[1.0]` alias.
fn normalize_key(key: Value) -> Value {
    if let Value::Float(f) = key {
        if let Some(i) = float_to_integer_exact(f) {
            return Value::Integer(i);
        }
    }
    key
}

pub struct Table {
    /// `array[i]` holds `t[i + 1]`.
    array: Vec<Value>,
    hash: HashMap<TableKey, Value, RandomState>,
    pub metatable: Option<Rc<RefCell<Table>>>,
    /// Internal aid for library tables (spec.md §3): bits marking which
    /// entries are known-pristine so a builtin can skip a metatable/__index
    /// lookup. Cleared on any raw write. Never observed by Lua code.
    pristine_mask: u64,
}

impl Table {
    pub fn new() -> Self {
        Table {
            array: Vec::new(),
            hash: HashMap::with_hasher(RandomState::new()),
            metatable: None,
            pristine_mask: u64::MAX,
        }
    }

    pub fn with_capacity(array_cap: usize, hash_cap: usize) -> Self {
        Table {
            array: Vec::with_capacity(array_cap),
            hash: HashMap::with_capacity_and_hasher(hash_cap, RandomState::new()),
            metatable: None,
            pristine_mask: u64::MAX,
        }
    }

    /// Clear the pristine bit for a given small integer index; a no-op for
    /// indices beyond the tracked range. Internal bookkeeping only.
    fn mark_dirty(&mut self, key: &Value) {
        if let Value::Integer(i) = key {
            if *i >= 0 && *i < 64 {
                self.pristine_mask &= !(1u64 << i);
            }
        }
    }

    pub fn is_pristine(&self, index: u32) -> bool {
        index < 64 && (self.pristine_mask & (1u64 << index)) != 0
    }

    pub fn raw_get(&self, key: &Value) -> Value {
        let key = normalize_key(key.clone());
        if let Value::Integer(i) = key {
            if i >= 1 && (i as usize) <= self.array.len() {
                return self.array[(i - 1) as usize].clone();
            }
        }
        self.hash.get(&TableKey(key)).cloned().unwrap_or(Value::Nil)
    }

    /// `RawSet`: `Set(key, nil)` removes the key; assigning at `len+1`
    /// extends the array part (spec.md §3).
    pub fn raw_set(&mut self, key: Value, value: Value) -> Result<(), &'static str> {
        let key = normalize_key(key);
        if matches!(key, Value::Nil) {
            return Err("table index is nil");
        }
        if let Value::Float(f) = &key {
            if f.is_nan() {
                return Err("table index is NaN");
            }
        }

        self.mark_dirty(&key);

        if let Value::Integer(i) = key {
            if i >= 1 && (i as usize) <= self.array.len() {
                let idx = (i - 1) as usize;
                if matches!(value, Value::Nil) && idx == self.array.len() - 1 {
                    self.array.pop();
                    // Popping may expose further trailing nils left by
                    // earlier holes; trim them too.
                    while matches!(self.array.last(), Some(Value::Nil)) {
                        self.array.pop();
                    }
                } else {
                    self.array[idx] = value;
                }
                return Ok(());
            }
            if i as usize == self.array.len() + 1 && !matches!(value, Value::Nil) {
                self.array.push(value);
                // Migrate any contiguous successors already sitting in the
                // hash part into the array, as Lua's table constructor does.
                let mut next = self.array.len() as i64 + 1;
                while let Some(v) = self.hash.remove(&TableKey(Value::Integer(next))) {
                    self.array.push(v);
                    next += 1;
                }
                return Ok(());
            }
        }

        if matches!(value, Value::Nil) {
            self.hash.remove(&TableKey(key));
        } else {
            self.hash.insert(TableKey(key), value);
        }
        Ok(())
    }

    /// The `#` operator: any border (spec.md §4.3 GLOSSARY).
    pub fn length(&self) -> i64 {
        if !self.array.is_empty() && !matches!(self.array.last(), Some(Value::Nil)) {
            return self.array.len() as i64;
        }
        if self.array.is_empty() {
            // No array part border; check whether the hash part continues
            // a sequence starting at 1 (rare, but constructors like
            // `{[1]=1,[2]=2}` land entirely in the hash part).
            if matches!(self.hash.get(&TableKey(Value::Integer(1))), None) {
                return 0;
            }
        }
        // Binary search for a border within the array part (it may contain
        // internal holes from `t[k] = nil` on a non-trailing index).
        let (mut lo, mut hi) = (0usize, self.array.len());
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if matches!(self.array[mid - 1], Value::Nil) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        if lo == self.array.len() {
            // Array part is one contiguous run (or empty); a border may
            // continue into the hash part.
            let mut n = lo as i64;
            while !matches!(self.hash.get(&TableKey(Value::Integer(n + 1))), None) {
                n += 1;
            }
            n
        } else {
            lo as i64
        }
    }

    /// `next(t, k)`: array part first, then hash part, matching iteration
    /// order guarantees of spec.md §4.3.
    pub fn next(&self, key: &Value) -> Result<Option<(Value, Value)>, &'static str> {
        let key = normalize_key(key.clone());
        let start_hash_from_beginning;
        let mut array_idx = 0usize; // index into array to resume from (0-based)

        match &key {
            Value::Nil => {
                array_idx = 0;
                start_hash_from_beginning = true;
            }
            Value::Integer(i) if *i >= 1 && (*i as usize) <= self.array.len() => {
                array_idx = *i as usize;
                start_hash_from_beginning = true;
            }
            _ => {
                start_hash_from_beginning = false;
            }
        }

        if start_hash_from_beginning {
            while array_idx < self.array.len() {
                if !matches!(self.array[array_idx], Value::Nil) {
                    return Ok(Some((Value::Integer(array_idx as i64 + 1), self.array[array_idx].clone())));
                }
                array_idx += 1;
            }
            let mut iter = self.hash.iter();
            if let Some((k, v)) = iter.next() {
                return Ok(Some((k.0.clone(), v.clone())));
            }
            return Ok(None);
        }

        // Resume within the hash part after `key`.
        let mut found = false;
        for (k, v) in self.hash.iter() {
            if found {
                return Ok(Some((k.0.clone(), v.clone())));
            }
            if k.0 == key {
                found = true;
            }
        }
        if found {
            Ok(None)
        } else {
            Err("invalid key to 'next'")
        }
    }

    pub fn array_len(&self) -> usize {
        self.array.len()
    }

    pub fn array_iter(&self) -> impl Iterator<Item = (i64, &Value)> {
        self.array.iter().enumerate().map(|(i, v)| (i as i64 + 1, v))
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
