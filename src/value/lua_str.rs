use std::rc::Rc;

/// An immutable Lua string: a byte sequence, not necessarily valid UTF-8
/// (spec.md §3: "`#s` and byte-level functions operate on bytes"). Backed by
/// the interning table in [`crate::gc`].
#[derive(Clone)]
pub struct LuaStr(Rc<[u8]>);

impl LuaStr {
    pub fn new(bytes: &[u8]) -> Self {
        LuaStr(crate::gc::intern(bytes))
    }

    pub fn from_rc(rc: Rc<[u8]>) -> Self {
        LuaStr(rc)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret as UTF-8 where a caller needs text (the `utf8` library,
    /// error messages); lossy so a malformed byte string never panics.
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl std::ops::Deref for LuaStr {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl std::hash::Hash for LuaStr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialEq for LuaStr {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for LuaStr {}

impl std::fmt::Debug for LuaStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}
