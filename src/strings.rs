// File: src/strings.rs
//
// String interning: every string with identical bytes is the same object,
// identified by its handle.

use crate::gc::Heap;
use crate::object::{LumenString, Obj, ObjHandle};
use ahash::AHashMap;

/// FNV-1a. The exact hash function is unobservable across runs — this one
/// is cheap and good enough to keep collisions rare.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// The string table: resolves byte content to a single canonical handle.
#[derive(Default)]
pub struct StringInterner {
    table: AHashMap<Box<str>, ObjHandle>,
}

impl StringInterner {
    pub fn new() -> Self {
        StringInterner { table: AHashMap::new() }
    }

    /// `findString`: looks up an existing interned copy by content without
    /// allocating.
    pub fn find(&self, text: &str) -> Option<ObjHandle> {
        self.table.get(text).copied()
    }

    /// Hashes `text`, looks it up, and either returns the existing handle or
    /// allocates a new copy of the bytes and interns it.
    pub fn copy_string(&mut self, heap: &mut Heap, text: &str) -> ObjHandle {
        if let Some(handle) = self.table.get(text) {
            return *handle;
        }
        let hash = fnv1a_hash(text.as_bytes());
        let boxed: Box<str> = text.into();
        let handle = heap.allocate(Obj::String(LumenString { chars: boxed.clone(), hash }));
        self.table.insert(boxed, handle);
        handle
    }

    /// If an interned copy already exists, the caller's owned buffer is
    /// simply dropped instead of being adopted; otherwise it is interned
    /// directly, with no extra copy.
    pub fn take_string(&mut self, heap: &mut Heap, owned: String) -> ObjHandle {
        if let Some(handle) = self.table.get(owned.as_str()) {
            return *handle;
        }
        let hash = fnv1a_hash(owned.as_bytes());
        let boxed: Box<str> = owned.into_boxed_str();
        let handle = heap.allocate(Obj::String(LumenString { chars: boxed.clone(), hash }));
        self.table.insert(boxed, handle);
        handle
    }

    /// All handles currently interned. The VM treats these as strong GC
    /// roots (see DESIGN.md for why).
    pub fn handles(&self) -> impl Iterator<Item = ObjHandle> + '_ {
        self.table.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_interns_to_the_same_handle() {
        let mut heap = Heap::new();
        let mut interner = StringInterner::new();
        let a = interner.copy_string(&mut heap, "hello");
        let b = interner.copy_string(&mut heap, "hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_interns_distinct_handles() {
        let mut heap = Heap::new();
        let mut interner = StringInterner::new();
        let a = interner.copy_string(&mut heap, "hello");
        let b = interner.copy_string(&mut heap, "world");
        assert_ne!(a, b);
    }

    #[test]
    fn take_string_reuses_existing_interned_copy() {
        let mut heap = Heap::new();
        let mut interner = StringInterner::new();
        let a = interner.copy_string(&mut heap, "shared");
        let b = interner.take_string(&mut heap, String::from("shared"));
        assert_eq!(a, b);
    }
}
