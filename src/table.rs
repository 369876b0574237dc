// File: src/table.rs
//
// The hash table component: a map from an interned string handle to a
// Value, used for globals, instance fields, and class method tables.
//
// Only the operations (get/set/delete/add_all/iteration) matter here, not
// the probing scheme, so this is backed by `ahash` instead of hand-rolling
// open addressing. Because keys are always already-interned string
// handles, "compare keys by identity" falls out for free: handle equality
// *is* identity equality.

use crate::object::ObjHandle;
use crate::value::Value;
use ahash::AHashMap;

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: AHashMap<ObjHandle, Value>,
}

impl Table {
    pub fn new() -> Self {
        Table { entries: AHashMap::new() }
    }

    pub fn get(&self, key: ObjHandle) -> Option<Value> {
        self.entries.get(&key).copied()
    }

    /// Returns `true` if `key` was not already present.
    pub fn set(&mut self, key: ObjHandle, value: Value) -> bool {
        self.entries.insert(key, value).is_none()
    }

    /// Returns `true` if an entry was removed.
    pub fn delete(&mut self, key: ObjHandle) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Copies every entry of `self` into `dst`, overwriting on conflict.
    /// Used by `OP_INHERIT` to snapshot a superclass's methods.
    pub fn add_all(&self, dst: &mut Table) {
        for (&k, &v) in self.entries.iter() {
            dst.entries.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjHandle, Value)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjHandle;

    fn h(n: u32) -> ObjHandle {
        ObjHandle::for_test(n)
    }

    #[test]
    fn set_reports_new_insertion() {
        let mut t = Table::new();
        assert!(t.set(h(1), Value::Number(1.0)));
        assert!(!t.set(h(1), Value::Number(2.0)));
        assert_eq!(t.get(h(1)), Some(Value::Number(2.0)));
    }

    #[test]
    fn delete_then_reinsert_preserves_lookups() {
        let mut t = Table::new();
        t.set(h(1), Value::Nil);
        t.set(h(2), Value::Bool(true));
        assert!(t.delete(h(1)));
        assert!(!t.delete(h(1)));
        assert_eq!(t.get(h(2)), Some(Value::Bool(true)));
    }

    #[test]
    fn add_all_copies_every_entry() {
        let mut src = Table::new();
        src.set(h(1), Value::Number(1.0));
        src.set(h(2), Value::Number(2.0));
        let mut dst = Table::new();
        dst.set(h(2), Value::Number(99.0));
        src.add_all(&mut dst);
        assert_eq!(dst.get(h(1)), Some(Value::Number(1.0)));
        assert_eq!(dst.get(h(2)), Some(Value::Number(2.0)));
    }
}
