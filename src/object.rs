// File: src/object.rs
//
// Heap object variants: the payloads every Lumen object carries,
// sharing a common header (mark bit, allocation slot) that lives on the
// arena in `gc.rs`.

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;

/// A handle into the VM's object arena (`crate::gc::Heap`). Two handles
/// compare equal iff they name the same allocation — reference identity,
/// which matters for strings, where identity is meaningful only because
/// every string is interned before a handle is ever produced for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle(pub(crate) u32);

impl ObjHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub fn for_test(n: u32) -> Self {
        ObjHandle(n)
    }
}

/// An interned string: its bytes and a hash computed once at construction.
#[derive(Debug, Clone)]
pub struct LumenString {
    pub chars: Box<str>,
    pub hash: u32,
}

/// A compiled function: its arity, how many upvalues its closures capture,
/// an optional name (absent for the top-level script), and its chunk.
#[derive(Debug, Clone)]
pub struct ObjFunction {
    pub arity: u8,
    pub upvalue_count: usize,
    pub name: Option<ObjHandle>,
    pub chunk: Chunk,
}

/// A host-implemented function: `(argCount, *args) -> Value`. Natives run
/// outside any frame and may not themselves trigger a collection.
pub type NativeFn = fn(&mut crate::vm::Vm, &[Value]) -> Result<Value, String>;

#[derive(Clone, Copy)]
pub struct ObjNative {
    pub name: &'static str,
    pub function: NativeFn,
}

impl std::fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjNative").field("name", &self.name).finish()
    }
}

/// A closure: a function paired with the upvalues it captured at creation
/// time. `upvalues.len() == function's upvalue_count` always.
#[derive(Debug, Clone)]
pub struct ObjClosure {
    pub function: ObjHandle,
    pub upvalues: Vec<ObjHandle>,
}

/// An upvalue cell: *open* while it still aliases a live stack slot,
/// *closed* once that slot has gone out of scope and its value was hoisted
/// into the cell itself.
#[derive(Debug, Clone)]
pub enum ObjUpvalue {
    Open(usize),
    Closed(Value),
}

#[derive(Debug, Clone)]
pub struct ObjClass {
    pub name: ObjHandle,
    pub methods: Table,
}

#[derive(Debug, Clone)]
pub struct ObjInstance {
    pub class: ObjHandle,
    pub fields: Table,
}

/// A closure paired with its receiver, produced when a method is accessed
/// (not called) via `.`.
#[derive(Debug, Clone)]
pub struct ObjBoundMethod {
    pub receiver: Value,
    pub method: ObjHandle,
}

/// The tagged heap object stored behind every [`ObjHandle`].
#[derive(Debug, Clone)]
pub enum Obj {
    String(LumenString),
    Function(ObjFunction),
    Native(ObjNative),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Class(ObjClass),
    Instance(ObjInstance),
    BoundMethod(ObjBoundMethod),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(_) => "string",
            Obj::Function(_) => "function",
            Obj::Native(_) => "native fn",
            Obj::Closure(_) => "closure",
            Obj::Upvalue(_) => "upvalue",
            Obj::Class(_) => "class",
            Obj::Instance(_) => "instance",
            Obj::BoundMethod(_) => "bound method",
        }
    }

    /// A rough byte cost used to drive the GC's allocation watermark.
    /// Exactness doesn't matter, only that it scales with real memory use.
    pub fn approx_size(&self) -> usize {
        let base = std::mem::size_of::<Obj>();
        base + match self {
            Obj::String(s) => s.chars.len(),
            Obj::Function(f) => f.chunk.code.len() + f.chunk.constants.len() * 16,
            Obj::Closure(c) => c.upvalues.len() * 8,
            Obj::Class(c) => c.methods.len() * 24,
            Obj::Instance(i) => i.fields.len() * 24,
            _ => 0,
        }
    }
}
