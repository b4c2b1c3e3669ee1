//! Handles bound to an engine
//!
//! `BoundHandle` pairs an [`ObjectHandle`] with the engine that knows its
//! type, so member access and the container protocol read as method calls.

use crate::engine::Engine;
use crate::handle::{ObjectHandle, OwningHandle};
use crate::ops::Operator;
use crate::param::IntoArgs;
use crate::ty::Type;

/// An object handle bound to an engine
#[derive(Clone, Copy)]
pub struct BoundHandle<'e> {
    engine: &'e Engine,
    handle: ObjectHandle,
}

impl<'e> BoundHandle<'e> {
    pub(crate) fn new(engine: &'e Engine, handle: ObjectHandle) -> Self {
        Self { engine, handle }
    }

    /// The bound handle
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    /// Declared type
    pub fn ty(&self) -> Type {
        self.handle.ty()
    }

    /// Check if the handle is null
    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// A field, bound to the same engine
    pub fn var(&self, field: &str) -> BoundHandle<'e> {
        Self::new(self.engine, self.engine.var(self.handle, field))
    }

    /// Invoke a method with handle arguments
    pub fn invoke(&self, method: &str, args: &[ObjectHandle]) -> OwningHandle {
        self.engine.invoke(self.handle, method, args)
    }

    /// Invoke a method with native arguments
    pub fn call(&self, method: &str, args: impl IntoArgs) -> OwningHandle {
        self.engine.call(self.handle, method, args)
    }

    /// Apply an operator; the bound object is the left operand
    pub fn op(&self, op: Operator, args: &[ObjectHandle]) -> OwningHandle {
        self.invoke(op.method_name(), args)
    }

    /// Static cast, bound to the same engine
    pub fn static_cast(&self, target: Type) -> BoundHandle<'e> {
        Self::new(self.engine, self.engine.static_cast(self.handle, target))
    }

    /// Dynamic cast, bound to the same engine
    pub fn dynamic_cast(&self, target: Type) -> BoundHandle<'e> {
        Self::new(self.engine, self.engine.dynamic_cast(self.handle, target))
    }

    // ------------------------------------------------------------------------
    // Container protocol
    // ------------------------------------------------------------------------

    /// Element count, for anything with a `size` operation
    pub fn size(&self) -> Option<usize> {
        self.call("size", ()).read::<usize>()
    }

    /// Check if the container is empty
    pub fn is_empty(&self) -> Option<bool> {
        self.call("empty", ()).read::<bool>()
    }

    /// Element at `index`; null when out of range
    pub fn at(&self, index: usize) -> ObjectHandle {
        self.call("at", (index,)).handle()
    }

    /// Append a copy of `value`
    pub fn push_back(&self, value: ObjectHandle) -> bool {
        self.invoke("push_back", &[value]).is_valid()
    }

    /// Look up a key; null when absent
    pub fn find(&self, key: ObjectHandle) -> ObjectHandle {
        self.invoke("find", &[key]).handle()
    }

    /// Check if a key or element is present
    pub fn contains(&self, key: ObjectHandle) -> bool {
        self.invoke("contains", &[key]).read::<bool>().unwrap_or(false)
    }

    /// Remove a key, or the element at an index for sequences
    pub fn erase(&self, key: ObjectHandle) -> bool {
        self.invoke("erase", &[key]).read::<bool>().unwrap_or(false)
    }

    /// Handles to every element, in iteration order
    pub fn iter(&self) -> Vec<ObjectHandle> {
        self.call("iter", ()).read::<Vec<ObjectHandle>>().unwrap_or_default()
    }
}

impl std::fmt::Debug for BoundHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoundHandle").field(&self.handle).finish()
    }
}
