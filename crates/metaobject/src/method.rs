//! Method descriptors
//!
//! Every callable is erased to one shape, `(receiver, result_slot, args)`.
//! The descriptor carries what dispatch needs to pick among overloads: the
//! invocation flag, the parameter types and how to lay out the result.

use std::alloc::Layout;
use std::any::TypeId as NativeTypeId;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::attr::AttrSet;
use crate::handle::ObjectHandle;
use crate::ty::{type_of, Reflect, Type};

/// Erased callable: `(receiver, result_slot, args)`
///
/// `receiver` is null for static methods. `result_slot` points at memory laid
/// out for the descriptor's result.
pub type Invoker = Arc<dyn Fn(*mut u8, *mut u8, &[ObjectHandle]) + Send + Sync>;

/// Parameter list storage
pub type Params = SmallVec<[Type; 4]>;

/// How a method may be invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodFlag {
    /// Needs a mutable receiver
    Variable,
    /// Works on a read-only receiver
    Const,
    /// No receiver
    Static,
}

/// What the invoker writes into the result slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Nothing
    Void,
    /// A value to be owned by the caller
    Value,
    /// An `ObjectHandle` the caller receives as a borrowed result
    Handle,
}

/// Result layout and finalization
#[derive(Clone, Copy)]
pub struct ResultSpec {
    ty: Type,
    layout: Layout,
    drop: Option<unsafe fn(*mut u8)>,
    kind: ResultKind,
}

unsafe fn drop_shim<T>(p: *mut u8) {
    std::ptr::drop_in_place(p.cast::<T>());
}

impl ResultSpec {
    /// Result spec for a native return type
    pub fn of<R: Reflect>() -> Self {
        let id = NativeTypeId::of::<R>();
        let kind = if id == NativeTypeId::of::<()>() {
            ResultKind::Void
        } else if id == NativeTypeId::of::<ObjectHandle>() {
            ResultKind::Handle
        } else {
            ResultKind::Value
        };
        Self {
            ty: type_of::<R>(),
            layout: Layout::new::<R>(),
            drop: std::mem::needs_drop::<R>().then_some(drop_shim::<R> as unsafe fn(*mut u8)),
            kind,
        }
    }

    /// Void result
    pub fn void() -> Self {
        Self::of::<()>()
    }

    /// Declared result type
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Slot layout
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Drop glue for the slot contents
    #[inline]
    pub fn drop_fn(&self) -> Option<unsafe fn(*mut u8)> {
        self.drop
    }

    /// Result kind
    #[inline]
    pub fn kind(&self) -> ResultKind {
        self.kind
    }
}

impl fmt::Debug for ResultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSpec")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Erased callable plus dispatch metadata
#[derive(Clone)]
pub struct MethodDescriptor {
    flag: MethodFlag,
    result: ResultSpec,
    params: Params,
    invoker: Invoker,
}

impl MethodDescriptor {
    /// Build a descriptor from an erased invoker
    ///
    /// # Safety
    ///
    /// The invoker must read its arguments as `params` describe, treat the
    /// receiver as `flag` describes, and write exactly one value laid out by
    /// `result` into the slot.
    pub unsafe fn from_raw(
        flag: MethodFlag,
        result: ResultSpec,
        params: impl IntoIterator<Item = Type>,
        invoker: Invoker,
    ) -> Self {
        Self {
            flag,
            result,
            params: params.into_iter().collect(),
            invoker,
        }
    }

    /// Declare a more precise result type
    ///
    /// For handle results this is the type callers see, e.g. `&{T}` for a
    /// method returning a handle to one of the receiver's elements.
    pub fn with_result_type(mut self, ty: Type) -> Self {
        self.result.ty = ty;
        self
    }

    /// Invocation flag
    #[inline]
    pub fn flag(&self) -> MethodFlag {
        self.flag
    }

    /// Result description
    #[inline]
    pub fn result(&self) -> &ResultSpec {
        &self.result
    }

    /// Declared result type
    #[inline]
    pub fn result_type(&self) -> Type {
        self.result.ty
    }

    /// Parameter types in order
    #[inline]
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Number of parameters
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check if an argument list fits positionally
    ///
    /// Each argument must equal its parameter, or the parameter must be the
    /// wildcard object-handle type.
    pub fn is_match(&self, args: &[Type]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(p, a)| p == a || p.is_object_handle())
    }

    /// Check if two descriptors can coexist under one name
    pub fn is_distinguishable_with(&self, other: &MethodDescriptor) -> bool {
        self.flag != other.flag || self.params != other.params
    }

    /// Run the invoker
    ///
    /// # Safety
    ///
    /// `receiver` must be a live object compatible with the declaring type
    /// (or null for static methods), `slot` must be laid out for the result,
    /// and every argument must be compatible with its parameter.
    pub unsafe fn call(&self, receiver: *mut u8, slot: *mut u8, args: &[ObjectHandle]) {
        assert_eq!(
            args.len(),
            self.params.len(),
            "argument count does not match the method's arity"
        );
        (self.invoker)(receiver, slot, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("flag", &self.flag)
            .field("params", &self.params)
            .field("result", &self.result.ty)
            .finish()
    }
}

/// A registered method overload
#[derive(Debug)]
pub struct MethodInfo {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) attrs: AttrSet,
}

impl MethodInfo {
    /// Wrap a descriptor with an empty attribute set
    pub fn new(descriptor: MethodDescriptor) -> Self {
        Self {
            descriptor,
            attrs: AttrSet::new(),
        }
    }

    /// Descriptor
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Attributes
    pub fn attrs(&self) -> &AttrSet {
        &self.attrs
    }
}
