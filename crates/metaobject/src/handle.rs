//! Object handles
//!
//! An [`ObjectHandle`] is a typed address with no ownership and no liveness
//! guarantee. An [`OwningHandle`] adds a reference-counted backing buffer;
//! the last clone to drop finalizes the value and returns the memory to the
//! resource it came from.
//!
//! The handle's type carries the value category used by overload
//! resolution:
//!
//! | constructor          | type          | category          |
//! |----------------------|---------------|-------------------|
//! | `from_value(&mut v)` | `T`           | temporary value   |
//! | `from_ref(&v)`       | `&{const{T}}` | read-only lvalue  |
//! | `from_mut(&mut v)`   | `&{T}`        | mutable lvalue    |
//! | `from_rvalue(&mut v)`| `&&{T}`       | movable           |

use std::alloc::Layout;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use crate::resource::ResourceRef;
use crate::ty::{type_of, Reflect, Type};

// ============================================================================
// ObjectHandle
// ============================================================================

/// A (type, address) pair
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    ty: Type,
    addr: *mut u8,
}

// SAFETY: a handle is a plain address; dereferencing it is what requires care,
// and every dereference is `unsafe`.
unsafe impl Send for ObjectHandle {}
unsafe impl Sync for ObjectHandle {}

impl ObjectHandle {
    /// The null handle
    pub const fn null() -> Self {
        Self {
            ty: Type::INVALID,
            addr: ptr::null_mut(),
        }
    }

    /// Build a handle from its parts
    pub const fn new(ty: Type, addr: *mut u8) -> Self {
        Self { ty, addr }
    }

    /// A temporary value
    pub fn from_value<T: Reflect>(value: &mut T) -> Self {
        Self::new(type_of::<T>(), value as *mut T as *mut u8)
    }

    /// A read-only lvalue
    pub fn from_ref<T: Reflect>(value: &T) -> Self {
        Self::new(
            type_of::<T>().add_const().add_lvalue_reference(),
            value as *const T as *mut u8,
        )
    }

    /// A mutable lvalue
    pub fn from_mut<T: Reflect>(value: &mut T) -> Self {
        Self::new(
            type_of::<T>().add_lvalue_reference(),
            value as *mut T as *mut u8,
        )
    }

    /// A value the callee may move from
    pub fn from_rvalue<T: Reflect>(value: &mut T) -> Self {
        Self::new(
            type_of::<T>().add_rvalue_reference(),
            value as *mut T as *mut u8,
        )
    }

    /// Declared type
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Address
    #[inline]
    pub fn addr(&self) -> *mut u8 {
        self.addr
    }

    /// Check if the address is null
    #[inline]
    pub fn is_null(&self) -> bool {
        self.addr.is_null()
    }

    /// Type with references and cv removed; the key into the type registry
    #[inline]
    pub fn object_type(&self) -> Type {
        self.ty.strip_cvref()
    }

    /// Check if the referenced object is read-only
    pub fn is_const(&self) -> bool {
        self.ty.remove_reference().is_const()
    }

    /// Same address, different declared type
    #[inline]
    pub fn with_type(self, ty: Type) -> Self {
        Self { ty, addr: self.addr }
    }

    /// Borrow the value
    ///
    /// Returns `None` for a null handle or a type mismatch.
    ///
    /// # Safety
    ///
    /// The address must point at a live `T` for the chosen lifetime.
    pub unsafe fn get<'a, T: Reflect>(&self) -> Option<&'a T> {
        if self.is_null() || self.object_type() != type_of::<T>() {
            return None;
        }
        Some(&*(self.addr as *const T))
    }

    /// Borrow the value mutably
    ///
    /// Also returns `None` when the handle is read-only.
    ///
    /// # Safety
    ///
    /// As for [`get`](Self::get), and no other reference to the value may be
    /// live.
    pub unsafe fn get_mut<'a, T: Reflect>(&self) -> Option<&'a mut T> {
        if self.is_null() || self.is_const() || self.object_type() != type_of::<T>() {
            return None;
        }
        Some(&mut *(self.addr as *mut T))
    }
}

macro_rules! handle_transforms {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        impl ObjectHandle {
            $(
                $(#[$meta])*
                pub fn $name(self) -> Self {
                    self.with_type(self.ty.$name())
                }
            )*
        }
    };
}

handle_transforms!(
    /// Address-preserving `add_const`
    add_const,
    /// Address-preserving `remove_const`
    remove_const,
    /// Address-preserving `add_lvalue_reference`
    add_lvalue_reference,
    /// Address-preserving `add_rvalue_reference`
    add_rvalue_reference,
    /// Address-preserving `remove_reference`
    remove_reference,
    /// Address-preserving `remove_cvref`
    remove_cvref,
    /// Address-preserving `add_const_lvalue_reference`
    add_const_lvalue_reference,
);

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({}, {:p})", self.ty, self.addr)
    }
}

impl Reflect for ObjectHandle {
    fn write_type_name(out: &mut String) {
        out.push_str(Type::OBJECT_HANDLE.name());
    }
}

// ============================================================================
// SharedBuffer
// ============================================================================

/// Runs on the value just before its memory is released
pub type Finalizer = Box<dyn FnOnce(*mut u8) + Send + Sync>;

/// Reference-counted backing allocation
pub struct SharedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    resource: ResourceRef,
    finalizer: Option<Finalizer>,
}

impl SharedBuffer {
    /// Take ownership of an initialized allocation
    ///
    /// # Safety
    ///
    /// `ptr` must come from `resource` with `layout`, and `finalizer` must be
    /// sound to run on it exactly once.
    pub unsafe fn from_raw(
        ptr: NonNull<u8>,
        layout: Layout,
        resource: ResourceRef,
        finalizer: Option<Finalizer>,
    ) -> Self {
        Self {
            ptr,
            layout,
            resource,
            finalizer,
        }
    }

    /// Move a value into memory from `resource`
    pub fn new<T: 'static>(value: T, resource: ResourceRef) -> Self {
        let layout = Layout::new::<T>();
        let ptr = resource.allocate(layout);
        unsafe { ptr.as_ptr().cast::<T>().write(value) };
        Self {
            ptr,
            layout,
            resource,
            finalizer: drop_finalizer::<T>(),
        }
    }

    /// Address of the value
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Layout of the allocation
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl Drop for SharedBuffer {
    fn drop(&mut self) {
        if let Some(finalize) = self.finalizer.take() {
            finalize(self.ptr.as_ptr());
        }
        unsafe { self.resource.deallocate(self.ptr, self.layout) };
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("ptr", &self.ptr)
            .field("size", &self.layout.size())
            .finish()
    }
}

/// Finalizer running `T`'s drop glue, if it has any
pub fn drop_finalizer<T: 'static>() -> Option<Finalizer> {
    if std::mem::needs_drop::<T>() {
        Some(Box::new(|p: *mut u8| unsafe {
            ptr::drop_in_place(p.cast::<T>())
        }))
    } else {
        None
    }
}

// ============================================================================
// OwningHandle
// ============================================================================

/// An object handle that may keep its value alive
///
/// Three shapes:
/// - invalid (`Type::INVALID`): the "not invocable" result
/// - borrowed (no buffer): a void result, or a handle returned by a method
/// - owned: the last clone releases the buffer
#[derive(Clone, Default)]
pub struct OwningHandle {
    handle: ObjectHandle,
    buffer: Option<Arc<SharedBuffer>>,
}

impl OwningHandle {
    /// The invalid handle
    pub fn invalid() -> Self {
        Self::default()
    }

    /// A void result
    pub fn void() -> Self {
        Self::borrowed(ObjectHandle::new(Type::VOID, ptr::null_mut()))
    }

    /// Wrap a handle without taking ownership
    pub fn borrowed(handle: ObjectHandle) -> Self {
        Self {
            handle,
            buffer: None,
        }
    }

    /// Own a buffer holding a value of type `ty`
    pub fn from_buffer(ty: Type, buffer: SharedBuffer) -> Self {
        Self {
            handle: ObjectHandle::new(ty, buffer.as_ptr()),
            buffer: Some(Arc::new(buffer)),
        }
    }

    /// Move a value into memory from `resource`
    pub fn from_value<T: Reflect>(value: T, resource: ResourceRef) -> Self {
        Self::from_buffer(type_of::<T>(), SharedBuffer::new(value, resource))
    }

    /// Check if this is a real result (not the "not invocable" sentinel)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.handle.ty().is_valid()
    }

    /// Check if this is a void result
    pub fn is_void(&self) -> bool {
        self.handle.ty() == Type::VOID
    }

    /// Check if this handle owns its buffer
    pub fn is_owning(&self) -> bool {
        self.buffer.is_some()
    }

    /// Number of owners of the buffer (0 when borrowed)
    pub fn use_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, Arc::strong_count)
    }

    /// The non-owning view
    #[inline]
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    /// Declared type
    #[inline]
    pub fn ty(&self) -> Type {
        self.handle.ty()
    }

    /// Address
    #[inline]
    pub fn addr(&self) -> *mut u8 {
        self.handle.addr()
    }

    /// Borrow an owned value
    ///
    /// Borrowed handles return `None`; reach them through [`handle`](Self::handle).
    pub fn value<T: Reflect>(&self) -> Option<&T> {
        self.buffer.as_ref()?;
        // SAFETY: the buffer is alive as long as `self` and holds the value.
        unsafe { self.handle.get::<T>() }
    }

    /// Clone an owned value out
    pub fn read<T: Reflect + Clone>(&self) -> Option<T> {
        self.value::<T>().cloned()
    }
}

impl fmt::Debug for OwningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwningHandle")
            .field("handle", &self.handle)
            .field("owners", &self.use_count())
            .finish()
    }
}
