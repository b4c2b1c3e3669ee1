//! Field descriptors
//!
//! A field descriptor is a rule for locating a field's storage given the
//! owning object's address. Five storage modes:
//!
//! - `Offset`: `base + offset`, an ordinary member
//! - `Adjusted`: `adjust(base)`, a member reached through a computed path
//! - `External`: a fixed address, a true static
//! - `Shared`: a reference-counted buffer owned by the descriptor
//! - `Inline`: a small slot inside the descriptor itself
//!
//! The last three ignore the base address, which is how values get attached
//! to types that do not natively have them.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::{align_of, size_of, MaybeUninit};
use std::ptr;
use std::sync::Arc;

use crate::attr::AttrSet;
use crate::handle::{drop_finalizer, Finalizer, SharedBuffer};
use crate::resource::SystemResource;
use crate::ty::{type_of, Reflect, Type};

/// Address adjuster for computed members
pub type Adjuster = Arc<dyn Fn(*mut u8) -> *mut u8 + Send + Sync>;

/// Words in an inline slot
pub const INLINE_WORDS: usize = 4;

/// Largest value an inline slot can hold
pub const INLINE_CAPACITY: usize = INLINE_WORDS * size_of::<usize>();

/// Storage mode tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Fixed offset from the owner
    Offset,
    /// Computed from the owner's address
    Adjusted,
    /// Fixed address
    External,
    /// Reference-counted buffer
    Shared,
    /// Inline slot
    Inline,
}

/// Shared buffer holding a `Send + Sync` value
#[derive(Debug, Clone)]
pub struct SharedSlot(Arc<SharedBuffer>);

// SAFETY: only built from `Send + Sync` values in `FieldDescriptor::shared`.
unsafe impl Send for SharedSlot {}
unsafe impl Sync for SharedSlot {}

/// Inline storage for a small value
pub struct InlineSlot {
    words: UnsafeCell<[MaybeUninit<usize>; INLINE_WORDS]>,
    finalizer: Option<Finalizer>,
}

// SAFETY: only built from `Send + Sync` values in `FieldDescriptor::inline`.
unsafe impl Send for InlineSlot {}
unsafe impl Sync for InlineSlot {}

impl InlineSlot {
    fn as_ptr(&self) -> *mut u8 {
        self.words.get().cast::<u8>()
    }
}

impl Drop for InlineSlot {
    fn drop(&mut self) {
        if let Some(finalize) = self.finalizer.take() {
            finalize(self.as_ptr());
        }
    }
}

#[derive(Clone, Copy)]
struct FixedAddr(*mut u8);

// SAFETY: external addresses are statics or caller-guaranteed shareable.
unsafe impl Send for FixedAddr {}
unsafe impl Sync for FixedAddr {}

enum Storage {
    Offset(usize),
    Adjusted(Adjuster),
    External(FixedAddr),
    Shared(SharedSlot),
    Inline(Box<InlineSlot>),
}

/// Field type plus storage rule
pub struct FieldDescriptor {
    ty: Type,
    storage: Storage,
}

impl FieldDescriptor {
    /// A member at a fixed offset
    ///
    /// # Safety
    ///
    /// For every live owner, `base + offset` must address a live `F`.
    pub unsafe fn offset<F: Reflect>(offset: usize) -> Self {
        Self {
            ty: type_of::<F>(),
            storage: Storage::Offset(offset),
        }
    }

    /// Backs [`field_of!`]; the projection only pins the field type
    ///
    /// # Safety
    ///
    /// `offset` must be the offset of the field `_project` returns.
    #[doc(hidden)]
    pub unsafe fn __projected<O, F: Reflect>(offset: usize, _project: fn(&O) -> &F) -> Self {
        Self::offset::<F>(offset)
    }

    /// A member located by a function of the owner's address
    ///
    /// The adjuster is never called with a null address.
    ///
    /// # Safety
    ///
    /// `adjust` must map a live owner's address to a live `F`.
    pub unsafe fn adjusted<F: Reflect>(
        adjust: impl Fn(*mut u8) -> *mut u8 + Send + Sync + 'static,
    ) -> Self {
        Self {
            ty: type_of::<F>(),
            storage: Storage::Adjusted(Arc::new(adjust)),
        }
    }

    /// A read-only static
    pub fn external<F: Reflect + Sync>(value: &'static F) -> Self {
        Self {
            ty: type_of::<F>().add_const(),
            storage: Storage::External(FixedAddr(value as *const F as *mut u8)),
        }
    }

    /// A mutable value at a fixed address
    ///
    /// # Safety
    ///
    /// `addr` must stay valid for as long as the descriptor is registered, and
    /// concurrent access through it must be externally synchronized.
    pub unsafe fn external_mut<F: Reflect>(addr: *mut F) -> Self {
        Self {
            ty: type_of::<F>(),
            storage: Storage::External(FixedAddr(addr.cast())),
        }
    }

    /// A value in a reference-counted buffer owned by the descriptor
    pub fn shared<F: Reflect + Send + Sync>(value: F) -> Self {
        let buffer = SharedBuffer::new(value, Arc::new(SystemResource));
        Self {
            ty: type_of::<F>(),
            storage: Storage::Shared(SharedSlot(Arc::new(buffer))),
        }
    }

    /// A value in the descriptor's inline slot
    ///
    /// Gives the value back if it does not fit (larger than
    /// [`INLINE_CAPACITY`] or more aligned than a machine word).
    pub fn inline<F: Reflect + Send + Sync>(value: F) -> Result<Self, F> {
        if !fits_inline::<F>() {
            return Err(value);
        }
        let slot = Box::new(InlineSlot {
            words: UnsafeCell::new([MaybeUninit::uninit(); INLINE_WORDS]),
            finalizer: drop_finalizer::<F>(),
        });
        // SAFETY: size and alignment checked above; the slot is boxed so the
        // address handed out by `resolve` never moves.
        unsafe { ptr::write(slot.as_ptr().cast::<F>(), value) };
        Ok(Self {
            ty: type_of::<F>(),
            storage: Storage::Inline(slot),
        })
    }

    /// A dynamically attached value: inline when it fits, shared otherwise
    pub fn dynamic<F: Reflect + Send + Sync>(value: F) -> Self {
        match Self::inline(value) {
            Ok(desc) => desc,
            Err(value) => Self::shared(value),
        }
    }

    /// Share another descriptor's buffer (a second view of the same value)
    pub fn share(&self) -> Option<Self> {
        match &self.storage {
            Storage::Shared(slot) => Some(Self {
                ty: self.ty,
                storage: Storage::Shared(slot.clone()),
            }),
            _ => None,
        }
    }

    /// Declared field type
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Storage mode
    pub fn mode(&self) -> FieldMode {
        match self.storage {
            Storage::Offset(_) => FieldMode::Offset,
            Storage::Adjusted(_) => FieldMode::Adjusted,
            Storage::External(_) => FieldMode::External,
            Storage::Shared(_) => FieldMode::Shared,
            Storage::Inline(_) => FieldMode::Inline,
        }
    }

    /// Check if the address is independent of the owning object
    pub fn is_static(&self) -> bool {
        matches!(
            self.mode(),
            FieldMode::External | FieldMode::Shared | FieldMode::Inline
        )
    }

    /// Check if the descriptor owns its value
    pub fn is_owned(&self) -> bool {
        matches!(self.mode(), FieldMode::Shared | FieldMode::Inline)
    }

    /// Locate the field for an owner at `base`
    ///
    /// Instance-bound modes return null for a null base.
    pub fn resolve(&self, base: *mut u8) -> *mut u8 {
        match &self.storage {
            Storage::Offset(offset) if !base.is_null() => base.wrapping_add(*offset),
            Storage::Adjusted(adjust) if !base.is_null() => adjust(base),
            Storage::Offset(_) | Storage::Adjusted(_) => ptr::null_mut(),
            Storage::External(addr) => addr.0,
            Storage::Shared(slot) => slot.0.as_ptr(),
            Storage::Inline(slot) => slot.as_ptr(),
        }
    }
}

fn fits_inline<F>() -> bool {
    size_of::<F>() <= INLINE_CAPACITY && align_of::<F>() <= align_of::<usize>()
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("ty", &self.ty)
            .field("mode", &self.mode())
            .finish()
    }
}

/// Build an offset field descriptor with the field type inferred
///
/// ```ignore
/// builder.field("x", field_of!(Point, x))?;
/// ```
#[macro_export]
macro_rules! field_of {
    ($owner:ty, $field:ident) => {
        // SAFETY: `offset_of!` names the same field the projection reads.
        unsafe {
            $crate::FieldDescriptor::__projected::<$owner, _>(
                ::core::mem::offset_of!($owner, $field),
                |owner| &owner.$field,
            )
        }
    };
}

/// A registered field
#[derive(Debug)]
pub struct FieldInfo {
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) attrs: AttrSet,
}

impl FieldInfo {
    /// Wrap a descriptor with an empty attribute set
    pub fn new(descriptor: FieldDescriptor) -> Self {
        Self {
            descriptor,
            attrs: AttrSet::new(),
        }
    }

    /// Descriptor
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Attributes
    pub fn attrs(&self) -> &AttrSet {
        &self.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectHandle;

    #[repr(C)]
    struct Point {
        x: i32,
        y: f64,
    }
    crate::reflect_type!(Point);

    static LIMIT: u32 = 99;

    #[test]
    fn test_offset_mode() {
        let mut p = Point { x: 3, y: 4.5 };
        let x = crate::field_of!(Point, x);
        let y = crate::field_of!(Point, y);
        assert_eq!(x.ty(), type_of::<i32>());
        assert_eq!(y.ty(), type_of::<f64>());
        assert_eq!(x.mode(), FieldMode::Offset);

        let base = &mut p as *mut Point as *mut u8;
        unsafe {
            assert_eq!(*(x.resolve(base) as *const i32), 3);
            assert_eq!(*(y.resolve(base) as *const f64), 4.5);
        }
        assert!(x.resolve(ptr::null_mut()).is_null());
    }

    #[test]
    fn test_projected_matches_offset_of() {
        let mut p = Point { x: 1, y: 2.5 };
        // SAFETY: the offset is taken from the projected field.
        let y = unsafe {
            FieldDescriptor::__projected::<Point, f64>(std::mem::offset_of!(Point, y), |p| &p.y)
        };
        let base = &mut p as *mut Point as *mut u8;
        assert_eq!(y.resolve(base), ptr::addr_of_mut!(p.y).cast());
    }

    #[test]
    fn test_adjusted_mode() {
        let mut p = Point { x: 1, y: 2.0 };
        let y = unsafe {
            FieldDescriptor::adjusted::<f64>(|base| {
                let p = base as *mut Point;
                ptr::addr_of_mut!((*p).y).cast()
            })
        };
        let addr = y.resolve(&mut p as *mut Point as *mut u8);
        unsafe { *(addr as *mut f64) = 8.0 };
        assert_eq!(p.y, 8.0);
    }

    #[test]
    fn test_external_mode_is_const() {
        let field = FieldDescriptor::external(&LIMIT);
        assert_eq!(field.ty().name(), "const{u32}");
        assert!(field.is_static());
        let h = ObjectHandle::new(field.ty(), field.resolve(ptr::null_mut()));
        assert_eq!(unsafe { h.get::<u32>() }, Some(&99));
    }

    #[test]
    fn test_dynamic_picks_storage() {
        let small = FieldDescriptor::dynamic(7u64);
        assert_eq!(small.mode(), FieldMode::Inline);
        let large = FieldDescriptor::dynamic([0u64; 8]);
        assert_eq!(large.mode(), FieldMode::Shared);

        let a = small.resolve(ptr::null_mut());
        let b = small.resolve(0x1000 as *mut u8);
        assert_eq!(a, b);
        assert_eq!(unsafe { *(a as *const u64) }, 7);
    }

    #[test]
    fn test_shared_views_alias() {
        let a = FieldDescriptor::shared(String::from("shared"));
        let b = a.share().unwrap();
        assert_eq!(a.resolve(ptr::null_mut()), b.resolve(ptr::null_mut()));
        drop(a);
        let s = unsafe { &*(b.resolve(ptr::null_mut()) as *const String) };
        assert_eq!(s, "shared");
        assert!(FieldDescriptor::dynamic(1u8).share().is_none());
    }
}
