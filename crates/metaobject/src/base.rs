//! Inheritance edges
//!
//! A `BaseEdge` records how to get from a derived object's address to its
//! base subobject and back. Which adjustments exist depends on the edge kind:
//!
//! | kind                        | down | up  | dynamic |
//! |-----------------------------|------|-----|---------|
//! | non-virtual, non-polymorphic| yes  | yes | no      |
//! | non-virtual, polymorphic    | yes  | yes | yes     |
//! | virtual, non-polymorphic    | yes  | no  | no      |
//! | virtual, polymorphic        | yes  | no  | yes     |
//!
//! A virtual (shared) base has no fixed offset from the derived object, so
//! only runtime type discovery can go back up from it.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::handle::ObjectHandle;
use crate::ty::{type_of, Reflect, Type};

/// Address adjustment across an edge
pub type Adjust = Arc<dyn Fn(*mut u8) -> *mut u8 + Send + Sync>;

/// Finds the complete object containing a base subobject
pub type Locate = Arc<dyn Fn(*mut u8) -> ObjectHandle + Send + Sync>;

// ============================================================================
// Runtime type discovery
// ============================================================================

/// Dynamic type record embedded in polymorphic objects
///
/// Every base subobject of a polymorphic object carries one, set by the
/// complete object's constructor: the complete object's type and how far the
/// subobject sits from the complete object's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TypeHeader {
    dynamic_type: Type,
    offset_to_top: usize,
}

impl TypeHeader {
    /// Header for a complete object of type `T` (offset 0)
    pub fn new<T: Reflect>() -> Self {
        Self::at::<T>(0)
    }

    /// Header for a subobject `offset_to_top` bytes into a complete `T`
    pub fn at<T: Reflect>(offset_to_top: usize) -> Self {
        Self {
            dynamic_type: type_of::<T>(),
            offset_to_top,
        }
    }

    /// Type of the complete object
    pub fn dynamic_type(&self) -> Type {
        self.dynamic_type
    }

    /// Distance from the complete object's start
    pub fn offset_to_top(&self) -> usize {
        self.offset_to_top
    }
}

/// A type whose instances can report their dynamic type
pub trait Polymorphic: Reflect {
    /// The header describing the complete object
    fn type_header(&self) -> &TypeHeader;
}

/// Complete-object locator for a polymorphic `T`
pub fn locator<T: Polymorphic>() -> Locate {
    Arc::new(|addr: *mut u8| {
        if addr.is_null() {
            return ObjectHandle::null();
        }
        // SAFETY: the caller hands in the address of a live `T`.
        let header = unsafe { (*addr.cast::<T>()).type_header() };
        ObjectHandle::new(
            header.dynamic_type,
            addr.wrapping_sub(header.offset_to_top),
        )
    })
}

// ============================================================================
// BaseEdge
// ============================================================================

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Fixed offset, no runtime type
    NonVirtualNonPolymorphic,
    /// Fixed offset, runtime type available
    NonVirtualPolymorphic,
    /// Shared base, no runtime type
    VirtualNonPolymorphic,
    /// Shared base, runtime type available
    VirtualPolymorphic,
}

impl EdgeKind {
    fn new(is_virtual: bool, polymorphic: bool) -> Self {
        match (is_virtual, polymorphic) {
            (false, false) => EdgeKind::NonVirtualNonPolymorphic,
            (false, true) => EdgeKind::NonVirtualPolymorphic,
            (true, false) => EdgeKind::VirtualNonPolymorphic,
            (true, true) => EdgeKind::VirtualPolymorphic,
        }
    }

    /// Check if the base is shared
    pub fn is_virtual(self) -> bool {
        matches!(
            self,
            EdgeKind::VirtualNonPolymorphic | EdgeKind::VirtualPolymorphic
        )
    }

    /// Check if runtime type discovery is available
    pub fn is_polymorphic(self) -> bool {
        matches!(
            self,
            EdgeKind::NonVirtualPolymorphic | EdgeKind::VirtualPolymorphic
        )
    }
}

/// Derived to base reachability
#[derive(Clone)]
pub struct BaseEdge {
    kind: EdgeKind,
    down: Adjust,
    up: Option<Adjust>,
    dynamic: Option<Locate>,
}

impl BaseEdge {
    /// Build an edge from raw adjustments
    ///
    /// # Safety
    ///
    /// `down` must map a live derived object to its base subobject, `up` must
    /// invert it, and `dynamic` must locate the complete object of a base
    /// subobject.
    pub unsafe fn from_raw(
        is_virtual: bool,
        down: Adjust,
        up: Option<Adjust>,
        dynamic: Option<Locate>,
    ) -> Self {
        let up = if is_virtual { None } else { up };
        Self {
            kind: EdgeKind::new(is_virtual, dynamic.is_some()),
            down,
            up,
            dynamic,
        }
    }

    /// A base embedded at a fixed offset
    ///
    /// # Safety
    ///
    /// `offset` must be the base subobject's offset in every derived object.
    pub unsafe fn embedded(offset: usize) -> Self {
        Self::from_raw(
            false,
            Arc::new(move |p: *mut u8| if p.is_null() { p } else { p.wrapping_add(offset) }),
            Some(Arc::new(move |p: *mut u8| {
                if p.is_null() {
                    p
                } else {
                    p.wrapping_sub(offset)
                }
            })),
            None,
        )
    }

    /// Backs [`base_of!`]
    ///
    /// # Safety
    ///
    /// `offset` must be the offset of the member `_project` returns.
    #[doc(hidden)]
    pub unsafe fn __embedded<D, B>(offset: usize, _project: fn(&D) -> &B) -> Self {
        Self::embedded(offset)
    }

    /// # Safety
    ///
    /// As [`__embedded`](Self::__embedded).
    #[doc(hidden)]
    pub unsafe fn __embedded_polymorphic<D, B: Polymorphic>(
        offset: usize,
        _project: fn(&D) -> &B,
    ) -> Self {
        Self::__embedded(offset, _project).with_locator(locator::<B>())
    }

    /// A shared base reached through a projection
    ///
    /// The projection may follow any path (a pointer, a stored offset), which
    /// is why the edge has no way back up.
    pub fn shared<D: Reflect, B: Reflect>(project: fn(&D) -> &B) -> Self {
        let down: Adjust = Arc::new(move |p: *mut u8| {
            if p.is_null() {
                return p;
            }
            // SAFETY: down adjustments are only applied to live `D`s.
            let base = project(unsafe { &*p.cast::<D>() });
            base as *const B as *mut u8
        });
        Self {
            kind: EdgeKind::VirtualNonPolymorphic,
            down,
            up: None,
            dynamic: None,
        }
    }

    /// A shared polymorphic base reached through a projection
    pub fn shared_polymorphic<D: Reflect, B: Polymorphic>(project: fn(&D) -> &B) -> Self {
        Self::shared(project).with_locator(locator::<B>())
    }

    fn with_locator(mut self, locate: Locate) -> Self {
        self.kind = EdgeKind::new(self.kind.is_virtual(), true);
        self.dynamic = Some(locate);
        self
    }

    /// Edge kind
    #[inline]
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Derived address to base address
    pub fn down(&self, derived: *mut u8) -> *mut u8 {
        (self.down)(derived)
    }

    /// Base address to derived address, for non-virtual edges
    pub fn up(&self, base: *mut u8) -> Option<*mut u8> {
        self.up.as_ref().map(|up| up(base))
    }

    /// Complete object of a base subobject, for polymorphic edges
    pub fn locate(&self, base: *mut u8) -> Option<ObjectHandle> {
        self.dynamic.as_ref().map(|locate| locate(base))
    }

    /// Base address to `derived` address, verified against the dynamic type
    ///
    /// Null when the edge is not polymorphic or the object's dynamic type is
    /// not exactly `derived`. An edge knows nothing of types further down;
    /// when the complete object may be more derived, use
    /// `Engine::dynamic_cast`, which walks the registry from the complete
    /// object.
    pub fn dynamic_down(&self, derived: Type, base: *mut u8) -> *mut u8 {
        match self.locate(base) {
            Some(complete) if complete.ty() == derived => complete.addr(),
            _ => ptr::null_mut(),
        }
    }

    pub(crate) fn locator(&self) -> Option<&Locate> {
        self.dynamic.as_ref()
    }
}

impl fmt::Debug for BaseEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseEdge").field("kind", &self.kind).finish()
    }
}

/// Build a non-virtual edge to a base stored in a member
///
/// ```ignore
/// builder.base::<Shape>(base_of!(Circle, shape))?;
/// builder.base::<Node>(base_of!(polymorphic Leaf, node))?;
/// ```
#[macro_export]
macro_rules! base_of {
    (polymorphic $derived:ty, $member:ident) => {
        // SAFETY: `offset_of!` names the same member the projection reads.
        unsafe {
            $crate::BaseEdge::__embedded_polymorphic::<$derived, _>(
                ::core::mem::offset_of!($derived, $member),
                |derived| &derived.$member,
            )
        }
    };
    ($derived:ty, $member:ident) => {
        // SAFETY: `offset_of!` names the same member the projection reads.
        unsafe {
            $crate::BaseEdge::__embedded::<$derived, _>(
                ::core::mem::offset_of!($derived, $member),
                |derived| &derived.$member,
            )
        }
    };
}
