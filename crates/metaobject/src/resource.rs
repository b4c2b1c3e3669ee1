//! Memory resources
//!
//! Invocation results and constructed objects are allocated through a
//! `MemoryResource` handed to the engine per call, so callers decide how long
//! the memory lives. Two resources ship with the crate:
//!
//! - [`SystemResource`]: the global allocator
//! - [`ScratchArena`]: a bump arena for transient results that rewinds itself
//!   once every allocation made from it has been released

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use bumpalo::Bump;
use parking_lot::Mutex;

/// A source of raw memory
pub trait MemoryResource: Send + Sync + fmt::Debug {
    /// Allocate a block for `layout`
    ///
    /// Zero-sized layouts return a dangling, well-aligned pointer.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// Release a block
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this resource with the same layout,
    /// and must not be released twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Shared handle to a memory resource
pub type ResourceRef = Arc<dyn MemoryResource>;

#[inline]
fn dangling(layout: Layout) -> NonNull<u8> {
    // Alignment is a non-zero power of two, so this is never null.
    NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling())
}

// ============================================================================
// SystemResource
// ============================================================================

/// The process global allocator
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResource;

impl MemoryResource for SystemResource {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        if layout.size() == 0 {
            return dangling(layout);
        }
        let ptr = unsafe { alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}

// ============================================================================
// ScratchArena
// ============================================================================

struct ScratchState {
    bump: Bump,
    /// Allocations handed out and not yet released
    live: usize,
}

/// Bump-allocated scratch memory for short-lived results
///
/// Deallocation only decrements a live counter. When it reaches zero the
/// arena is rewound, so a steady request/release pattern keeps reusing the
/// same chunk.
pub struct ScratchArena {
    state: Mutex<ScratchState>,
}

impl ScratchArena {
    /// Default first chunk size
    pub const DEFAULT_CHUNK: usize = 4096;

    /// Create an arena with the default chunk size
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CHUNK)
    }

    /// Create an arena whose first chunk holds `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(ScratchState {
                bump: Bump::with_capacity(capacity),
                live: 0,
            }),
        }
    }

    /// Number of allocations not yet released
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Bytes currently reserved by the arena's chunks
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().bump.allocated_bytes()
    }

    /// Rewind the arena if nothing is live; returns whether it was rewound
    pub fn trim(&self) -> bool {
        let mut state = self.state.lock();
        if state.live == 0 {
            state.bump.reset();
            true
        } else {
            false
        }
    }
}

impl Default for ScratchArena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScratchArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ScratchArena")
            .field("live", &state.live)
            .field("allocated_bytes", &state.bump.allocated_bytes())
            .finish()
    }
}

impl MemoryResource for ScratchArena {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        let mut state = self.state.lock();
        state.live += 1;
        if layout.size() == 0 {
            return dangling(layout);
        }
        state.bump.alloc_layout(layout)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        let mut state = self.state.lock();
        debug_assert!(state.live > 0, "scratch arena released more than it handed out");
        state.live = state.live.saturating_sub(1);
        if state.live == 0 {
            state.bump.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_roundtrip() {
        let layout = Layout::new::<u64>();
        let ptr = SystemResource.allocate(layout);
        unsafe {
            ptr.as_ptr().cast::<u64>().write(42);
            assert_eq!(ptr.as_ptr().cast::<u64>().read(), 42);
            SystemResource.deallocate(ptr, layout);
        }
    }

    #[test]
    fn test_zero_sized_is_aligned() {
        let layout = Layout::from_size_align(0, 16).unwrap();
        let ptr = SystemResource.allocate(layout);
        assert_eq!(ptr.as_ptr() as usize % 16, 0);
    }

    #[test]
    fn test_scratch_rewinds_when_empty() {
        let arena = ScratchArena::with_capacity(256);
        let layout = Layout::new::<[u8; 32]>();
        let a = arena.allocate(layout);
        let b = arena.allocate(layout);
        assert_eq!(arena.live(), 2);
        assert!(!arena.trim());

        unsafe {
            arena.deallocate(a, layout);
            arena.deallocate(b, layout);
        }
        assert_eq!(arena.live(), 0);

        // After a rewind the first chunk is reused from its start.
        let c = arena.allocate(layout);
        unsafe { arena.deallocate(c, layout) };
        let d = arena.allocate(layout);
        assert_eq!(c, d);
        unsafe { arena.deallocate(d, layout) };
    }
}
