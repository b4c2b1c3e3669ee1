//! Stable 64-bit identifiers and the process-wide string arena
//!
//! Identifiers are FNV-1a hashes of the canonical string, so two processes
//! that agree on a name agree on its id. The empty string hashes to `0`,
//! which is reserved as the invalid id.

use std::fmt;

use bumpalo::Bump;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a name into its 64-bit identifier
///
/// Usable in `const` context so compile-time names get compile-time ids.
pub const fn hash_name(name: &str) -> u64 {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return 0;
    }
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u64);

        impl $name {
            /// The reserved invalid id (hash of the empty string)
            pub const INVALID: Self = Self(0);

            /// Derive the id of a name
            #[inline]
            pub const fn of(name: &str) -> Self {
                Self(hash_name(name))
            }

            /// Wrap a raw id value
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw id value
            #[inline]
            pub const fn raw(self) -> u64 {
                self.0
            }

            /// Check if this is not the invalid id
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#018x})"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a field/method/attribute name
    NameId
);

define_id!(
    /// Identifier of a canonical type name
    TypeId
);

/// Leak-only arena holding every interned string
///
/// Strings handed out live for the rest of the process. The arena is never
/// reset, which is what makes the `'static` lifetime sound.
struct StringArena {
    bump: Bump,
    strings: FxHashSet<&'static str>,
}

static ARENA: Lazy<Mutex<StringArena>> = Lazy::new(|| {
    Mutex::new(StringArena {
        bump: Bump::new(),
        strings: FxHashSet::default(),
    })
});

/// Intern a string, returning the shared process-wide copy
pub fn intern(s: &str) -> &'static str {
    if s.is_empty() {
        return "";
    }
    let mut arena = ARENA.lock();
    if let Some(existing) = arena.strings.get(s) {
        return *existing;
    }
    let stored: *const str = arena.bump.alloc_str(s);
    // SAFETY: the arena lives in a static that is never dropped or reset.
    let stored: &'static str = unsafe { &*stored };
    arena.strings.insert(stored);
    stored
}

/// Number of distinct strings interned so far
pub fn interned_count() -> usize {
    ARENA.lock().strings.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_invalid() {
        assert_eq!(hash_name(""), 0);
        assert!(!NameId::of("").is_valid());
        assert_eq!(TypeId::of(""), TypeId::INVALID);
    }

    #[test]
    fn test_hash_is_stable() {
        // FNV-1a reference values
        assert_eq!(hash_name("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(hash_name("foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_const_ids() {
        const X: NameId = NameId::of("x");
        assert_eq!(X, NameId::of("x"));
        assert_ne!(X, NameId::of("y"));
    }

    #[test]
    fn test_intern_dedupes() {
        let a = intern("ident-test-name");
        let b = intern(&String::from("ident-test-name"));
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(intern(""), "");
    }
}
