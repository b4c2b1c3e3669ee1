//! Identity registries
//!
//! A `NameRegistry` maps ids back to the text they were derived from and
//! detects hash clashes. Lookups take the shared lock; registration takes the
//! exclusive lock only when the entry is new or is being promoted.

use std::marker::PhantomData;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ident::intern;
use crate::ty::{Name, Type};

/// An interned (text, id) value a registry can hand out
pub trait Interned: Copy {
    /// Build from text that is already `'static`
    fn from_static(text: &'static str) -> Self;
    /// Raw id of the value
    fn raw_id(&self) -> u64;
    /// Text of the value
    fn text(&self) -> &'static str;
}

impl Interned for Name {
    fn from_static(text: &'static str) -> Self {
        Name::from_static(text)
    }
    fn raw_id(&self) -> u64 {
        self.id().raw()
    }
    fn text(&self) -> &'static str {
        self.as_str()
    }
}

impl Interned for Type {
    fn from_static(text: &'static str) -> Self {
        Type::from_static(text)
    }
    fn raw_id(&self) -> u64 {
        self.id().raw()
    }
    fn text(&self) -> &'static str {
        self.name()
    }
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    /// Caller-owned static text, not copied
    Unmanaged(&'static str),
    /// Copied into the string arena
    Managed(&'static str),
}

impl Entry {
    fn text(self) -> &'static str {
        match self {
            Entry::Unmanaged(s) | Entry::Managed(s) => s,
        }
    }
}

/// Registry of names (or type names) keyed by id
pub struct NameRegistry<K: Interned> {
    entries: RwLock<FxHashMap<u64, Entry>>,
    _kind: PhantomData<fn() -> K>,
}

/// Registry of field/method/attribute names
pub type NameIdRegistry = NameRegistry<Name>;

/// Registry of canonical type names
pub type TypeIdRegistry = NameRegistry<Type>;

impl<K: Interned> NameRegistry<K> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            _kind: PhantomData,
        }
    }

    fn check_clash(existing: &'static str, text: &str, id: u64) {
        assert_eq!(
            existing, text,
            "id {id:#018x} already registered for {existing:?}, cannot register {text:?}"
        );
    }

    /// Register a name, copying it into owned storage
    ///
    /// An unmanaged entry for the same text is promoted to managed.
    ///
    /// # Panics
    ///
    /// Panics if a different string is already registered under the same id.
    pub fn register(&self, text: &str) -> K {
        let id = crate::ident::hash_name(text);
        if let Some(entry) = self.entries.read().get(&id).copied() {
            Self::check_clash(entry.text(), text, id);
            if let Entry::Managed(s) = entry {
                return K::from_static(s);
            }
        }

        let mut entries = self.entries.write();
        let stored = match entries.get(&id).copied() {
            Some(Entry::Managed(s)) => s,
            Some(Entry::Unmanaged(s)) => {
                Self::check_clash(s, text, id);
                let owned = intern(text);
                entries.insert(id, Entry::Managed(owned));
                trace!(name = owned, "promoted unmanaged name");
                owned
            }
            None => {
                let owned = intern(text);
                entries.insert(id, Entry::Managed(owned));
                owned
            }
        };
        K::from_static(stored)
    }

    /// Register a static name without copying it
    ///
    /// # Panics
    ///
    /// Panics if a different string is already registered under the same id.
    pub fn register_unmanaged(&self, text: &'static str) -> K {
        let id = crate::ident::hash_name(text);
        if let Some(entry) = self.entries.read().get(&id).copied() {
            Self::check_clash(entry.text(), text, id);
            return K::from_static(entry.text());
        }
        let mut entries = self.entries.write();
        let entry = *entries.entry(id).or_insert(Entry::Unmanaged(text));
        Self::check_clash(entry.text(), text, id);
        K::from_static(entry.text())
    }

    /// Register an already interned value
    pub fn register_value(&self, value: K) -> K {
        self.register_unmanaged(value.text())
    }

    /// Look up the text registered for an id
    pub fn lookup(&self, id: u64) -> Option<&'static str> {
        self.entries.read().get(&id).map(|e| e.text())
    }

    /// Look up the value registered for an id
    pub fn get(&self, id: u64) -> Option<K> {
        self.lookup(id).map(K::from_static)
    }

    /// Check if an id is registered
    pub fn contains(&self, id: u64) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Check if the id's text is held in owned storage
    pub fn is_managed(&self, id: u64) -> bool {
        matches!(self.entries.read().get(&id), Some(Entry::Managed(_)))
    }

    /// Get number of registered names
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<K: Interned> Default for NameRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Interned> std::fmt::Debug for NameRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = NameIdRegistry::new();
        let name = registry.register("position");
        assert_eq!(name.as_str(), "position");
        assert_eq!(registry.lookup(name.id().raw()), Some("position"));
        assert_eq!(registry.get(name.id().raw()), Some(name));
        assert!(registry.lookup(Name::new("velocity").id().raw()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = TypeIdRegistry::new();
        let a = registry.register("Vec<{i32}>");
        let b = registry.register(&String::from("Vec<{i32}>"));
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unmanaged_promotion() {
        let registry = NameIdRegistry::new();
        let name = registry.register_unmanaged("health");
        let id = name.id().raw();
        assert!(registry.contains(id));
        assert!(!registry.is_managed(id));

        registry.register("health");
        assert!(registry.is_managed(id));
        assert_eq!(registry.lookup(id), Some("health"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_clash_is_fatal() {
        let registry = NameIdRegistry::new();
        let id = crate::ident::hash_name("alpha");
        registry
            .entries
            .write()
            .insert(id, Entry::Managed("not-alpha"));
        registry.register("alpha");
    }

    #[test]
    fn test_clear() {
        let registry = NameIdRegistry::new();
        registry.register("a");
        registry.register("b");
        registry.clear();
        assert!(registry.is_empty());
    }
}
