//! Attribute sets
//!
//! Arbitrary metadata values attached to a type, field or method, keyed by
//! the value's own `Type`. At most one value per attribute type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use crate::ty::{type_of, Reflect, Type};

/// One attached value
pub struct Attr {
    ty: Type,
    value: Box<dyn Any + Send + Sync>,
}

impl Attr {
    /// Wrap a value
    pub fn new<A: Reflect + Send + Sync>(value: A) -> Self {
        Self {
            ty: type_of::<A>(),
            value: Box::new(value),
        }
    }

    /// Attribute type
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Downcast the value
    pub fn downcast<A: Reflect>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attr({})", self.ty)
    }
}

/// Type-keyed, ordered set of attributes
#[derive(Debug, Default)]
pub struct AttrSet {
    attrs: BTreeMap<Type, Attr>,
}

impl AttrSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an attribute
    ///
    /// Returns the attribute back if one of the same type is already present;
    /// the existing value is left untouched.
    pub fn insert(&mut self, attr: Attr) -> Result<(), Attr> {
        if self.attrs.contains_key(&attr.ty) {
            return Err(attr);
        }
        self.attrs.insert(attr.ty, attr);
        Ok(())
    }

    /// Look up an attribute by value type
    pub fn get<A: Reflect>(&self) -> Option<&A> {
        self.attrs.get(&type_of::<A>()).and_then(Attr::downcast)
    }

    /// Look up an attribute by its `Type`
    pub fn get_by_type(&self, ty: Type) -> Option<&Attr> {
        self.attrs.get(&ty)
    }

    /// Check if an attribute type is present
    pub fn contains(&self, ty: Type) -> bool {
        self.attrs.contains_key(&ty)
    }

    /// Attribute types in set order
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.attrs.keys().copied()
    }

    /// Get number of attributes
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Check if set is empty
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Drop every attribute
    pub fn clear(&mut self) {
        self.attrs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tooltip(&'static str);
    crate::reflect_type!(Tooltip);

    #[derive(Debug, PartialEq)]
    struct Range(i32, i32);
    crate::reflect_type!(Range);

    #[test]
    fn test_insert_and_get() {
        let mut attrs = AttrSet::new();
        attrs.insert(Attr::new(Tooltip("speed"))).unwrap();
        attrs.insert(Attr::new(Range(0, 10))).unwrap();

        assert_eq!(attrs.get::<Tooltip>(), Some(&Tooltip("speed")));
        assert_eq!(attrs.get::<Range>(), Some(&Range(0, 10)));
        assert!(attrs.get::<i32>().is_none());
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut attrs = AttrSet::new();
        attrs.insert(Attr::new(Tooltip("first"))).unwrap();
        let rejected = attrs.insert(Attr::new(Tooltip("second"))).unwrap_err();
        assert_eq!(rejected.downcast::<Tooltip>(), Some(&Tooltip("second")));
        assert_eq!(attrs.get::<Tooltip>(), Some(&Tooltip("first")));
    }

    #[test]
    fn test_order_is_stable() {
        let mut a = AttrSet::new();
        a.insert(Attr::new(Range(0, 1))).unwrap();
        a.insert(Attr::new(Tooltip("x"))).unwrap();

        let mut b = AttrSet::new();
        b.insert(Attr::new(Tooltip("x"))).unwrap();
        b.insert(Attr::new(Range(0, 1))).unwrap();

        assert_eq!(a.types().collect::<Vec<_>>(), b.types().collect::<Vec<_>>());
    }
}
