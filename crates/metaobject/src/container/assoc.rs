//! Keyed containers and the heap adapter
//!
//! `insert` never overwrites: it reports whether the key was new. Map
//! iteration yields value handles; `keys` yields keys.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use crate::builder::TypeBuilder;
use crate::capability::Capabilities as C;
use crate::error::MetaResult;
use crate::handle::ObjectHandle;
use crate::param::Ref;
use crate::ty::{type_of, Reflect};

use super::Container;

macro_rules! set_container {
    ($set:ident, [$($bound:tt)*], $caps:expr) => {
        impl<K: Reflect + Clone + $($bound)*> Container for $set<K> {
            const CAPABILITIES: C = $caps;

            fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
                let key_ty = type_of::<K>().add_const_lvalue_reference();
                b.method("size", |s: &$set<K>| s.len())?
                    .method("empty", |s: &$set<K>| s.is_empty())?
                    .method_mut("clear", |s: &mut $set<K>| s.clear())?
                    .method("contains", |s: &$set<K>, k: Ref<K>| s.contains(&*k))?
                    .method_as("find", key_ty, |s: &$set<K>, k: Ref<K>| {
                        s.get(&*k).map_or(ObjectHandle::null(), ObjectHandle::from_ref)
                    })?
                    .method_mut("insert", |s: &mut $set<K>, k: Ref<K>| s.insert(K::clone(&k)))?
                    .method_mut("erase", |s: &mut $set<K>, k: Ref<K>| s.remove(&*k))?
                    .method("iter", |s: &$set<K>| {
                        s.iter().map(ObjectHandle::from_ref).collect::<Vec<_>>()
                    })?;
                Ok(())
            }
        }
    };
}

set_container!(
    BTreeSet,
    [Ord],
    C::ITERABLE
        .union(C::SIZED)
        .union(C::ASSOCIATIVE)
        .union(C::ORDERED)
        .union(C::BIDIRECTIONAL)
);
set_container!(
    HashSet,
    [Eq + Hash],
    C::ITERABLE
        .union(C::SIZED)
        .union(C::ASSOCIATIVE)
        .union(C::HASHED)
);

macro_rules! map_container {
    ($map:ident, [$($bound:tt)*], $caps:expr) => {
        impl<K, V> Container for $map<K, V>
        where
            K: Reflect + Clone + $($bound)*,
            V: Reflect + Clone,
        {
            const CAPABILITIES: C = $caps;

            fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
                let view_ty = type_of::<V>().add_const_lvalue_reference();
                let mut_ty = type_of::<V>().add_lvalue_reference();
                b.method("size", |m: &$map<K, V>| m.len())?
                    .method("empty", |m: &$map<K, V>| m.is_empty())?
                    .method_mut("clear", |m: &mut $map<K, V>| m.clear())?
                    .method("contains", |m: &$map<K, V>, k: Ref<K>| m.contains_key(&*k))?
                    .method_as("find", view_ty, |m: &$map<K, V>, k: Ref<K>| {
                        m.get(&*k).map_or(ObjectHandle::null(), ObjectHandle::from_ref)
                    })?
                    .method_mut_as("find", mut_ty, |m: &mut $map<K, V>, k: Ref<K>| {
                        m.get_mut(&*k).map_or(ObjectHandle::null(), ObjectHandle::from_mut)
                    })?
                    .method_mut("insert", |m: &mut $map<K, V>, k: Ref<K>, v: Ref<V>| {
                        if m.contains_key(&*k) {
                            return false;
                        }
                        m.insert(K::clone(&k), V::clone(&v));
                        true
                    })?
                    .method_mut("erase", |m: &mut $map<K, V>, k: Ref<K>| m.remove(&*k).is_some())?
                    .method("keys", |m: &$map<K, V>| {
                        m.keys().map(ObjectHandle::from_ref).collect::<Vec<_>>()
                    })?;
                for name in ["values", "iter"] {
                    b.method(name, |m: &$map<K, V>| {
                        m.values().map(ObjectHandle::from_ref).collect::<Vec<_>>()
                    })?
                    .method_mut(name, |m: &mut $map<K, V>| {
                        m.values_mut().map(ObjectHandle::from_mut).collect::<Vec<_>>()
                    })?;
                }
                Ok(())
            }
        }
    };
}

map_container!(
    BTreeMap,
    [Ord],
    C::ITERABLE
        .union(C::SIZED)
        .union(C::ASSOCIATIVE)
        .union(C::MAPPED)
        .union(C::ORDERED)
        .union(C::BIDIRECTIONAL)
);
map_container!(
    HashMap,
    [Eq + Hash],
    C::ITERABLE
        .union(C::SIZED)
        .union(C::ASSOCIATIVE)
        .union(C::MAPPED)
        .union(C::HASHED)
);

impl<T: Reflect + Clone + Ord> Container for BinaryHeap<T> {
    const CAPABILITIES: C = C::ITERABLE
        .union(C::SIZED)
        .union(C::PUSH)
        .union(C::POP)
        .union(C::TOP)
        .union(C::ORDERED);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        let view_ty = type_of::<T>().add_const_lvalue_reference();
        b.method("size", |h: &BinaryHeap<T>| h.len())?
            .method("empty", |h: &BinaryHeap<T>| h.is_empty())?
            .method_mut("clear", |h: &mut BinaryHeap<T>| h.clear())?
            .method_mut("push", |h: &mut BinaryHeap<T>, x: Ref<T>| h.push(T::clone(&x)))?
            .method_mut("pop", |h: &mut BinaryHeap<T>| {
                h.pop();
            })?
            .method_as("top", view_ty, |h: &BinaryHeap<T>| {
                h.peek().map_or(ObjectHandle::null(), ObjectHandle::from_ref)
            })?
            .method("iter", |h: &BinaryHeap<T>| {
                h.iter().map(ObjectHandle::from_ref).collect::<Vec<_>>()
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ContainerKind;

    #[test]
    fn test_associative_kinds() {
        assert_eq!(ContainerKind::classify(<BTreeSet<i32>>::CAPABILITIES), ContainerKind::Set);
        assert_eq!(
            ContainerKind::classify(<HashSet<i32>>::CAPABILITIES),
            ContainerKind::UnorderedSet
        );
        assert_eq!(
            ContainerKind::classify(<BTreeMap<i32, String>>::CAPABILITIES),
            ContainerKind::Map
        );
        assert_eq!(
            ContainerKind::classify(<HashMap<String, i32>>::CAPABILITIES),
            ContainerKind::UnorderedMap
        );
        assert_eq!(
            ContainerKind::classify(<BinaryHeap<u8>>::CAPABILITIES),
            ContainerKind::PriorityQueue
        );
    }
}
