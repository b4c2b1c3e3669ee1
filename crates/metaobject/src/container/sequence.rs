//! Positional sequences: arrays, `Vec`, `VecDeque`, `LinkedList`
//!
//! Element accessors come in two overloads. On a read-only receiver they
//! return `&{const{T}}` handles, on a mutable one `&{T}` handles. Out of
//! range accessors return a null handle of the declared type.

use std::collections::{LinkedList, VecDeque};

use crate::builder::TypeBuilder;
use crate::capability::Capabilities as C;
use crate::error::MetaResult;
use crate::handle::ObjectHandle;
use crate::ops::Operator;
use crate::param::Ref;
use crate::ty::{type_of, Reflect};

use super::Container;

trait Sequence: Reflect + Sized {
    type Elem: Reflect;

    fn len(&self) -> usize;
    fn first(&self) -> Option<&Self::Elem>;
    fn first_mut(&mut self) -> Option<&mut Self::Elem>;
    fn last(&self) -> Option<&Self::Elem>;
    fn last_mut(&mut self) -> Option<&mut Self::Elem>;
    fn handles(&self) -> Vec<ObjectHandle>;
    fn handles_mut(&mut self) -> Vec<ObjectHandle>;
}

trait Indexed: Sequence {
    fn at(&self, index: usize) -> Option<&Self::Elem>;
    fn at_mut(&mut self, index: usize) -> Option<&mut Self::Elem>;
}

fn view<T: Reflect>(elem: Option<&T>) -> ObjectHandle {
    elem.map_or(ObjectHandle::null(), ObjectHandle::from_ref)
}

fn view_mut<T: Reflect>(elem: Option<&mut T>) -> ObjectHandle {
    elem.map_or(ObjectHandle::null(), ObjectHandle::from_mut)
}

macro_rules! sequence {
    ([$($generics:tt)*] $ty:ty, $len:expr) => {
        impl<$($generics)*> Sequence for $ty {
            type Elem = T;

            fn len(&self) -> usize {
                let len: fn(&Self) -> usize = $len;
                len(self)
            }

            fn first(&self) -> Option<&T> {
                self.iter().next()
            }

            fn first_mut(&mut self) -> Option<&mut T> {
                self.iter_mut().next()
            }

            fn last(&self) -> Option<&T> {
                self.iter().next_back()
            }

            fn last_mut(&mut self) -> Option<&mut T> {
                self.iter_mut().next_back()
            }

            fn handles(&self) -> Vec<ObjectHandle> {
                self.iter().map(ObjectHandle::from_ref).collect()
            }

            fn handles_mut(&mut self) -> Vec<ObjectHandle> {
                self.iter_mut().map(ObjectHandle::from_mut).collect()
            }
        }
    };
}

sequence!([T: Reflect, const N: usize] [T; N], |_| N);
sequence!([T: Reflect] Vec<T>, |v| v.len());
sequence!([T: Reflect] VecDeque<T>, |v| v.len());
sequence!([T: Reflect] LinkedList<T>, |v| v.len());

impl<T: Reflect, const N: usize> Indexed for [T; N] {
    fn at(&self, index: usize) -> Option<&T> {
        self.get(index)
    }

    fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index)
    }
}

impl<T: Reflect> Indexed for Vec<T> {
    fn at(&self, index: usize) -> Option<&T> {
        self.get(index)
    }

    fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index)
    }
}

impl<T: Reflect> Indexed for VecDeque<T> {
    fn at(&self, index: usize) -> Option<&T> {
        self.get(index)
    }

    fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index)
    }
}

/// `size empty front back iter`
fn register_sequence<S: Sequence>(b: &mut TypeBuilder<'_, S>) -> MetaResult<()> {
    let elem = type_of::<S::Elem>();
    let view_ty = elem.add_const_lvalue_reference();
    let mut_ty = elem.add_lvalue_reference();
    b.method("size", |s: &S| s.len())?
        .method("empty", |s: &S| s.len() == 0)?
        .method_as("front", view_ty, |s: &S| view(s.first()))?
        .method_mut_as("front", mut_ty, |s: &mut S| view_mut(s.first_mut()))?
        .method_as("back", view_ty, |s: &S| view(s.last()))?
        .method_mut_as("back", mut_ty, |s: &mut S| view_mut(s.last_mut()))?
        .method("iter", |s: &S| s.handles())?
        .method_mut("iter", |s: &mut S| s.handles_mut())?;
    Ok(())
}

/// `at` and `[]`
fn register_indexed<S: Indexed>(b: &mut TypeBuilder<'_, S>) -> MetaResult<()> {
    let elem = type_of::<S::Elem>();
    let view_ty = elem.add_const_lvalue_reference();
    let mut_ty = elem.add_lvalue_reference();
    for name in ["at", Operator::Index.method_name()] {
        b.method_as(name, view_ty, |s: &S, i: usize| view(s.at(i)))?
            .method_mut_as(name, mut_ty, |s: &mut S, i: usize| view_mut(s.at_mut(i)))?;
    }
    Ok(())
}

impl<T: Reflect + Clone, const N: usize> Container for [T; N] {
    const CAPABILITIES: C = C::ITERABLE
        .union(C::SIZED)
        .union(C::RANDOM_ACCESS)
        .union(C::CONTIGUOUS)
        .union(C::FIXED_EXTENT);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        register_sequence(b)?;
        register_indexed(b)
    }
}

impl<T: Reflect + Clone> Container for Vec<T> {
    const CAPABILITIES: C = C::ITERABLE
        .union(C::SIZED)
        .union(C::RANDOM_ACCESS)
        .union(C::CONTIGUOUS)
        .union(C::PUSH_BACK)
        .union(C::POP_BACK)
        .union(C::RESERVE);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        register_sequence(b)?;
        register_indexed(b)?;
        b.method_mut("clear", |v: &mut Vec<T>| v.clear())?
            .method_mut("push_back", |v: &mut Vec<T>, x: Ref<T>| v.push(T::clone(&x)))?
            .method_mut("pop_back", |v: &mut Vec<T>| {
                v.pop();
            })?
            .method_mut("insert", |v: &mut Vec<T>, at: usize, x: Ref<T>| {
                if at > v.len() {
                    return false;
                }
                v.insert(at, T::clone(&x));
                true
            })?
            .method_mut("erase", |v: &mut Vec<T>, at: usize| {
                if at >= v.len() {
                    return false;
                }
                v.remove(at);
                true
            })?
            .method_mut("reserve", |v: &mut Vec<T>, n: usize| v.reserve(n))?
            .method("capacity", |v: &Vec<T>| v.capacity())?;
        Ok(())
    }
}

impl<T: Reflect + Clone> Container for VecDeque<T> {
    const CAPABILITIES: C = C::ITERABLE
        .union(C::SIZED)
        .union(C::RANDOM_ACCESS)
        .union(C::PUSH_BACK)
        .union(C::POP_BACK)
        .union(C::PUSH_FRONT)
        .union(C::POP_FRONT)
        .union(C::RESERVE);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        register_sequence(b)?;
        register_indexed(b)?;
        b.method_mut("clear", |v: &mut VecDeque<T>| v.clear())?
            .method_mut("push_back", |v: &mut VecDeque<T>, x: Ref<T>| v.push_back(T::clone(&x)))?
            .method_mut("push_front", |v: &mut VecDeque<T>, x: Ref<T>| v.push_front(T::clone(&x)))?
            .method_mut("pop_back", |v: &mut VecDeque<T>| {
                v.pop_back();
            })?
            .method_mut("pop_front", |v: &mut VecDeque<T>| {
                v.pop_front();
            })?
            .method_mut("insert", |v: &mut VecDeque<T>, at: usize, x: Ref<T>| {
                if at > v.len() {
                    return false;
                }
                v.insert(at, T::clone(&x));
                true
            })?
            .method_mut("erase", |v: &mut VecDeque<T>, at: usize| v.remove(at).is_some())?
            .method_mut("reserve", |v: &mut VecDeque<T>, n: usize| v.reserve(n))?
            .method("capacity", |v: &VecDeque<T>| v.capacity())?;
        Ok(())
    }
}

impl<T: Reflect + Clone> Container for LinkedList<T> {
    const CAPABILITIES: C = C::ITERABLE
        .union(C::SIZED)
        .union(C::BIDIRECTIONAL)
        .union(C::PUSH_BACK)
        .union(C::POP_BACK)
        .union(C::PUSH_FRONT)
        .union(C::POP_FRONT);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        register_sequence(b)?;
        b.method_mut("clear", |l: &mut LinkedList<T>| l.clear())?
            .method_mut("push_back", |l: &mut LinkedList<T>, x: Ref<T>| l.push_back(T::clone(&x)))?
            .method_mut("push_front", |l: &mut LinkedList<T>, x: Ref<T>| {
                l.push_front(T::clone(&x))
            })?
            .method_mut("pop_back", |l: &mut LinkedList<T>| {
                l.pop_back();
            })?
            .method_mut("pop_front", |l: &mut LinkedList<T>| {
                l.pop_front();
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_carry_category() {
        let v = vec![1i32, 2, 3];
        let h = view(v.first());
        assert_eq!(h.ty().name(), "&{const{i32}}");
        assert!(view::<i32>(None).is_null());

        let mut w = vec![4i32];
        let m = view_mut(w.last_mut());
        assert_eq!(m.ty().name(), "&{i32}");
        assert_eq!(unsafe { m.get::<i32>() }, Some(&4));
    }

    #[test]
    fn test_sequence_ends() {
        let mut list: LinkedList<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(list.first(), Some(&1));
        assert_eq!(list.last(), Some(&3));
        assert_eq!(Sequence::len(&list), 3);
        *list.last_mut().unwrap() = 9;
        assert_eq!(list.back(), Some(&9));

        let array = [5u8; 4];
        assert_eq!(Sequence::len(&array), 4);
        assert_eq!(array.handles().len(), 4);
        assert!(Indexed::at(&array, 4).is_none());
    }
}
