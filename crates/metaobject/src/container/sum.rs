//! Sum types, optionals, pairs and tuples
//!
//! A sum type exposes `index`, `holds_alternative` and `get`. Dispatch goes
//! through a [`SumTypeTable`] stored on the type, so the engine can answer
//! `holds_alternative` for a raw handle without knowing the native type.

use crate::builder::TypeBuilder;
use crate::capability::Capabilities as C;
use crate::error::MetaResult;
use crate::handle::ObjectHandle;
use crate::ident::TypeId;
use crate::param::Ref;
use crate::ty::{type_of, Reflect, Type};

use super::Container;

/// A tagged union of registered alternatives
///
/// ```ignore
/// enum Shape { Circle(Circle), Square(Square) }
///
/// impl SumType for Shape {
///     fn alternatives() -> Vec<Type> {
///         vec![type_of::<Circle>(), type_of::<Square>()]
///     }
///     fn index(&self) -> usize {
///         match self { Shape::Circle(_) => 0, Shape::Square(_) => 1 }
///     }
///     fn alternative(&self) -> ObjectHandle {
///         match self {
///             Shape::Circle(c) => ObjectHandle::from_ref(c),
///             Shape::Square(s) => ObjectHandle::from_ref(s),
///         }
///     }
///     fn alternative_mut(&mut self) -> ObjectHandle { /* from_mut */ }
/// }
/// ```
pub trait SumType: Reflect + Sized {
    /// Alternative types, by index
    fn alternatives() -> Vec<Type>;

    /// Index of the active alternative
    fn index(&self) -> usize;

    /// Read-only handle to the active alternative
    fn alternative(&self) -> ObjectHandle;

    /// Mutable handle to the active alternative
    fn alternative_mut(&mut self) -> ObjectHandle;
}

/// Erased sum-type accessors
#[derive(Debug, Clone)]
pub struct SumTypeTable {
    alternatives: Vec<Type>,
    index: unsafe fn(*const u8) -> usize,
    get: unsafe fn(*mut u8) -> ObjectHandle,
}

unsafe fn index_of<S: SumType>(addr: *const u8) -> usize {
    (*addr.cast::<S>()).index()
}

unsafe fn active_of<S: SumType>(addr: *mut u8) -> ObjectHandle {
    (*addr.cast::<S>()).alternative_mut()
}

impl SumTypeTable {
    /// Table for a native sum type
    pub fn of<S: SumType>() -> Self {
        Self {
            alternatives: S::alternatives(),
            index: index_of::<S>,
            get: active_of::<S>,
        }
    }

    /// Alternative types, by index
    pub fn alternatives(&self) -> &[Type] {
        &self.alternatives
    }

    /// Active alternative index
    ///
    /// # Safety
    ///
    /// `addr` must point at a live value of the table's type.
    pub unsafe fn index(&self, addr: *const u8) -> usize {
        (self.index)(addr)
    }

    /// Check if the active alternative is `ty`
    ///
    /// # Safety
    ///
    /// As for [`index`](Self::index).
    pub unsafe fn holds(&self, addr: *const u8, ty: Type) -> bool {
        self.alternatives.get(self.index(addr)) == Some(&ty.strip_cvref())
    }

    /// Handle to the active alternative
    ///
    /// # Safety
    ///
    /// `addr` must point at a live, mutable value of the table's type.
    pub unsafe fn active(&self, addr: *mut u8) -> ObjectHandle {
        (self.get)(addr)
    }
}

/// `index holds_alternative get`, plus the table and the `VARIANT` bit
pub(crate) fn register_sum_type<S: SumType>(b: &mut TypeBuilder<'_, S>) -> MetaResult<()> {
    b.capabilities(C::VARIANT).sum_type(SumTypeTable::of::<S>());
    b.method("index", |s: &S| s.index())?
        .method("holds_alternative", |s: &S, name: String| {
            S::alternatives()
                .get(s.index())
                .is_some_and(|alt| alt.id() == TypeId::of(&name))
        })?
        .method("get", |s: &S, i: usize| {
            if i == s.index() {
                s.alternative()
            } else {
                ObjectHandle::null()
            }
        })?
        .method_mut("get", |s: &mut S, i: usize| {
            if i == s.index() {
                s.alternative_mut()
            } else {
                ObjectHandle::null()
            }
        })?;
    Ok(())
}

impl<T: Reflect, E: Reflect> SumType for Result<T, E> {
    fn alternatives() -> Vec<Type> {
        vec![type_of::<T>(), type_of::<E>()]
    }

    fn index(&self) -> usize {
        match self {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }

    fn alternative(&self) -> ObjectHandle {
        match self {
            Ok(v) => ObjectHandle::from_ref(v),
            Err(e) => ObjectHandle::from_ref(e),
        }
    }

    fn alternative_mut(&mut self) -> ObjectHandle {
        match self {
            Ok(v) => ObjectHandle::from_mut(v),
            Err(e) => ObjectHandle::from_mut(e),
        }
    }
}

impl<T: Reflect, E: Reflect> Container for Result<T, E> {
    const CAPABILITIES: C = C::VARIANT;

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        register_sum_type(b)
    }
}

impl<T: Reflect + Clone> Container for Option<T> {
    const CAPABILITIES: C = C::OPTIONAL.union(C::DEREF);

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        let view_ty = type_of::<T>().add_const_lvalue_reference();
        let mut_ty = type_of::<T>().add_lvalue_reference();
        b.method("has_value", |o: &Option<T>| o.is_some())?
            .method_as("value", view_ty, |o: &Option<T>| {
                o.as_ref().map_or(ObjectHandle::null(), ObjectHandle::from_ref)
            })?
            .method_mut_as("value", mut_ty, |o: &mut Option<T>| {
                o.as_mut().map_or(ObjectHandle::null(), ObjectHandle::from_mut)
            })?
            .method_mut("reset", |o: &mut Option<T>| *o = None)?
            .method_mut("emplace", |o: &mut Option<T>, x: Ref<T>| *o = Some(T::clone(&x)))?;
        Ok(())
    }
}

impl<A: Reflect, B: Reflect> Container for (A, B) {
    const CAPABILITIES: C = C::PAIR;

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        let (a, bt) = (type_of::<A>(), type_of::<B>());
        b.method_as("first", a.add_const_lvalue_reference(), |p: &(A, B)| {
            ObjectHandle::from_ref(&p.0)
        })?
        .method_mut_as("first", a.add_lvalue_reference(), |p: &mut (A, B)| {
            ObjectHandle::from_mut(&mut p.0)
        })?
        .method_as("second", bt.add_const_lvalue_reference(), |p: &(A, B)| {
            ObjectHandle::from_ref(&p.1)
        })?
        .method_mut_as("second", bt.add_lvalue_reference(), |p: &mut (A, B)| {
            ObjectHandle::from_mut(&mut p.1)
        })?
        .function("tuple_size", || 2usize)?
        .method("get", |p: &(A, B), i: usize| match i {
            0 => ObjectHandle::from_ref(&p.0),
            1 => ObjectHandle::from_ref(&p.1),
            _ => ObjectHandle::null(),
        })?
        .method_mut("get", |p: &mut (A, B), i: usize| match i {
            0 => ObjectHandle::from_mut(&mut p.0),
            1 => ObjectHandle::from_mut(&mut p.1),
            _ => ObjectHandle::null(),
        })?;
        Ok(())
    }
}

impl<A: Reflect, B: Reflect, D: Reflect> Container for (A, B, D) {
    const CAPABILITIES: C = C::TUPLE;

    fn register_operations(b: &mut TypeBuilder<'_, Self>) -> MetaResult<()> {
        b.function("tuple_size", || 3usize)?
            .method("get", |t: &(A, B, D), i: usize| match i {
                0 => ObjectHandle::from_ref(&t.0),
                1 => ObjectHandle::from_ref(&t.1),
                2 => ObjectHandle::from_ref(&t.2),
                _ => ObjectHandle::null(),
            })?
            .method_mut("get", |t: &mut (A, B, D), i: usize| match i {
                0 => ObjectHandle::from_mut(&mut t.0),
                1 => ObjectHandle::from_mut(&mut t.1),
                2 => ObjectHandle::from_mut(&mut t.2),
                _ => ObjectHandle::null(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_table() {
        let table = SumTypeTable::of::<Result<i32, String>>();
        assert_eq!(table.alternatives(), &[type_of::<i32>(), type_of::<String>()]);

        let mut ok: Result<i32, String> = Ok(7);
        let mut err: Result<i32, String> = Err("bad".into());
        let ok_addr = &mut ok as *mut _ as *mut u8;
        let err_addr = &mut err as *mut _ as *mut u8;
        unsafe {
            assert_eq!(table.index(ok_addr), 0);
            assert_eq!(table.index(err_addr), 1);
            assert!(table.holds(ok_addr, type_of::<i32>()));
            assert!(table.holds(err_addr, type_of::<String>().add_const_lvalue_reference()));
            assert!(!table.holds(ok_addr, type_of::<String>()));

            let active = table.active(err_addr);
            assert_eq!(active.ty().name(), "&{String}");
            assert_eq!(active.get::<String>().map(String::as_str), Some("bad"));
        }
    }
}
