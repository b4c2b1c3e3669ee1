//! Typed parameters and method adapters
//!
//! Native closures become erased [`MethodDescriptor`]s here. Each closure
//! parameter names how it binds to its argument:
//!
//! | parameter      | declared type | binding                  |
//! |----------------|---------------|--------------------------|
//! | `Val<T>`, `i32`| `T`           | cloned                   |
//! | `Ref<T>`       | `&{const{T}}` | read-only borrow         |
//! | `Mut<T>`       | `&{T}`        | mutable borrow           |
//! | `Move<T>`      | `&&{T}`       | mutable, may be taken    |
//! | `ObjectHandle` | `ObjectHandle`| any argument, untouched  |
//!
//! Borrow wrappers are only valid for the duration of the call.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::handle::ObjectHandle;
use crate::method::{Invoker, MethodDescriptor, MethodFlag, ResultSpec};
use crate::ty::{type_of, Reflect, Type};

/// A closure parameter bound from an argument handle
pub trait Param: Sized + 'static {
    /// Declared parameter type
    fn param_type() -> Type;

    /// Bind from an argument
    ///
    /// # Safety
    ///
    /// `arg` must address a live value compatible with `param_type`, valid
    /// for the duration of the call.
    unsafe fn extract(arg: &ObjectHandle) -> Self;
}

/// By-value parameter (cloned from the argument)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Val<T>(pub T);

impl<T> Val<T> {
    /// Unwrap
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Val<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Reflect + Clone> Param for Val<T> {
    fn param_type() -> Type {
        type_of::<T>()
    }

    unsafe fn extract(arg: &ObjectHandle) -> Self {
        Val((*arg.addr().cast::<T>()).clone())
    }
}

/// Read-only borrow of an argument
pub struct Ref<T> {
    ptr: NonNull<T>,
}

impl<T> Deref for Ref<T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: `extract` contract keeps the pointee alive for the call.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Reflect> Param for Ref<T> {
    fn param_type() -> Type {
        type_of::<T>().add_const_lvalue_reference()
    }

    unsafe fn extract(arg: &ObjectHandle) -> Self {
        Ref {
            ptr: NonNull::new_unchecked(arg.addr().cast()),
        }
    }
}

/// Mutable borrow of an argument
pub struct Mut<T> {
    ptr: NonNull<T>,
}

impl<T> Deref for Mut<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Mut<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Reflect> Param for Mut<T> {
    fn param_type() -> Type {
        type_of::<T>().add_lvalue_reference()
    }

    unsafe fn extract(arg: &ObjectHandle) -> Self {
        Mut {
            ptr: NonNull::new_unchecked(arg.addr().cast()),
        }
    }
}

/// Argument the callee may move out of
pub struct Move<T> {
    ptr: NonNull<T>,
    _owned: PhantomData<T>,
}

impl<T> Move<T> {
    /// Take the value, leaving `T::default()` behind
    pub fn take(mut self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self)
    }
}

impl<T> Deref for Move<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Move<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Reflect> Param for Move<T> {
    fn param_type() -> Type {
        type_of::<T>().add_rvalue_reference()
    }

    unsafe fn extract(arg: &ObjectHandle) -> Self {
        Move {
            ptr: NonNull::new_unchecked(arg.addr().cast()),
            _owned: PhantomData,
        }
    }
}

impl Param for ObjectHandle {
    fn param_type() -> Type {
        Type::OBJECT_HANDLE
    }

    unsafe fn extract(arg: &ObjectHandle) -> Self {
        *arg
    }
}

macro_rules! value_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Param for $ty {
                fn param_type() -> Type {
                    type_of::<$ty>()
                }

                unsafe fn extract(arg: &ObjectHandle) -> Self {
                    (*arg.addr().cast::<$ty>()).clone()
                }
            }
        )*
    };
}

value_params!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

// ============================================================================
// Adapters
// ============================================================================

/// A closure taking `&S` first
pub trait ConstMethod<S, Marker> {
    /// Erase into a `Const` descriptor
    fn into_descriptor(self) -> MethodDescriptor;
}

/// A closure taking `&mut S` first
pub trait MutMethod<S, Marker> {
    /// Erase into a `Variable` descriptor
    fn into_descriptor(self) -> MethodDescriptor;
}

/// A closure with no receiver
pub trait StaticFunction<Marker> {
    /// Erase into a `Static` descriptor
    fn into_descriptor(self) -> MethodDescriptor;
}

/// A closure producing a new `S` in place
pub trait Constructor<S, Marker> {
    /// Erase into a `__ctor` descriptor that writes into the receiver
    fn into_descriptor(self) -> MethodDescriptor;
}

macro_rules! impl_adapters {
    ($($arg:ident $var:ident $idx:tt),*) => {
        impl<S, F, R, $($arg),*> ConstMethod<S, fn($($arg),*) -> R> for F
        where
            S: Reflect,
            R: Reflect,
            F: Fn(&S $(, $arg)*) -> R + Send + Sync + 'static,
            $($arg: Param,)*
        {
            fn into_descriptor(self) -> MethodDescriptor {
                let invoker: Invoker = Arc::new(
                    move |recv: *mut u8, slot: *mut u8, _args: &[ObjectHandle]| unsafe {
                        let recv = &*recv.cast::<S>();
                        $(let $var = <$arg as Param>::extract(&_args[$idx]);)*
                        slot.cast::<R>().write(self(recv $(, $var)*));
                    },
                );
                unsafe {
                    MethodDescriptor::from_raw(
                        MethodFlag::Const,
                        ResultSpec::of::<R>(),
                        [$(<$arg as Param>::param_type()),*],
                        invoker,
                    )
                }
            }
        }

        impl<S, F, R, $($arg),*> MutMethod<S, fn($($arg),*) -> R> for F
        where
            S: Reflect,
            R: Reflect,
            F: Fn(&mut S $(, $arg)*) -> R + Send + Sync + 'static,
            $($arg: Param,)*
        {
            fn into_descriptor(self) -> MethodDescriptor {
                let invoker: Invoker = Arc::new(
                    move |recv: *mut u8, slot: *mut u8, _args: &[ObjectHandle]| unsafe {
                        let recv = &mut *recv.cast::<S>();
                        $(let $var = <$arg as Param>::extract(&_args[$idx]);)*
                        slot.cast::<R>().write(self(recv $(, $var)*));
                    },
                );
                unsafe {
                    MethodDescriptor::from_raw(
                        MethodFlag::Variable,
                        ResultSpec::of::<R>(),
                        [$(<$arg as Param>::param_type()),*],
                        invoker,
                    )
                }
            }
        }

        impl<F, R, $($arg),*> StaticFunction<fn($($arg),*) -> R> for F
        where
            R: Reflect,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: Param,)*
        {
            fn into_descriptor(self) -> MethodDescriptor {
                let invoker: Invoker = Arc::new(
                    move |_recv: *mut u8, slot: *mut u8, _args: &[ObjectHandle]| unsafe {
                        $(let $var = <$arg as Param>::extract(&_args[$idx]);)*
                        slot.cast::<R>().write(self($($var),*));
                    },
                );
                unsafe {
                    MethodDescriptor::from_raw(
                        MethodFlag::Static,
                        ResultSpec::of::<R>(),
                        [$(<$arg as Param>::param_type()),*],
                        invoker,
                    )
                }
            }
        }

        impl<S, F, $($arg),*> Constructor<S, fn($($arg),*) -> S> for F
        where
            S: Reflect,
            F: Fn($($arg),*) -> S + Send + Sync + 'static,
            $($arg: Param,)*
        {
            fn into_descriptor(self) -> MethodDescriptor {
                let invoker: Invoker = Arc::new(
                    move |recv: *mut u8, _slot: *mut u8, _args: &[ObjectHandle]| unsafe {
                        $(let $var = <$arg as Param>::extract(&_args[$idx]);)*
                        recv.cast::<S>().write(self($($var),*));
                    },
                );
                unsafe {
                    MethodDescriptor::from_raw(
                        MethodFlag::Variable,
                        ResultSpec::void(),
                        [$(<$arg as Param>::param_type()),*],
                        invoker,
                    )
                }
            }
        }
    };
}

impl_adapters!();
impl_adapters!(A0 a0 0);
impl_adapters!(A0 a0 0, A1 a1 1);
impl_adapters!(A0 a0 0, A1 a1 1, A2 a2 2);
impl_adapters!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);

/// Destructor descriptor running `S`'s drop glue on the receiver
pub fn destructor<S: Reflect>() -> MethodDescriptor {
    let invoker: Invoker = Arc::new(|recv: *mut u8, _slot: *mut u8, _args: &[ObjectHandle]| unsafe {
        std::ptr::drop_in_place(recv.cast::<S>());
    });
    unsafe { MethodDescriptor::from_raw(MethodFlag::Variable, ResultSpec::void(), [], invoker) }
}

// ============================================================================
// Call arguments
// ============================================================================

/// A tuple of native values passed as call arguments
///
/// The values live on the caller's stack for the duration of the call and are
/// presented as temporaries (type `T`).
pub trait IntoArgs {
    /// Run `f` with handles to the packed values
    fn with_handles<R>(self, f: impl FnOnce(&[ObjectHandle]) -> R) -> R;
}

impl IntoArgs for () {
    fn with_handles<R>(self, f: impl FnOnce(&[ObjectHandle]) -> R) -> R {
        f(&[])
    }
}

macro_rules! impl_into_args {
    ($($arg:ident $idx:tt),+) => {
        impl<$($arg: Reflect),+> IntoArgs for ($($arg,)+) {
            fn with_handles<R>(mut self, f: impl FnOnce(&[ObjectHandle]) -> R) -> R {
                let handles = [$(ObjectHandle::from_value(&mut self.$idx)),+];
                f(&handles)
            }
        }
    };
}

impl_into_args!(A 0);
impl_into_args!(A 0, B 1);
impl_into_args!(A 0, B 1, C 2);
impl_into_args!(A 0, B 1, C 2, D 3);
