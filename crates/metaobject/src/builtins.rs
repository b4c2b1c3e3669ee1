//! Primitive types and their operators
//!
//! Registered into every engine built with `register_builtins`. Integer
//! arithmetic wraps; division and remainder return `Option` and give `None`
//! for a zero divisor or an overflowing quotient.

use tracing::debug;

use crate::engine::Engine;
use crate::error::MetaResult;
use crate::handle::ObjectHandle;
use crate::ops::Operator;
use crate::param::Ref;
use crate::registry::TypeLayout;
use crate::ty::Type;

macro_rules! comparisons {
    ($b:expr, $ty:ty) => {
        $b.operator(Operator::Eq, |x: &$ty, y: $ty| *x == y)?
            .operator(Operator::Ne, |x: &$ty, y: $ty| *x != y)?
            .operator(Operator::Lt, |x: &$ty, y: $ty| *x < y)?
            .operator(Operator::Le, |x: &$ty, y: $ty| *x <= y)?
            .operator(Operator::Gt, |x: &$ty, y: $ty| *x > y)?
            .operator(Operator::Ge, |x: &$ty, y: $ty| *x >= y)?
    };
}

macro_rules! integers {
    ($engine:expr; $($ty:ty),* $(,)?) => {
        $(
            let mut b = $engine.register::<$ty>();
            b.default_constructor()?
                .constructor(|x: $ty| x)?
                .operator(Operator::Add, |x: &$ty, y: $ty| x.wrapping_add(y))?
                .operator(Operator::Sub, |x: &$ty, y: $ty| x.wrapping_sub(y))?
                .operator(Operator::Mul, |x: &$ty, y: $ty| x.wrapping_mul(y))?
                .operator(Operator::Div, |x: &$ty, y: $ty| x.checked_div(y))?
                .operator(Operator::Rem, |x: &$ty, y: $ty| x.checked_rem(y))?;
            comparisons!(b, $ty);
        )*
    };
}

macro_rules! signed {
    ($engine:expr; $($ty:ty),* $(,)?) => {
        integers!($engine; $($ty),*);
        $(
            $engine
                .register::<$ty>()
                .operator(Operator::Neg, |x: &$ty| x.wrapping_neg())?;
        )*
    };
}

macro_rules! floats {
    ($engine:expr; $($ty:ty),* $(,)?) => {
        $(
            let mut b = $engine.register::<$ty>();
            b.default_constructor()?
                .constructor(|x: $ty| x)?
                .operator(Operator::Add, |x: &$ty, y: $ty| x + y)?
                .operator(Operator::Sub, |x: &$ty, y: $ty| x - y)?
                .operator(Operator::Mul, |x: &$ty, y: $ty| x * y)?
                .operator(Operator::Div, |x: &$ty, y: $ty| x / y)?
                .operator(Operator::Rem, |x: &$ty, y: $ty| x % y)?
                .operator(Operator::Neg, |x: &$ty| -x)?;
            comparisons!(b, $ty);
        )*
    };
}

pub(crate) fn register(engine: &Engine) -> MetaResult<()> {
    engine.register_type(Type::VOID, TypeLayout::of::<()>());
    engine.register::<ObjectHandle>();

    signed!(engine; i8, i16, i32, i64, i128, isize);
    integers!(engine; u8, u16, u32, u64, u128, usize);
    floats!(engine; f32, f64);

    let mut b = engine.register::<bool>();
    b.default_constructor()?.constructor(|x: bool| x)?;
    comparisons!(b, bool);

    let mut b = engine.register::<char>();
    b.default_constructor()?.constructor(|x: char| x)?;
    comparisons!(b, char);

    engine
        .register::<String>()
        .default_constructor()?
        .constructor(|s: Ref<String>| String::clone(&s))?
        .method("len", |s: &String| s.len())?
        .method("empty", |s: &String| s.is_empty())?
        .operator(Operator::Add, |x: &String, y: Ref<String>| format!("{x}{}", &*y))?
        .operator(Operator::Eq, |x: &String, y: Ref<String>| *x == *y)?
        .operator(Operator::Ne, |x: &String, y: Ref<String>| *x != *y)?
        .operator(Operator::Lt, |x: &String, y: Ref<String>| *x < *y)?
        .operator(Operator::Le, |x: &String, y: Ref<String>| *x <= *y)?
        .operator(Operator::Gt, |x: &String, y: Ref<String>| *x > *y)?
        .operator(Operator::Ge, |x: &String, y: Ref<String>| *x >= *y)?;

    debug!(types = engine.types().len(), "registered builtins");
    Ok(())
}
