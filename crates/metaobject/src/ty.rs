//! `Name` and `Type`: interned (text, id) pairs
//!
//! A `Type` answers every structural query from its canonical text (see
//! [`crate::type_name`]); it never consults a registry. The `Reflect` trait
//! gives native Rust types their canonical name.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MetaResult;
use crate::ident::{intern, NameId, TypeId};
use crate::type_name;

// ============================================================================
// Name
// ============================================================================

/// An interned field/method/attribute name
#[derive(Clone, Copy)]
pub struct Name {
    text: &'static str,
    id: NameId,
}

impl Name {
    /// The empty, invalid name
    pub const INVALID: Self = Self {
        text: "",
        id: NameId::INVALID,
    };

    /// Intern a name
    pub fn new(text: &str) -> Self {
        Self {
            text: intern(text),
            id: NameId::of(text),
        }
    }

    /// Wrap a static name without copying it
    pub const fn from_static(text: &'static str) -> Self {
        Self {
            text,
            id: NameId::of(text),
        }
    }

    /// Name text
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.text
    }

    /// Name id
    #[inline]
    pub fn id(&self) -> NameId {
        self.id
    }

    /// Check if this is a non-empty name
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

// ============================================================================
// Type
// ============================================================================

/// An interned canonical type name
#[derive(Clone, Copy)]
pub struct Type {
    name: &'static str,
    id: TypeId,
}

impl Type {
    /// The "no type" sentinel, returned when nothing matches
    pub const INVALID: Self = Self {
        name: "",
        id: TypeId::INVALID,
    };

    /// The unit type
    pub const VOID: Self = Self::from_static(type_name::VOID);

    /// The generic object-handle type; as a parameter it accepts any argument
    pub const OBJECT_HANDLE: Self = Self::from_static("ObjectHandle");

    /// Intern a canonical type name
    pub fn new(name: &str) -> Self {
        Self {
            name: intern(name),
            id: TypeId::of(name),
        }
    }

    /// Wrap a static canonical name without copying it
    pub const fn from_static(name: &'static str) -> Self {
        Self {
            name,
            id: TypeId::of(name),
        }
    }

    /// Canonical name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type id
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Check if this is a real type (not the sentinel)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    /// Check if this is the wildcard object-handle type
    #[inline]
    pub fn is_object_handle(&self) -> bool {
        self.id == Self::OBJECT_HANDLE.id
    }

    /// Intern a canonical type name after checking that it decodes
    pub fn parse(name: &str) -> MetaResult<Self> {
        type_name::TypeExpr::parse(name)?;
        Ok(Self::new(name))
    }

    /// Decode the canonical name into a tree
    pub fn decode(&self) -> Result<type_name::TypeExpr, crate::error::TypeNameError> {
        type_name::TypeExpr::parse(self.name)
    }

    fn map(self, f: for<'x> fn(&'x str) -> Cow<'x, str>) -> Type {
        match f(self.name) {
            Cow::Borrowed(b) if b.len() == self.name.len() => self,
            Cow::Borrowed(b) => Type::new(b),
            Cow::Owned(o) => Type::new(&o),
        }
    }

    fn map_str(self, f: fn(&str) -> &str) -> Type {
        let out = f(self.name);
        if out.len() == self.name.len() {
            self
        } else {
            Type::new(out)
        }
    }
}

macro_rules! type_predicates {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        impl Type {
            $(
                $(#[$meta])*
                #[inline]
                pub fn $name(&self) -> bool {
                    type_name::$name(self.name)
                }
            )*
        }
    };
}

type_predicates!(
    /// `&{T}` or `&&{T}`
    is_reference,
    /// `&{T}`
    is_lvalue_reference,
    /// `&&{T}`
    is_rvalue_reference,
    /// Top-level const
    is_const,
    /// Top-level volatile
    is_volatile,
    /// Pointer
    is_pointer,
    /// Array of any extent
    is_array,
    /// `[N]{T}`
    is_bounded_array,
    /// `[]{T}`
    is_unbounded_array,
    /// Function shape
    is_function,
    /// `enum{T}`
    is_enum,
    /// `union{T}`
    is_union,
    /// Template instance
    is_template,
    /// Unit type
    is_void,
    /// `bool`
    is_bool,
    /// Integers, `bool`, `char`
    is_integral,
    /// `f32` / `f64`
    is_floating_point,
    /// Integral or floating
    is_arithmetic,
    /// Signed
    is_signed,
    /// Unsigned
    is_unsigned,
    /// Arithmetic or void
    is_fundamental,
    /// Arithmetic, enum or pointer
    is_scalar,
);

macro_rules! type_transforms {
    ($($(#[$meta:meta])* $name:ident => $how:ident),* $(,)?) => {
        impl Type {
            $(
                $(#[$meta])*
                pub fn $name(self) -> Type {
                    self.$how(type_name::$name)
                }
            )*
        }
    };
}

type_transforms!(
    /// Add top-level const
    add_const => map,
    /// Add top-level volatile
    add_volatile => map,
    /// Add const and volatile
    add_cv => map,
    /// Remove top-level const
    remove_const => map,
    /// Remove top-level volatile
    remove_volatile => map,
    /// Add an lvalue reference
    add_lvalue_reference => map,
    /// Add an rvalue reference
    add_rvalue_reference => map,
    /// `const T&`
    add_const_lvalue_reference => map,
    /// `const T&&`
    add_const_rvalue_reference => map,
    /// Pointer to this type
    add_pointer => map,
    /// Decay
    decay => map,
    /// Remove cv (array elements included)
    strip_cv => map,
    /// Remove top-level cv
    remove_cv => map_str,
    /// Remove a reference
    remove_reference => map_str,
    /// Remove reference then cv (array elements included)
    strip_cvref => map,
    /// Remove reference then top-level cv
    remove_cvref => map_str,
    /// Remove a pointer
    remove_pointer => map_str,
    /// Remove one array dimension
    remove_extent => map_str,
    /// Remove every array dimension
    remove_all_extents => map_str,
);

impl Type {
    /// Number of array dimensions
    pub fn rank(&self) -> usize {
        type_name::rank(self.name)
    }

    /// Extent of an array dimension
    pub fn extent(&self, dim: usize) -> usize {
        type_name::extent(self.name, dim)
    }

    /// Template name, if this is a template instance
    pub fn template_name(&self) -> Option<&'static str> {
        type_name::template_name(self.name)
    }

    /// Template arguments as types
    pub fn template_args(&self) -> Vec<Type> {
        type_name::template_args(self.name)
            .into_iter()
            .map(Type::new)
            .collect()
    }

    /// Parameter types of a function type
    pub fn function_params(&self) -> Vec<Type> {
        type_name::function_params(self.name)
            .into_iter()
            .map(Type::new)
            .collect()
    }

    /// Return type of a function type
    pub fn function_return(&self) -> Option<Type> {
        type_name::function_return(self.name).map(Type::new)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl PartialOrd for Type {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Type {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Default for Type {
    fn default() -> Self {
        Type::INVALID
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({:?})", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Ok(Type::INVALID);
        }
        Type::parse(&name).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.text)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Name::new(&text))
    }
}

// ============================================================================
// Reflect
// ============================================================================

/// A native type with a canonical name
///
/// Implement with [`reflect_type!`](crate::reflect_type) for user types; the
/// standard library's primitives and collections are covered here.
pub trait Reflect: 'static {
    /// Append the canonical name to `out`
    fn write_type_name(out: &mut String);
}

static TYPE_CACHE: Lazy<DashMap<std::any::TypeId, Type>> = Lazy::new(DashMap::new);

/// The `Type` of a native type
pub fn type_of<T: Reflect + ?Sized>() -> Type {
    let key = std::any::TypeId::of::<T>();
    if let Some(ty) = TYPE_CACHE.get(&key) {
        return *ty;
    }
    let mut name = String::new();
    T::write_type_name(&mut name);
    let ty = Type::new(&name);
    TYPE_CACHE.insert(key, ty);
    ty
}

fn name_of<T: Reflect + ?Sized>() -> String {
    let mut s = String::new();
    T::write_type_name(&mut s);
    s
}

/// Implement [`Reflect`] for a user type
///
/// ```ignore
/// reflect_type!(Point);                 // "Point"
/// reflect_type!(Point => "geo::Point"); // explicit name
/// reflect_type!(enum Color);            // "enum{Color}"
/// reflect_type!(union Bits);            // "union{Bits}"
/// ```
#[macro_export]
macro_rules! reflect_type {
    (enum $ty:ident) => {
        impl $crate::Reflect for $ty {
            fn write_type_name(out: &mut String) {
                out.push_str(&$crate::type_name::enumeration(stringify!($ty)));
            }
        }
    };
    (union $ty:ident) => {
        impl $crate::Reflect for $ty {
            fn write_type_name(out: &mut String) {
                out.push_str(&$crate::type_name::union(stringify!($ty)));
            }
        }
    };
    ($ty:ty => $name:expr) => {
        impl $crate::Reflect for $ty {
            fn write_type_name(out: &mut String) {
                out.push_str($name);
            }
        }
    };
    ($ty:ty) => {
        $crate::reflect_type!($ty => stringify!($ty));
    };
}

macro_rules! reflect_primitive {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn write_type_name(out: &mut String) {
                    out.push_str($name);
                }
            }
        )*
    };
}

reflect_primitive!(
    bool => "bool", char => "char",
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64", i128 => "i128", isize => "isize",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64", u128 => "u128", usize => "usize",
    f32 => "f32", f64 => "f64",
    str => "str", String => "String", () => "void",
);

impl<T: Reflect + ?Sized> Reflect for &'static T {
    fn write_type_name(out: &mut String) {
        let inner = name_of::<T>();
        out.push_str(&type_name::add_lvalue_reference(&type_name::add_const(&inner)));
    }
}

impl<T: Reflect + ?Sized> Reflect for &'static mut T {
    fn write_type_name(out: &mut String) {
        out.push_str(&type_name::add_lvalue_reference(&name_of::<T>()));
    }
}

impl<T: Reflect + ?Sized> Reflect for *const T {
    fn write_type_name(out: &mut String) {
        let inner = name_of::<T>();
        out.push_str(&type_name::add_pointer(&type_name::add_const(&inner)));
    }
}

impl<T: Reflect + ?Sized> Reflect for *mut T {
    fn write_type_name(out: &mut String) {
        out.push_str(&type_name::add_pointer(&name_of::<T>()));
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn write_type_name(out: &mut String) {
        out.push_str(&type_name::array(Some(N), &name_of::<T>()));
    }
}

impl<T: Reflect> Reflect for [T] {
    fn write_type_name(out: &mut String) {
        out.push_str(&type_name::array(None, &name_of::<T>()));
    }
}

macro_rules! reflect_template {
    ($($name:literal => $ty:ident<$($param:ident),+>),* $(,)?) => {
        $(
            impl<$($param: Reflect),+> Reflect for $ty<$($param),+> {
                fn write_type_name(out: &mut String) {
                    out.push_str(&type_name::template($name, &[$(name_of::<$param>()),+]));
                }
            }
        )*
    };
}

reflect_template!(
    "Vec" => Vec<T>,
    "VecDeque" => VecDeque<T>,
    "LinkedList" => LinkedList<T>,
    "BinaryHeap" => BinaryHeap<T>,
    "BTreeSet" => BTreeSet<T>,
    "HashSet" => HashSet<T>,
    "BTreeMap" => BTreeMap<K, V>,
    "HashMap" => HashMap<K, V>,
    "Option" => Option<T>,
    "Result" => Result<T, E>,
    "Box" => Box<T>,
);

macro_rules! reflect_tuple {
    ($($param:ident),+) => {
        impl<$($param: Reflect),+> Reflect for ($($param,)+) {
            fn write_type_name(out: &mut String) {
                out.push_str(&type_name::template("tuple", &[$(name_of::<$param>()),+]));
            }
        }
    };
}

reflect_tuple!(A);
reflect_tuple!(A, B);
reflect_tuple!(A, B, C);
reflect_tuple!(A, B, C, D);

macro_rules! reflect_fn {
    ($($param:ident),*) => {
        impl<R: Reflect, $($param: Reflect),*> Reflect for fn($($param),*) -> R {
            fn write_type_name(out: &mut String) {
                let params: &[String] = &[$(name_of::<$param>()),*];
                out.push_str(&type_name::function(params, "", &name_of::<R>()));
            }
        }
    };
}

reflect_fn!();
reflect_fn!(A);
reflect_fn!(A, B);
reflect_fn!(A, B, C);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaError;

    struct Point;
    reflect_type!(Point);

    #[allow(dead_code)]
    enum Color {
        Red,
    }
    reflect_type!(enum Color);

    #[test]
    fn test_primitive_names() {
        assert_eq!(type_of::<i32>().name(), "i32");
        assert_eq!(type_of::<()>(), Type::VOID);
        assert_eq!(type_of::<String>().name(), "String");
    }

    #[test]
    fn test_compound_names() {
        assert_eq!(type_of::<&'static i32>().name(), "&{const{i32}}");
        assert_eq!(type_of::<&'static mut i32>().name(), "&{i32}");
        assert_eq!(type_of::<*const u8>().name(), "*{const{u8}}");
        assert_eq!(type_of::<[f64; 3]>().name(), "[3]{f64}");
        assert_eq!(type_of::<&'static [u8; 2]>().name(), "&{[2]{const{u8}}}");
        assert_eq!(type_of::<Vec<Point>>().name(), "Vec<{Point}>");
        assert_eq!(
            type_of::<HashMap<String, Vec<i32>>>().name(),
            "HashMap<{String},{Vec<{i32}>}>"
        );
        assert_eq!(type_of::<(i32, f64)>().name(), "tuple<{i32},{f64}>");
        assert_eq!(
            type_of::<fn(i32, f64) -> bool>().name(),
            "({i32},{f64})-{}->{bool}"
        );
        assert_eq!(type_of::<Color>().name(), "enum{Color}");
    }

    #[test]
    fn test_type_identity() {
        let a = Type::new("Point");
        let b = type_of::<Point>();
        assert_eq!(a, b);
        assert_eq!(a.id(), TypeId::of("Point"));
        assert!(!Type::INVALID.is_valid());
    }

    #[test]
    fn test_type_transforms() {
        let t = type_of::<i32>();
        let c = t.add_const();
        assert_eq!(c.name(), "const{i32}");
        assert_eq!(c.add_const(), c);
        assert_eq!(c.add_lvalue_reference().name(), "&{const{i32}}");
        assert_eq!(c.add_lvalue_reference().remove_cvref(), t);
        assert_eq!(t.add_rvalue_reference().add_lvalue_reference().name(), "&{i32}");
        assert!(t.add_pointer().is_pointer());
        assert!(type_of::<Vec<i32>>().is_template());
        assert_eq!(type_of::<Vec<i32>>().template_args(), vec![t]);
    }

    #[test]
    fn test_type_serde() {
        let t = type_of::<Vec<i32>>();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"Vec<{i32}>\"");
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let invalid: Type = serde_json::from_str("\"\"").unwrap();
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_malformed_names_are_rejected() {
        for bad in ["\"[3]{i32\"", "\"[3]{i32}x\"", "\"const{i32\""] {
            assert!(serde_json::from_str::<Type>(bad).is_err(), "{bad}");
        }
        assert!(matches!(
            Type::parse("Vec<{i32}"),
            Err(MetaError::InvalidTypeName(_))
        ));
        assert_eq!(Type::parse("[3]{i32}"), Ok(Type::new("[3]{i32}")));

        // Unchecked names still answer queries.
        let t = Type::new("[3]{i32");
        assert!(!t.is_const());
        assert!(!t.is_array());
        assert_eq!(t.rank(), 0);
    }
}
