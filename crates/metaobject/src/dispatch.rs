//! Overload resolution and hierarchy walks
//!
//! Candidates are gathered from the receiver's type and then its bases,
//! most-derived first, depth-first. Each argument is ranked against its
//! parameter:
//!
//! 1. `Exact`: same declared type
//! 2. `Priority`: a value or rvalue binding, e.g. a temporary `T` to `T&&`
//! 3. `Reference`: binding through a reference, e.g. anything to `const T&`
//! 4. `Wildcard`: an `ObjectHandle` parameter
//!
//! A candidate's score is its worst rank, then its rank sum, then how well
//! its flag fits the receiver. The lowest score wins. Two best candidates on
//! the same declaring type are ambiguous; otherwise the more-derived one wins.

use std::ptr;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::trace;

use crate::base::BaseEdge;
use crate::handle::ObjectHandle;
use crate::method::{MethodDescriptor, MethodFlag};
use crate::registry::{TypeInfo, TypeRegistry};
use crate::ty::{Name, Type};
use crate::type_name;

/// How well an argument binds to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// Same declared type
    Exact,
    /// Value or rvalue binding
    Priority,
    /// Reference binding
    Reference,
    /// `ObjectHandle` parameter
    Wildcard,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RefKind {
    None,
    LValue,
    RValue,
}

fn split_ref(s: &str) -> (RefKind, &str) {
    if type_name::is_lvalue_reference(s) {
        (RefKind::LValue, type_name::remove_reference(s))
    } else if type_name::is_rvalue_reference(s) {
        (RefKind::RValue, type_name::remove_reference(s))
    } else {
        (RefKind::None, s)
    }
}

/// Rank an argument type against a parameter type
///
/// `None` when the argument cannot bind at all.
pub fn rank(param: Type, arg: Type) -> Option<Rank> {
    if param == arg {
        return Some(Rank::Exact);
    }
    if param.is_object_handle() {
        return Some(Rank::Wildcard);
    }

    let (p_ref, p_inner) = split_ref(param.name());
    let (a_ref, a_inner) = split_ref(arg.name());
    if type_name::strip_cv(p_inner) != type_name::strip_cv(a_inner) {
        return None;
    }
    let p_const = type_name::is_const(p_inner);
    let a_const = type_name::is_const(a_inner);

    match p_ref {
        // By value: anything copies, lvalues through a reference.
        RefKind::None if a_ref == RefKind::LValue => Some(Rank::Reference),
        RefKind::None => Some(Rank::Priority),
        // `const T&` binds everything.
        RefKind::LValue if p_const => Some(Rank::Reference),
        // `T&` needs a mutable non-rvalue.
        RefKind::LValue if a_const || a_ref == RefKind::RValue => None,
        RefKind::LValue => Some(Rank::Reference),
        // `T&&` needs an rvalue or temporary.
        RefKind::RValue if a_ref == RefKind::LValue || (a_const && !p_const) => None,
        RefKind::RValue => Some(Rank::Priority),
    }
}

/// What the call site can offer as a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A mutable object: every flag, `Variable` preferred
    Mutable,
    /// A read-only object: `Const` and `Static`
    Const,
    /// No object: `Static` only
    Static,
}

impl Access {
    /// Access offered by a receiver handle
    pub fn of(handle: &ObjectHandle) -> Self {
        Self::of_type(handle.ty())
    }

    /// Access offered by a receiver of declared type `ty`
    pub fn of_type(ty: Type) -> Self {
        if ty.remove_reference().is_const() {
            Access::Const
        } else {
            Access::Mutable
        }
    }

    /// Preference for a flag (lower is better), `None` if not admitted
    fn preference(self, flag: MethodFlag) -> Option<u8> {
        match (self, flag) {
            (Access::Mutable, MethodFlag::Variable) => Some(0),
            (Access::Mutable, MethodFlag::Const) => Some(1),
            (Access::Mutable, MethodFlag::Static) => Some(2),
            (Access::Const, MethodFlag::Const) => Some(0),
            (Access::Const, MethodFlag::Static) => Some(1),
            (Access::Static, MethodFlag::Static) => Some(0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    worst: Rank,
    total: u32,
    flag: u8,
}

fn score(desc: &MethodDescriptor, args: &[Type], access: Access) -> Option<Score> {
    let flag = access.preference(desc.flag())?;
    if desc.arity() != args.len() {
        return None;
    }
    let mut worst = Rank::Exact;
    let mut total = 0u32;
    for (param, arg) in desc.params().iter().zip(args) {
        let r = rank(*param, *arg)?;
        worst = worst.max(r);
        total += r as u32;
    }
    Some(Score { worst, total, flag })
}

/// A chosen overload, ready to call
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The overload
    pub method: MethodDescriptor,
    /// Receiver adjusted to the declaring type (null for static methods)
    pub receiver: *mut u8,
    /// Declaring type
    pub owner: Type,
}

/// Visit a type and its bases, most-derived first, depth-first
///
/// Every type is visited once, through the first path that reaches it. The
/// address is adjusted along the way; a null address stays null. Stops early
/// when `visit` returns `false`.
pub fn walk<'r>(
    registry: &'r TypeRegistry,
    ty: Type,
    addr: *mut u8,
    visit: &mut dyn FnMut(&'r TypeInfo, *mut u8) -> bool,
) {
    let mut seen = FxHashSet::default();
    let mut stack: SmallVec<[(Type, *mut u8); 8]> = SmallVec::new();
    stack.push((ty, addr));
    while let Some((ty, addr)) = stack.pop() {
        if !seen.insert(ty) {
            continue;
        }
        let Some(info) = registry.get(ty) else {
            continue;
        };
        if !visit(info, addr) {
            return;
        }
        // Reverse so the first-registered base is visited first.
        let bases: SmallVec<[_; 4]> = info.bases().collect();
        for (base, edge) in bases.into_iter().rev() {
            let adjusted = if addr.is_null() { addr } else { edge.down(addr) };
            stack.push((base, adjusted));
        }
    }
}

fn pick<'a>(
    candidates: impl Iterator<Item = (Type, *mut u8, &'a MethodDescriptor)>,
    args: &[Type],
    access: Access,
) -> Result<Option<Resolved>, Type> {
    let mut best: Option<(Score, Resolved)> = None;
    let mut ambiguous = false;
    for (owner, receiver, desc) in candidates {
        let Some(s) = score(desc, args, access) else {
            continue;
        };
        match &best {
            Some((current, chosen)) if s == *current => {
                if chosen.owner == owner {
                    ambiguous = true;
                }
            }
            Some((current, _)) if s > *current => {}
            _ => {
                let receiver = if desc.flag() == MethodFlag::Static {
                    ptr::null_mut()
                } else {
                    receiver
                };
                best = Some((
                    s,
                    Resolved {
                        method: desc.clone(),
                        receiver,
                        owner,
                    },
                ));
                ambiguous = false;
            }
        }
    }
    match best {
        Some((_, chosen)) if ambiguous => Err(chosen.owner),
        Some((_, chosen)) => Ok(Some(chosen)),
        None => Ok(None),
    }
}

/// Resolve a method call across the type and its bases
pub fn resolve(
    registry: &TypeRegistry,
    ty: Type,
    addr: *mut u8,
    name: Name,
    args: &[Type],
    access: Access,
) -> Option<Resolved> {
    let mut found: SmallVec<[(Type, *mut u8, &MethodDescriptor); 8]> = SmallVec::new();
    walk(registry, ty, addr, &mut |info, addr| {
        for method in info.overloads(name) {
            found.push((info.ty(), addr, &method.descriptor));
        }
        true
    });
    finish(pick(found.into_iter(), args, access), ty, name)
}

/// Resolve among the type's own overloads only (constructors, destructors)
pub fn resolve_own(
    info: &TypeInfo,
    addr: *mut u8,
    name: Name,
    args: &[Type],
    access: Access,
) -> Option<Resolved> {
    let candidates = info
        .overloads(name)
        .iter()
        .map(|m| (info.ty(), addr, &m.descriptor));
    finish(pick(candidates, args, access), info.ty(), name)
}

fn finish(outcome: Result<Option<Resolved>, Type>, ty: Type, name: Name) -> Option<Resolved> {
    match outcome {
        Ok(Some(chosen)) => Some(chosen),
        Ok(None) => {
            trace!(ty = ty.name(), method = name.as_str(), "no viable overload");
            None
        }
        Err(owner) => {
            trace!(
                ty = ty.name(),
                owner = owner.name(),
                method = name.as_str(),
                "ambiguous overload"
            );
            None
        }
    }
}

// ============================================================================
// Casting
// ============================================================================

/// Edges from `from` up to the base `to`, depth-first
pub fn base_path<'r>(
    registry: &'r TypeRegistry,
    from: Type,
    to: Type,
) -> Option<Vec<&'r BaseEdge>> {
    fn search<'r>(
        registry: &'r TypeRegistry,
        from: Type,
        to: Type,
        seen: &mut FxHashSet<Type>,
        path: &mut Vec<&'r BaseEdge>,
    ) -> bool {
        if from == to {
            return true;
        }
        if !seen.insert(from) {
            return false;
        }
        let Some(info) = registry.get(from) else {
            return false;
        };
        for (base, edge) in info.bases() {
            path.push(edge);
            if search(registry, base, to, seen, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = Vec::new();
    let mut seen = FxHashSet::default();
    search(registry, from, to, &mut seen, &mut path).then_some(path)
}

/// Wrap `target` in the cv and reference qualifiers of `from`
fn requalify(from: Type, target: Type) -> Type {
    let mut ty = target.strip_cvref();
    if from.remove_reference().is_const() {
        ty = ty.add_const();
    }
    if from.is_lvalue_reference() {
        ty.add_lvalue_reference()
    } else if from.is_rvalue_reference() {
        ty.add_rvalue_reference()
    } else {
        ty
    }
}

fn upcast(registry: &TypeRegistry, from: Type, to: Type, addr: *mut u8) -> Option<*mut u8> {
    let path = base_path(registry, from, to)?;
    Some(path.iter().fold(addr, |addr, edge| edge.down(addr)))
}

/// Cast along registered edges in either direction
///
/// Upcasts compose down-adjustments; downcasts compose up-adjustments in
/// reverse and fail across a shared base.
pub fn static_cast(registry: &TypeRegistry, handle: ObjectHandle, target: Type) -> ObjectHandle {
    if handle.is_null() {
        return ObjectHandle::null();
    }
    let from = handle.object_type();
    let to = target.strip_cvref();
    let ty = requalify(handle.ty(), to);
    if from == to {
        return ObjectHandle::new(ty, handle.addr());
    }
    if let Some(addr) = upcast(registry, from, to, handle.addr()) {
        return ObjectHandle::new(ty, addr);
    }
    if let Some(path) = base_path(registry, to, from) {
        let mut addr = handle.addr();
        for edge in path.iter().rev() {
            match edge.up(addr) {
                Some(up) => addr = up,
                None => {
                    trace!(from = from.name(), to = to.name(), "static cast across a shared base");
                    return ObjectHandle::null();
                }
            }
        }
        return ObjectHandle::new(ty, addr);
    }
    trace!(from = from.name(), to = to.name(), "no cast path");
    ObjectHandle::null()
}

/// Cast using the object's dynamic type
///
/// Locates the complete object, then walks up from its dynamic type. Null
/// when the static type is not polymorphic or the object is not a `target`.
pub fn dynamic_cast(registry: &TypeRegistry, handle: ObjectHandle, target: Type) -> ObjectHandle {
    if handle.is_null() {
        return ObjectHandle::null();
    }
    let from = handle.object_type();
    let to = target.strip_cvref();
    let Some(locate) = registry.get(from).and_then(|info| info.locate.as_ref()) else {
        trace!(ty = from.name(), "dynamic cast on a non-polymorphic type");
        return ObjectHandle::null();
    };
    let complete = (locate.0)(handle.addr());
    if complete.is_null() {
        return ObjectHandle::null();
    }
    match upcast(registry, complete.ty(), to, complete.addr()) {
        Some(addr) => ObjectHandle::new(requalify(handle.ty(), to), addr),
        None => {
            trace!(dynamic = complete.ty().name(), to = to.name(), "dynamic type is not a target");
            ObjectHandle::null()
        }
    }
}

/// Check if `derived` reaches `base` through registered edges
pub fn is_derived_from(registry: &TypeRegistry, derived: Type, base: Type) -> bool {
    derived != base && base_path(registry, derived, base).is_some()
}
