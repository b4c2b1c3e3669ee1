//! Metaobject Runtime Reflection
//!
//! This crate describes native types at run time and drives them through
//! their descriptions:
//! - **Identity**: interned names and canonical type names (`ty`, `type_name`)
//! - **Descriptors**: fields, methods, bases and attributes (`field`, `method`, `base`, `attr`)
//! - **Dispatch**: overload ranking, member lookup and casts (`dispatch`, `engine`)
//! - **Containers**: a generic protocol over sequences, sets, maps and sum types (`container`)
//!
//! # Example
//!
//! ```rust,ignore
//! use metaobject::{field_of, reflect_type, type_of, Engine, ObjectHandle};
//!
//! #[derive(Default)]
//! struct Point { x: i32, y: f64 }
//! reflect_type!(Point);
//!
//! let engine = Engine::new();
//! engine
//!     .register::<Point>()
//!     .field("x", field_of!(Point, x))?
//!     .field("y", field_of!(Point, y))?
//!     .method("norm", |p: &Point| (p.x as f64).hypot(p.y))?
//!     .default_constructor()?;
//!
//! let mut p = Point { x: 3, y: 4.0 };
//! let h = ObjectHandle::from_mut(&mut p);
//! assert_eq!(engine.var(h, "x").ty(), type_of::<i32>().add_lvalue_reference());
//! assert_eq!(engine.call(h, "norm", ()).read::<f64>(), Some(5.0));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]
#![allow(clippy::missing_safety_doc)]

// ============================================================================
// Identity
// ============================================================================

/// Name hashing and interning
pub mod ident;

/// Name and type-id registries
pub mod names;

/// Canonical type-name algebra
pub mod type_name;

/// `Type`, `Name` and the `Reflect` trait
pub mod ty;

// ============================================================================
// Descriptors
// ============================================================================

/// Type attributes
pub mod attr;

/// Base-class edges and dynamic type headers
pub mod base;

/// Structural capabilities and container kinds
pub mod capability;

/// Field descriptors
pub mod field;

/// Object handles and owned results
pub mod handle;

/// Method descriptors
pub mod method;

/// Operator method names
pub mod ops;

/// Native parameter binding and closure adapters
pub mod param;

/// The type registry
pub mod registry;

/// Memory resources
pub mod resource;

// ============================================================================
// Engine
// ============================================================================

/// Handles bound to an engine
pub mod bound;

/// Typed registration
pub mod builder;

mod builtins;

/// Generic container protocols
pub mod container;

/// Overload resolution and casts
pub mod dispatch;

/// The reflection engine
pub mod engine;

/// Error types
pub mod error;

/// Engine options
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use attr::{Attr, AttrSet};
pub use base::{BaseEdge, EdgeKind, Polymorphic, TypeHeader};
pub use bound::BoundHandle;
pub use builder::TypeBuilder;
pub use capability::{Capabilities, ContainerKind};
pub use container::{Container, SumType, SumTypeTable};
pub use engine::{Engine, FieldSummary, MethodSummary};
pub use error::{MetaError, MetaResult, TypeNameError};
pub use field::{FieldDescriptor, FieldMode};
pub use handle::{ObjectHandle, OwningHandle, SharedBuffer};
pub use method::{MethodDescriptor, MethodFlag, ResultKind, ResultSpec};
pub use ops::Operator;
pub use options::{EngineOptions, ResultMemory};
pub use param::{IntoArgs, Move, Mut, Param, Ref, Val};
pub use registry::{TypeInfo, TypeLayout};
pub use resource::{MemoryResource, ResourceRef, ScratchArena, SystemResource};
pub use ty::{type_of, Name, Reflect, Type};
