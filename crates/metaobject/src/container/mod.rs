//! Generic container protocols
//!
//! A container type declares its structural [`Capabilities`] and registers
//! the operation set its shape supports. Callers drive every container the
//! same way, by operation name, whatever the concrete type:
//!
//! ```ignore
//! engine.register_container::<Vec<i32>>()?;
//! let v = engine.bind(ObjectHandle::from_mut(&mut values));
//! v.push_back(ObjectHandle::from_ref(&7));
//! assert_eq!(v.size(), Some(1));
//! ```

mod assoc;
mod sequence;
mod sum;

pub use sum::{SumType, SumTypeTable};

use crate::builder::TypeBuilder;
use crate::capability::Capabilities;
use crate::error::MetaResult;
use crate::ty::Reflect;

pub(crate) use sum::register_sum_type;

/// A type with a generic container protocol
pub trait Container: Reflect + Sized {
    /// Structural capabilities; these decide the [`ContainerKind`](crate::ContainerKind)
    const CAPABILITIES: Capabilities;

    /// Register the operations for this shape
    fn register_operations(builder: &mut TypeBuilder<'_, Self>) -> MetaResult<()>;
}
