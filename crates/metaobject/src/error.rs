//! Error types for registration and type-name decoding
//!
//! Only *signalled* failures live here. Contract violations (an id/name clash,
//! conflicting layouts for one type) are assertions, and "no match" results
//! at dispatch time are sentinels (`Type::INVALID`, `ObjectHandle::null()`).

/// Result type for registration calls
pub type MetaResult<T> = Result<T, MetaError>;

/// Registration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    /// The target type has not been registered
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A field with this name already exists on the type
    #[error("Duplicate field `{field}` on {ty}")]
    DuplicateField {
        /// Owning type name
        ty: String,
        /// Field name
        field: String,
    },

    /// The field or method named by an attribute call does not exist
    #[error("Unknown member `{member}` on {ty}")]
    UnknownMember {
        /// Owning type name
        ty: String,
        /// Member name
        member: String,
    },

    /// A method overload with the same flag and parameter list already exists
    #[error("Overload of `{method}` on {ty} is indistinguishable from an existing one")]
    IndistinguishableOverload {
        /// Owning type name
        ty: String,
        /// Method name
        method: String,
    },

    /// The base edge is already registered
    #[error("{derived} already derives from {base}")]
    DuplicateBase {
        /// Derived type name
        derived: String,
        /// Base type name
        base: String,
    },

    /// An attribute of this type is already attached to the target
    #[error("Attribute {attr} already attached to {target}")]
    DuplicateAttribute {
        /// Description of the target (type, field or method)
        target: String,
        /// Attribute type name
        attr: String,
    },

    /// A canonical type name failed to decode
    #[error("Invalid type name: {0}")]
    InvalidTypeName(#[from] TypeNameError),
}

/// Errors produced while decoding a canonical type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeNameError {
    /// Nothing to decode
    #[error("empty type name")]
    Empty,

    /// A `{` without a matching `}` (or the reverse)
    #[error("unbalanced braces at byte {0}")]
    Unbalanced(usize),

    /// Expected a specific token
    #[error("expected `{expected}` at byte {at}")]
    Expected {
        /// The missing token
        expected: &'static str,
        /// Byte offset in the input
        at: usize,
    },

    /// Array extent is not a decimal number
    #[error("invalid array extent `{0}`")]
    BadExtent(String),

    /// Input continues after a complete type
    #[error("trailing input at byte {0}")]
    Trailing(usize),
}
