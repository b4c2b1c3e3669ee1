//! Operator and lifecycle method names
//!
//! Operators are ordinary methods under mangled names, so they take part in
//! overload resolution like any other method.

use std::fmt;

/// Constructor method name
pub const CTOR: &str = "__ctor";

/// Destructor method name
pub const DTOR: &str = "__dtor";

/// Overloadable operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a % b`
    Rem,
    /// `-a`
    Neg,
    /// `a == b`
    Eq,
    /// `a != b`
    Ne,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
    /// `a[i]`
    Index,
    /// `a(args...)`
    Call,
}

impl Operator {
    /// Every operator
    pub const ALL: [Operator; 14] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Rem,
        Operator::Neg,
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Index,
        Operator::Call,
    ];

    /// Mangled method name
    pub const fn method_name(self) -> &'static str {
        match self {
            Operator::Add => "__add",
            Operator::Sub => "__sub",
            Operator::Mul => "__mul",
            Operator::Div => "__div",
            Operator::Rem => "__rem",
            Operator::Neg => "__neg",
            Operator::Eq => "__eq",
            Operator::Ne => "__ne",
            Operator::Lt => "__lt",
            Operator::Le => "__le",
            Operator::Gt => "__gt",
            Operator::Ge => "__ge",
            Operator::Index => "__index",
            Operator::Call => "__call",
        }
    }

    /// Source-level symbol
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub | Operator::Neg => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Index => "[]",
            Operator::Call => "()",
        }
    }

    /// Number of operands besides the receiver, when fixed
    pub const fn operands(self) -> Option<usize> {
        match self {
            Operator::Neg => Some(0),
            Operator::Call => None,
            _ => Some(1),
        }
    }

    /// Parse a mangled method name
    pub fn from_method_name(name: &str) -> Option<Operator> {
        Self::ALL.into_iter().find(|op| op.method_name() == name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
