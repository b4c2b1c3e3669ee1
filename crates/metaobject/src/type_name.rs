//! Canonical type-name algebra
//!
//! Every type is identified by a canonical string built from a small braced
//! grammar. All qualifier queries and transforms below work on that text
//! alone, with no access to any registry:
//!
//! ```text
//! &{T}   &&{T}                         lvalue / rvalue reference
//! const{T}  volatile{T}  const volatile{T}
//! *{T}                                 pointer
//! [N]{T}  []{T}                        bounded / unbounded array
//! ({A},{B})-{quals}->{R}               function
//! Name<{A},{B}>                        template instance
//! enum{T}  union{T}                    nominal tags
//! ```
//!
//! Transforms return `Cow::Borrowed` when they are a no-op and allocate a new
//! string otherwise.

use std::borrow::Cow;
use std::fmt;

use crate::error::TypeNameError;

const LREF: &str = "&{";
const RREF: &str = "&&{";
const CONST: &str = "const{";
const VOLATILE: &str = "volatile{";
const CONST_VOLATILE: &str = "const volatile{";
const POINTER: &str = "*{";
const ENUM: &str = "enum{";
const UNION: &str = "union{";

/// Canonical name of the unit type
pub const VOID: &str = "void";

const SIGNED: &[&str] = &["i8", "i16", "i32", "i64", "i128", "isize"];
const UNSIGNED: &[&str] = &["u8", "u16", "u32", "u64", "u128", "usize"];
const FLOATS: &[&str] = &["f32", "f64"];

#[inline]
fn wrapped<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() > prefix.len() && s.starts_with(prefix) && s.ends_with('}') {
        Some(&s[prefix.len()..s.len() - 1])
    } else {
        None
    }
}

fn chain<'a>(c: Cow<'a, str>, f: for<'x> fn(&'x str) -> Cow<'x, str>) -> Cow<'a, str> {
    match c {
        Cow::Borrowed(b) => f(b),
        Cow::Owned(o) => Cow::Owned(f(&o).into_owned()),
    }
}

/// Split `{A},{B},...` into `["A", "B", ...]` at brace depth zero
fn split_braced(list: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, b) in list.bytes().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push(&list[start..i]);
                }
            }
            _ => {}
        }
    }
    out
}

/// Split `[N]{T}` into the extent text and `T`
///
/// The brace opened after `]` must close at the last byte, and the extent
/// must be empty or decimal digits.
fn array_parts(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix('[')?;
    let close = rest.find(']')?;
    let digits = &rest[..close];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let body = rest[close + 1..].strip_prefix('{')?;
    let mut depth = 1usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return (i + 1 == body.len() && i > 0).then(|| (digits, &body[..i]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the byte index of the `)` closing a function's parameter list
fn function_close(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b')' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Predicates
// ============================================================================

/// `&{T}` or `&&{T}`
pub fn is_reference(s: &str) -> bool {
    is_lvalue_reference(s) || is_rvalue_reference(s)
}

/// `&{T}`
pub fn is_lvalue_reference(s: &str) -> bool {
    wrapped(s, LREF).is_some()
}

/// `&&{T}`
pub fn is_rvalue_reference(s: &str) -> bool {
    wrapped(s, RREF).is_some()
}

/// Top-level const (an array is const when its elements are)
pub fn is_const(s: &str) -> bool {
    if is_array(s) {
        return is_const(remove_all_extents(s));
    }
    wrapped(s, CONST).is_some() || wrapped(s, CONST_VOLATILE).is_some()
}

/// Top-level volatile (an array is volatile when its elements are)
pub fn is_volatile(s: &str) -> bool {
    if is_array(s) {
        return is_volatile(remove_all_extents(s));
    }
    wrapped(s, VOLATILE).is_some() || wrapped(s, CONST_VOLATILE).is_some()
}

/// Pointer, possibly cv-qualified
pub fn is_pointer(s: &str) -> bool {
    wrapped(remove_cv(s), POINTER).is_some()
}

/// Bounded or unbounded array
pub fn is_array(s: &str) -> bool {
    array_parts(s).is_some()
}

/// `[N]{T}`
pub fn is_bounded_array(s: &str) -> bool {
    is_array(s) && !s.starts_with("[]")
}

/// `[]{T}`
pub fn is_unbounded_array(s: &str) -> bool {
    matches!(array_parts(s), Some(("", _)))
}

/// Function shape `(..)-{..}->{..}`
pub fn is_function(s: &str) -> bool {
    s.starts_with('(') && s.ends_with('}') && s.contains(")-{")
}

/// `enum{T}`, possibly cv-qualified
pub fn is_enum(s: &str) -> bool {
    wrapped(remove_cv(s), ENUM).is_some()
}

/// `union{T}`, possibly cv-qualified
pub fn is_union(s: &str) -> bool {
    wrapped(remove_cv(s), UNION).is_some()
}

/// `Name<...>`, possibly cv-qualified
pub fn is_template(s: &str) -> bool {
    let s = remove_cv(s);
    !s.is_empty()
        && !matches!(s.as_bytes()[0], b'&' | b'*' | b'[' | b'(')
        && s.ends_with('>')
        && s.contains('<')
}

/// The unit type
pub fn is_void(s: &str) -> bool {
    remove_cv(s) == VOID
}

/// `bool`
pub fn is_bool(s: &str) -> bool {
    remove_cv(s) == "bool"
}

/// Integer types, `bool` and `char`
pub fn is_integral(s: &str) -> bool {
    let s = remove_cv(s);
    s == "bool" || s == "char" || SIGNED.contains(&s) || UNSIGNED.contains(&s)
}

/// `f32`, `f64`
pub fn is_floating_point(s: &str) -> bool {
    FLOATS.contains(&remove_cv(s))
}

/// Integral or floating point
pub fn is_arithmetic(s: &str) -> bool {
    is_integral(s) || is_floating_point(s)
}

/// Signed integers and floats
pub fn is_signed(s: &str) -> bool {
    let s = remove_cv(s);
    SIGNED.contains(&s) || FLOATS.contains(&s)
}

/// Unsigned integers, `bool` and `char`
pub fn is_unsigned(s: &str) -> bool {
    let s = remove_cv(s);
    s == "bool" || s == "char" || UNSIGNED.contains(&s)
}

/// Arithmetic or void
pub fn is_fundamental(s: &str) -> bool {
    is_arithmetic(s) || is_void(s)
}

/// Arithmetic, enum or pointer
pub fn is_scalar(s: &str) -> bool {
    is_arithmetic(s) || is_enum(s) || is_pointer(s)
}

/// Number of array dimensions
pub fn rank(s: &str) -> usize {
    let mut n = 0;
    let mut cur = s;
    while is_array(cur) {
        n += 1;
        cur = remove_extent(cur);
    }
    n
}

/// Extent of dimension `dim`, `0` when unbounded or out of range
pub fn extent(s: &str, dim: usize) -> usize {
    let mut cur = s;
    for _ in 0..dim {
        if !is_array(cur) {
            return 0;
        }
        cur = remove_extent(cur);
    }
    match array_parts(cur) {
        Some((digits, _)) => digits.parse().unwrap_or(0),
        None => 0,
    }
}

/// Name part of a template instance (`Vec` for `Vec<{i32}>`)
pub fn template_name(s: &str) -> Option<&str> {
    let s = remove_cv(s);
    if !is_template(s) {
        return None;
    }
    s.find('<').map(|i| &s[..i])
}

/// Argument names of a template instance
pub fn template_args(s: &str) -> Vec<&str> {
    let s = remove_cv(s);
    if !is_template(s) {
        return Vec::new();
    }
    match s.find('<') {
        Some(i) => split_braced(&s[i + 1..s.len() - 1]),
        None => Vec::new(),
    }
}

/// Parameter names of a function type
pub fn function_params(s: &str) -> Vec<&str> {
    if !is_function(s) {
        return Vec::new();
    }
    match function_close(s) {
        Some(close) => split_braced(&s[1..close]),
        None => Vec::new(),
    }
}

/// Return type name of a function type
pub fn function_return(s: &str) -> Option<&str> {
    if !is_function(s) {
        return None;
    }
    let close = function_close(s)?;
    let arrow = s[close..].find("}->{")? + close;
    Some(&s[arrow + 4..s.len() - 1])
}

/// Qualifier text of a function type
pub fn function_qualifiers(s: &str) -> Option<&str> {
    if !is_function(s) {
        return None;
    }
    let close = function_close(s)?;
    let rest = &s[close..];
    let end = rest.find("}->{")?;
    rest.get(3..end)
}

// ============================================================================
// Transforms
// ============================================================================

/// Strip top-level cv qualification (never allocates)
pub fn remove_cv(s: &str) -> &str {
    wrapped(s, CONST_VOLATILE)
        .or_else(|| wrapped(s, CONST))
        .or_else(|| wrapped(s, VOLATILE))
        .unwrap_or(s)
}

/// Rebuild an array around its element after `f` transforms it
fn map_elements<'a>(s: &'a str, f: for<'x> fn(&'x str) -> Cow<'x, str>) -> Cow<'a, str> {
    let elem = remove_extent(s);
    match f(elem) {
        Cow::Borrowed(e) if e.len() == elem.len() => Cow::Borrowed(s),
        e => {
            let head = &s[..s.len() - elem.len() - 1];
            Cow::Owned(format!("{head}{e}}}"))
        }
    }
}

/// Strip top-level const (an array loses const on its elements)
pub fn remove_const(s: &str) -> Cow<'_, str> {
    if is_array(s) {
        return map_elements(s, remove_const);
    }
    if let Some(inner) = wrapped(s, CONST) {
        Cow::Borrowed(inner)
    } else if let Some(inner) = wrapped(s, CONST_VOLATILE) {
        Cow::Owned(format!("{VOLATILE}{inner}}}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Strip top-level volatile (an array loses volatile on its elements)
pub fn remove_volatile(s: &str) -> Cow<'_, str> {
    if is_array(s) {
        return map_elements(s, remove_volatile);
    }
    if let Some(inner) = wrapped(s, VOLATILE) {
        Cow::Borrowed(inner)
    } else if let Some(inner) = wrapped(s, CONST_VOLATILE) {
        Cow::Owned(format!("{CONST}{inner}}}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Strip cv, including cv carried by array elements
pub fn strip_cv(s: &str) -> Cow<'_, str> {
    let top = remove_cv(s);
    if !is_array(top) {
        return Cow::Borrowed(top);
    }
    map_elements(top, strip_cv)
}

/// Strip reference, then cv including array elements
pub fn strip_cvref(s: &str) -> Cow<'_, str> {
    strip_cv(remove_reference(s))
}

/// Strip a reference
pub fn remove_reference(s: &str) -> &str {
    wrapped(s, RREF).or_else(|| wrapped(s, LREF)).unwrap_or(s)
}

/// Strip reference, then cv
pub fn remove_cvref(s: &str) -> &str {
    remove_cv(remove_reference(s))
}

/// Strip a (possibly cv-qualified) pointer
pub fn remove_pointer(s: &str) -> &str {
    wrapped(remove_cv(s), POINTER).unwrap_or(s)
}

/// Strip one array dimension
pub fn remove_extent(s: &str) -> &str {
    array_parts(s).map_or(s, |(_, elem)| elem)
}

/// Strip every array dimension
pub fn remove_all_extents(s: &str) -> &str {
    let mut cur = s;
    while is_array(cur) {
        cur = remove_extent(cur);
    }
    cur
}

fn volatile_inner(s: &str) -> Option<&str> {
    wrapped(s, VOLATILE)
}

fn const_inner(s: &str) -> Option<&str> {
    wrapped(s, CONST)
}

fn add_qualifier<'a>(
    s: &'a str,
    has: fn(&str) -> bool,
    wrap: &str,
    both_from_other: fn(&str) -> Option<&str>,
    recurse: for<'x> fn(&'x str) -> Cow<'x, str>,
) -> Cow<'a, str> {
    if has(s) || is_reference(s) || is_function(s) {
        return Cow::Borrowed(s);
    }
    if is_array(s) {
        return map_elements(s, recurse);
    }
    if let Some(inner) = both_from_other(s) {
        return Cow::Owned(format!("{CONST_VOLATILE}{inner}}}"));
    }
    Cow::Owned(format!("{wrap}{s}}}"))
}

/// Add top-level const; a no-op on references, functions and const types
pub fn add_const(s: &str) -> Cow<'_, str> {
    add_qualifier(s, is_const, CONST, volatile_inner, add_const)
}

/// Add top-level volatile
pub fn add_volatile(s: &str) -> Cow<'_, str> {
    add_qualifier(s, is_volatile, VOLATILE, const_inner, add_volatile)
}

/// Add const and volatile
pub fn add_cv(s: &str) -> Cow<'_, str> {
    chain(add_const(s), add_volatile)
}

/// Add an lvalue reference (`&&{T}` collapses to `&{T}`)
pub fn add_lvalue_reference(s: &str) -> Cow<'_, str> {
    if is_lvalue_reference(s) || is_void(s) {
        Cow::Borrowed(s)
    } else if let Some(inner) = wrapped(s, RREF) {
        Cow::Owned(format!("{LREF}{inner}}}"))
    } else {
        Cow::Owned(format!("{LREF}{s}}}"))
    }
}

/// Add an rvalue reference (references are left unchanged)
pub fn add_rvalue_reference(s: &str) -> Cow<'_, str> {
    if is_reference(s) || is_void(s) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{RREF}{s}}}"))
    }
}

/// `const T&` for `T`
pub fn add_const_lvalue_reference(s: &str) -> Cow<'_, str> {
    chain(add_const(s), add_lvalue_reference)
}

/// `const T&&` for `T`
pub fn add_const_rvalue_reference(s: &str) -> Cow<'_, str> {
    chain(add_const(s), add_rvalue_reference)
}

/// Pointer to `T` (through any reference)
pub fn add_pointer(s: &str) -> Cow<'_, str> {
    Cow::Owned(format!("{POINTER}{}}}", remove_reference(s)))
}

/// Array-to-pointer and function-to-pointer decay, cvref removal otherwise
pub fn decay(s: &str) -> Cow<'_, str> {
    let u = remove_reference(s);
    if is_array(u) {
        Cow::Owned(format!("{POINTER}{}}}", remove_extent(u)))
    } else if is_function(u) {
        Cow::Owned(format!("{POINTER}{u}}}"))
    } else {
        Cow::Borrowed(remove_cv(u))
    }
}

// ============================================================================
// Builders
// ============================================================================

/// `Name<{A},{B}>`
pub fn template<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(name.len() + 2 + args.len() * 8);
    out.push_str(name);
    out.push('<');
    push_list(&mut out, args);
    out.push('>');
    out
}

/// `({A},{B})-{quals}->{R}`
pub fn function<S: AsRef<str>>(params: &[S], qualifiers: &str, ret: &str) -> String {
    let mut out = String::from("(");
    push_list(&mut out, params);
    out.push_str(")-{");
    out.push_str(qualifiers);
    out.push_str("}->{");
    out.push_str(ret);
    out.push('}');
    out
}

/// `[N]{T}` or `[]{T}`
pub fn array(extent: Option<usize>, elem: &str) -> String {
    match extent {
        Some(n) => format!("[{n}]{{{elem}}}"),
        None => format!("[]{{{elem}}}"),
    }
}

/// `enum{T}`
pub fn enumeration(name: &str) -> String {
    format!("{ENUM}{name}}}")
}

/// `union{T}`
pub fn union(name: &str) -> String {
    format!("{UNION}{name}}}")
}

fn push_list<S: AsRef<str>>(out: &mut String, items: &[S]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('{');
        out.push_str(item.as_ref());
        out.push('}');
    }
}

// ============================================================================
// Decoded form
// ============================================================================

/// Decoded tree of a canonical type name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// Plain name (`i32`, `game::Point`)
    Named(String),
    /// Template instance
    Template {
        /// Template name
        name: String,
        /// Arguments in order
        args: Vec<TypeExpr>,
    },
    /// `const{T}`
    Const(Box<TypeExpr>),
    /// `volatile{T}`
    Volatile(Box<TypeExpr>),
    /// `const volatile{T}`
    ConstVolatile(Box<TypeExpr>),
    /// `&{T}`
    LRef(Box<TypeExpr>),
    /// `&&{T}`
    RRef(Box<TypeExpr>),
    /// `*{T}`
    Pointer(Box<TypeExpr>),
    /// `[N]{T}` / `[]{T}`
    Array {
        /// Extent, `None` when unbounded
        extent: Option<usize>,
        /// Element type
        elem: Box<TypeExpr>,
    },
    /// `({A},..)-{quals}->{R}`
    Function {
        /// Parameter types
        params: Vec<TypeExpr>,
        /// Qualifier text (may be empty)
        qualifiers: String,
        /// Return type
        ret: Box<TypeExpr>,
    },
    /// `enum{T}`
    Enum(Box<TypeExpr>),
    /// `union{T}`
    Union(Box<TypeExpr>),
}

impl TypeExpr {
    /// Decode a canonical name
    pub fn parse(s: &str) -> Result<Self, TypeNameError> {
        if s.is_empty() {
            return Err(TypeNameError::Empty);
        }
        let mut p = NameParser { s, pos: 0 };
        let expr = p.parse_type()?;
        if p.pos != s.len() {
            return Err(TypeNameError::Trailing(p.pos));
        }
        Ok(expr)
    }

    /// Encode back into canonical text
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{{{item}}}")?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Template { name, args } => {
                write!(f, "{name}<")?;
                write_list(f, args)?;
                f.write_str(">")
            }
            TypeExpr::Const(t) => write!(f, "{CONST}{t}}}"),
            TypeExpr::Volatile(t) => write!(f, "{VOLATILE}{t}}}"),
            TypeExpr::ConstVolatile(t) => write!(f, "{CONST_VOLATILE}{t}}}"),
            TypeExpr::LRef(t) => write!(f, "{LREF}{t}}}"),
            TypeExpr::RRef(t) => write!(f, "{RREF}{t}}}"),
            TypeExpr::Pointer(t) => write!(f, "{POINTER}{t}}}"),
            TypeExpr::Array { extent, elem } => match extent {
                Some(n) => write!(f, "[{n}]{{{elem}}}"),
                None => write!(f, "[]{{{elem}}}"),
            },
            TypeExpr::Function {
                params,
                qualifiers,
                ret,
            } => {
                f.write_str("(")?;
                write_list(f, params)?;
                write!(f, ")-{{{qualifiers}}}->{{{ret}}}")
            }
            TypeExpr::Enum(t) => write!(f, "{ENUM}{t}}}"),
            TypeExpr::Union(t) => write!(f, "{UNION}{t}}}"),
        }
    }
}

struct NameParser<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> NameParser<'a> {
    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.rest().starts_with(tok) {
            self.pos += tok.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &'static str) -> Result<(), TypeNameError> {
        if self.eat(tok) {
            Ok(())
        } else if self.pos >= self.s.len() && tok == "}" {
            Err(TypeNameError::Unbalanced(self.pos))
        } else {
            Err(TypeNameError::Expected {
                expected: tok,
                at: self.pos,
            })
        }
    }

    /// Parse `T}` after an already consumed `prefix{`
    fn wrapped(&mut self) -> Result<Box<TypeExpr>, TypeNameError> {
        let inner = self.parse_type()?;
        self.expect("}")?;
        Ok(Box::new(inner))
    }

    fn braced_list(&mut self, close: &'static str) -> Result<Vec<TypeExpr>, TypeNameError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            self.expect("{")?;
            items.push(self.parse_type()?);
            self.expect("}")?;
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, TypeNameError> {
        if self.eat(RREF) {
            return Ok(TypeExpr::RRef(self.wrapped()?));
        }
        if self.eat(LREF) {
            return Ok(TypeExpr::LRef(self.wrapped()?));
        }
        if self.eat(CONST_VOLATILE) {
            return Ok(TypeExpr::ConstVolatile(self.wrapped()?));
        }
        if self.eat(CONST) {
            return Ok(TypeExpr::Const(self.wrapped()?));
        }
        if self.eat(VOLATILE) {
            return Ok(TypeExpr::Volatile(self.wrapped()?));
        }
        if self.eat(POINTER) {
            return Ok(TypeExpr::Pointer(self.wrapped()?));
        }
        if self.eat(ENUM) {
            return Ok(TypeExpr::Enum(self.wrapped()?));
        }
        if self.eat(UNION) {
            return Ok(TypeExpr::Union(self.wrapped()?));
        }
        if self.eat("[") {
            let start = self.pos;
            let close = self.rest().find(']').ok_or(TypeNameError::Expected {
                expected: "]",
                at: self.pos,
            })?;
            let digits = &self.s[start..start + close];
            self.pos = start + close + 1;
            let extent = if digits.is_empty() {
                None
            } else {
                Some(
                    digits
                        .parse()
                        .map_err(|_| TypeNameError::BadExtent(digits.to_string()))?,
                )
            };
            self.expect("{")?;
            let elem = self.wrapped()?;
            return Ok(TypeExpr::Array { extent, elem });
        }
        if self.eat("(") {
            let params = self.braced_list(")")?;
            self.expect("-{")?;
            let start = self.pos;
            let end = self.rest().find('}').ok_or(TypeNameError::Unbalanced(self.pos))?;
            let qualifiers = self.s[start..start + end].to_string();
            self.pos = start + end;
            self.expect("}->{")?;
            let ret = self.wrapped()?;
            return Ok(TypeExpr::Function {
                params,
                qualifiers,
                ret,
            });
        }

        let start = self.pos;
        let len = self
            .rest()
            .find(|c| matches!(c, '{' | '}' | '<' | '>' | ','))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(TypeNameError::Expected {
                expected: "name",
                at: self.pos,
            });
        }
        self.pos += len;
        let name = self.s[start..start + len].to_string();
        if self.eat("<") {
            let args = self.braced_list(">")?;
            return Ok(TypeExpr::Template { name, args });
        }
        Ok(TypeExpr::Named(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_predicates() {
        assert!(is_lvalue_reference("&{i32}"));
        assert!(!is_lvalue_reference("&&{i32}"));
        assert!(is_rvalue_reference("&&{i32}"));
        assert!(is_reference("&{const{i32}}"));
        assert!(!is_reference("i32"));
    }

    #[test]
    fn test_cv_predicates() {
        assert!(is_const("const{i32}"));
        assert!(is_const("const volatile{i32}"));
        assert!(!is_const("volatile{i32}"));
        assert!(is_volatile("const volatile{i32}"));
        assert!(!is_const("constant"));
    }

    #[test]
    fn test_arithmetic_predicates() {
        assert!(is_arithmetic("const{f64}"));
        assert!(is_integral("bool"));
        assert!(is_signed("i64"));
        assert!(is_unsigned("usize"));
        assert!(!is_arithmetic("String"));
        assert!(is_fundamental("void"));
        assert!(is_scalar("*{String}"));
        assert!(is_scalar("enum{Color}"));
    }

    #[test]
    fn test_array_rank_and_extent() {
        let s = "[3]{[4]{i32}}";
        assert!(is_bounded_array(s));
        assert_eq!(rank(s), 2);
        assert_eq!(extent(s, 0), 3);
        assert_eq!(extent(s, 1), 4);
        assert_eq!(extent(s, 2), 0);
        assert_eq!(remove_all_extents(s), "i32");
        assert!(is_unbounded_array("[]{u8}"));
        assert_eq!(extent("[]{u8}", 0), 0);
    }

    #[test]
    fn test_add_const_is_idempotent() {
        let once = add_const("i32");
        assert_eq!(once, "const{i32}");
        let twice = add_const(&once);
        assert!(matches!(twice, Cow::Borrowed(_)));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_add_const_special_cases() {
        assert_eq!(add_const("volatile{i32}"), "const volatile{i32}");
        assert!(matches!(add_const("&{i32}"), Cow::Borrowed(_)));
        assert_eq!(add_const("[2]{i32}"), "[2]{const{i32}}");
        assert!(matches!(add_const("[2]{const{i32}}"), Cow::Borrowed(_)));
        assert_eq!(add_cv("i32"), "const volatile{i32}");
    }

    #[test]
    fn test_remove_qualifiers() {
        assert_eq!(remove_const("const{i32}"), "i32");
        assert_eq!(remove_const("const volatile{i32}"), "volatile{i32}");
        assert_eq!(remove_volatile("const volatile{i32}"), "const{i32}");
        assert_eq!(remove_cvref("&{const{i32}}"), "i32");
        assert_eq!(remove_pointer("const{*{i32}}"), "i32");
    }

    #[test]
    fn test_reference_collapsing() {
        assert_eq!(add_lvalue_reference("&&{i32}"), "&{i32}");
        assert!(matches!(add_rvalue_reference("&{i32}"), Cow::Borrowed(_)));
        assert_eq!(add_rvalue_reference("i32"), "&&{i32}");
        assert!(matches!(add_lvalue_reference("void"), Cow::Borrowed(_)));
        assert_eq!(add_const_lvalue_reference("i32"), "&{const{i32}}");
    }

    #[test]
    fn test_decay() {
        assert_eq!(decay("&{[4]{i32}}"), "*{i32}");
        assert_eq!(decay("const{i32}"), "i32");
        assert_eq!(decay("({i32})-{}->{void}"), "*{({i32})-{}->{void}}");
    }

    #[test]
    fn test_template_and_function_parts() {
        let t = template("HashMap", &["String", "Vec<{i32}>"]);
        assert_eq!(t, "HashMap<{String},{Vec<{i32}>}>");
        assert_eq!(template_name(&t), Some("HashMap"));
        assert_eq!(template_args(&t), vec!["String", "Vec<{i32}>"]);

        let f = function(&["&{const{i32}}", "f64"], "", "bool");
        assert_eq!(f, "({&{const{i32}}},{f64})-{}->{bool}");
        assert!(is_function(&f));
        assert_eq!(function_params(&f), vec!["&{const{i32}}", "f64"]);
        assert_eq!(function_return(&f), Some("bool"));
        assert_eq!(function_qualifiers(&f), Some(""));
    }

    #[test]
    fn test_parse_roundtrip() {
        for s in [
            "i32",
            "&{const{Vec<{String}>}}",
            "[3]{*{volatile{u8}}}",
            "({i32},{&&{f64}})-{const &}->{void}",
            "HashMap<{String},{[]{i32}}>",
            "enum{Color}",
            "const volatile{union{Bits}}",
        ] {
            let expr = TypeExpr::parse(s).unwrap();
            assert_eq!(expr.encode(), s);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TypeExpr::parse(""), Err(TypeNameError::Empty));
        assert!(matches!(
            TypeExpr::parse("const{i32"),
            Err(TypeNameError::Unbalanced(_))
        ));
        assert!(matches!(
            TypeExpr::parse("[x]{i32}"),
            Err(TypeNameError::BadExtent(_))
        ));
        assert!(matches!(
            TypeExpr::parse("i32}"),
            Err(TypeNameError::Trailing(3))
        ));
    }

    #[test]
    fn test_array_cv_lives_on_elements() {
        let c = add_const("[3]{i32}");
        assert_eq!(c, "[3]{const{i32}}");
        assert!(is_const(&c));
        assert_eq!(add_const(&c), c);
        assert_eq!(strip_cv(&c), "[3]{i32}");
        assert_eq!(strip_cvref("&{[2]{[3]{const{u8}}}}"), "[2]{[3]{u8}}");
        assert!(matches!(strip_cv("[3]{i32}"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_remove_cv_on_arrays_matches_predicates() {
        let c = "[3]{const{i32}}";
        assert!(is_const(c));
        assert_eq!(remove_const(c), "[3]{i32}");
        assert!(!is_const(&remove_const(c)));
        assert_eq!(remove_const("[2]{[3]{const volatile{u8}}}"), "[2]{[3]{volatile{u8}}}");
        assert_eq!(remove_volatile("[2]{volatile{u8}}"), "[2]{u8}");
        assert!(matches!(remove_const("[2]{u8}"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_malformed_arrays_are_not_arrays() {
        for s in ["[3]{i32", "[3]{i32}x", "[3]{a}{b}", "[x]{i32}", "[3]{}", "[3]i32}", "[3"] {
            assert!(!is_array(s), "{s}");
            assert_eq!(rank(s), 0);
            assert_eq!(remove_extent(s), s);
            assert_eq!(remove_all_extents(s), s);
            assert!(!is_const(s));
            assert!(!is_volatile(s));
            assert_eq!(strip_cv(s), s);
        }
        assert_eq!(rank("[2]{[3]{i32}"), 0);
        assert_eq!(rank("[2]{[3]{i32}x}"), 1);
    }
}
