//! Built-in function library
//!
//! A fixed registry of pure functions over [`Value`]s, initialized once into
//! an immutable process-wide table. Each entry declares its arity; the
//! evaluator checks name and argument count before calling, and maps
//! [`FuncError`] onto a spanned error at the call site.

use crate::value::Value;
use indexmap::IndexMap;
use std::sync::LazyLock;

mod collection;
mod encoding;
mod numeric;
mod string;

pub(crate) use encoding::to_json;

/// Error raised inside a built-in function; carries no span, the evaluator
/// attaches the call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncError {
    pub message: String,
}

impl FuncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn null() -> Self {
        Self::new("argument must not be null")
    }
}

pub type FuncResult = Result<Value, FuncError>;

/// Declared argument count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(want) => n == want,
            Arity::AtLeast(min) => n >= min,
            Arity::Between(min, max) => n >= min && n <= max,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Arity::Exact(want) => want.to_string(),
            Arity::AtLeast(min) => format!("at least {min}"),
            Arity::Between(min, max) => format!("between {min} and {max}"),
        }
    }
}

/// A registered built-in
pub struct Function {
    pub name: &'static str,
    pub arity: Arity,
    pub call: fn(&[Value]) -> FuncResult,
}

pub(crate) type Registry = IndexMap<&'static str, Function>;

pub(crate) fn register(
    table: &mut Registry,
    name: &'static str,
    arity: Arity,
    call: fn(&[Value]) -> FuncResult,
) {
    table.insert(name, Function { name, arity, call });
}

/// The function table, built once on first use
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let mut table = Registry::new();
    string::register_all(&mut table);
    collection::register_all(&mut table);
    numeric::register_all(&mut table);
    encoding::register_all(&mut table);
    table
});

// ============================================================================
// Typed argument helpers
// ============================================================================

pub(crate) fn string_arg(args: &[Value], idx: usize) -> Result<String, FuncError> {
    let value = &args[idx];
    if value.is_null() {
        return Err(FuncError::null());
    }
    value.try_string().map_err(|_| {
        FuncError::new(format!(
            "argument {} must be a string, got {}",
            idx + 1,
            value.type_name()
        ))
    })
}

pub(crate) fn number_arg(
    args: &[Value],
    idx: usize,
) -> Result<rust_decimal::Decimal, FuncError> {
    let value = &args[idx];
    if value.is_null() {
        return Err(FuncError::null());
    }
    value.try_number().map_err(|_| {
        FuncError::new(format!(
            "argument {} must be a number, got {}",
            idx + 1,
            value.type_name()
        ))
    })
}

pub(crate) fn int_arg(args: &[Value], idx: usize) -> Result<i64, FuncError> {
    use rust_decimal::prelude::ToPrimitive;
    let n = number_arg(args, idx)?;
    if !n.fract().is_zero() {
        return Err(FuncError::new(format!(
            "argument {} must be a whole number",
            idx + 1
        )));
    }
    n.to_i64()
        .ok_or_else(|| FuncError::new(format!("argument {} is out of range", idx + 1)))
}

pub(crate) fn list_arg(args: &[Value], idx: usize) -> Result<&[Value], FuncError> {
    match &args[idx] {
        Value::List(items) => Ok(items),
        Value::Null => Err(FuncError::null()),
        other => Err(FuncError::new(format!(
            "argument {} must be a list, got {}",
            idx + 1,
            other.type_name()
        ))),
    }
}

pub(crate) fn map_arg(
    args: &[Value],
    idx: usize,
) -> Result<&IndexMap<String, Value>, FuncError> {
    match &args[idx] {
        Value::Map(map) => Ok(map),
        Value::Null => Err(FuncError::null()),
        other => Err(FuncError::new(format!(
            "argument {} must be a map, got {}",
            idx + 1,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_required_functions() {
        for name in [
            "lower", "upper", "join", "split", "format", "substr", "concat", "merge", "keys",
            "values", "range", "sort", "abs", "ceil", "floor", "pow", "parseint", "jsonencode",
            "jsondecode", "yamlencode", "yamldecode", "csvdecode", "regex", "regexall",
        ] {
            assert!(REGISTRY.contains_key(name), "missing function {name}");
        }
    }

    #[test]
    fn try_and_can_are_not_registry_entries() {
        // guarded evaluation is handled by the evaluator itself
        assert!(!REGISTRY.contains_key("try"));
        assert!(!REGISTRY.contains_key("can"));
    }

    #[test]
    fn arity_accepts() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(Arity::Between(1, 3).accepts(3));
        assert!(!Arity::Between(1, 3).accepts(4));
        assert_eq!(Arity::AtLeast(1).describe(), "at least 1");
    }

    #[test]
    fn null_args_are_rejected() {
        let err = string_arg(&[Value::Null], 0).unwrap_err();
        assert_eq!(err.message, "argument must not be null");
    }
}
