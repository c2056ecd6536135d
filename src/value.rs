//! Runtime values
//!
//! A closed tagged union in the spirit of HCL's type system. Numbers are
//! arbitrary-precision decimals so arithmetic and rendering never pick up
//! binary-float artifacts. Maps preserve insertion order. `Unknown` stands for
//! a value the caller has promised but not yet produced; it flows through
//! evaluation and only becomes an error if it survives to the final output.

use indexmap::IndexMap;
use rust_decimal::Decimal;

/// A template runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Decimal),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// A placeholder for a value not yet known; infectious through most
    /// operations
    Unknown,
}

/// Conversion failure, span-free; the evaluator attaches the source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    Unconvertible {
        from: &'static str,
        to: &'static str,
    },
    NullNotAllowed,
}

impl Value {
    /// Human-readable name of this value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Unknown => "unknown",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Convert to a string per the interpolation rules
    ///
    /// Strings pass through; bools and numbers render canonically; null is
    /// rejected outright; lists and maps have no automatic string form.
    /// Callers must handle `Unknown` before converting.
    pub fn try_string(&self) -> Result<String, ConvertError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::Null => Err(ConvertError::NullNotAllowed),
            other => Err(ConvertError::Unconvertible {
                from: other.type_name(),
                to: "string",
            }),
        }
    }

    /// Convert to a bool; only bools and the strings "true"/"false" qualify
    pub fn try_bool(&self) -> Result<bool, ConvertError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ConvertError::Unconvertible {
                    from: "string",
                    to: "bool",
                }),
            },
            Value::Null => Err(ConvertError::NullNotAllowed),
            other => Err(ConvertError::Unconvertible {
                from: other.type_name(),
                to: "bool",
            }),
        }
    }

    /// Convert to a number; strings must parse in full
    pub fn try_number(&self) -> Result<Decimal, ConvertError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::String(s) => {
                let trimmed = s.trim();
                let parsed = if trimmed.contains(['e', 'E']) {
                    Decimal::from_scientific(trimmed).ok()
                } else {
                    trimmed.parse::<Decimal>().ok()
                };
                parsed.ok_or(ConvertError::Unconvertible {
                    from: "string",
                    to: "number",
                })
            }
            Value::Null => Err(ConvertError::NullNotAllowed),
            other => Err(ConvertError::Unconvertible {
                from: other.type_name(),
                to: "number",
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// Canonical text form of a number: no trailing fraction zeros, no exponent
pub fn format_number(n: Decimal) -> String {
    n.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn equality_is_type_strict() {
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Bool(true), Value::from("true"));
        assert_eq!(Value::from(1), Value::Number(Decimal::from_f64(1.0).unwrap()));
    }

    #[test]
    fn number_rendering_has_no_artifacts() {
        assert_eq!(format_number(Decimal::from_f64(1.0).unwrap()), "1");
        assert_eq!(format_number(Decimal::from_f64(0.1).unwrap()), "0.1");
        assert_eq!(
            format_number("1.10".parse().unwrap()),
            "1.1"
        );
    }

    #[test]
    fn string_to_number_requires_full_parse() {
        assert_eq!(
            Value::from("12.5").try_number(),
            Ok("12.5".parse().unwrap())
        );
        assert!(Value::from("12abc").try_number().is_err());
        assert!(Value::Bool(true).try_number().is_err());
    }

    #[test]
    fn bool_conversions() {
        assert_eq!(Value::from("true").try_bool(), Ok(true));
        assert_eq!(Value::from("false").try_bool(), Ok(false));
        assert!(Value::from("yes").try_bool().is_err());
        assert_eq!(Value::Null.try_bool(), Err(ConvertError::NullNotAllowed));
    }

    #[test]
    fn string_conversion() {
        assert_eq!(Value::from(42).try_string(), Ok("42".to_string()));
        assert_eq!(Value::Bool(false).try_string(), Ok("false".to_string()));
        assert!(matches!(
            Value::List(vec![]).try_string(),
            Err(ConvertError::Unconvertible { from: "list", .. })
        ));
        assert_eq!(Value::Null.try_string(), Err(ConvertError::NullNotAllowed));
    }
}
