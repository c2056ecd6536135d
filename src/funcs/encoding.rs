//! Encoding functions: JSON, YAML and CSV

use super::{register, string_arg, Arity, FuncError, FuncResult, Registry};
use crate::value::Value;
use indexmap::IndexMap;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

pub(super) fn register_all(table: &mut Registry) {
    register(table, "csvdecode", Arity::Exact(1), csvdecode);
    register(table, "jsondecode", Arity::Exact(1), jsondecode);
    register(table, "jsonencode", Arity::Exact(1), jsonencode);
    register(table, "yamldecode", Arity::Exact(1), yamldecode);
    register(table, "yamlencode", Arity::Exact(1), yamlencode);
}

/// Bridge into the serde data model, shared by the JSON and YAML encoders
pub(crate) fn to_json(value: &Value) -> Result<serde_json::Value, FuncError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(decimal_to_json_number(*n)?),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), to_json(item)?);
            }
            serde_json::Value::Object(out)
        }
        Value::Unknown => return Err(FuncError::new("cannot encode an unknown value")),
    })
}

fn decimal_to_json_number(n: Decimal) -> Result<serde_json::Number, FuncError> {
    if n.fract().is_zero() {
        if let Some(i) = n.to_i64() {
            return Ok(serde_json::Number::from(i));
        }
    }
    n.to_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| FuncError::new("number cannot be encoded"))
}

fn from_json(value: serde_json::Value) -> Result<Value, FuncError> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(json_number_to_decimal(&n)?),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json(item)?);
            }
            Value::List(out)
        }
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key, from_json(item)?);
            }
            Value::Map(out)
        }
    })
}

fn json_number_to_decimal(n: &serde_json::Number) -> Result<Decimal, FuncError> {
    if let Some(i) = n.as_i64() {
        return Ok(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Decimal::from(u));
    }
    n.as_f64()
        .and_then(Decimal::from_f64)
        .ok_or_else(|| FuncError::new(format!("number {n} cannot be represented")))
}

fn jsonencode(args: &[Value]) -> FuncResult {
    let json = to_json(&args[0])?;
    let text = serde_json::to_string(&json).map_err(|e| FuncError::new(e.to_string()))?;
    Ok(Value::from(text))
}

fn jsondecode(args: &[Value]) -> FuncResult {
    let text = string_arg(args, 0)?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| FuncError::new(format!("invalid JSON: {e}")))?;
    from_json(json)
}

fn yamlencode(args: &[Value]) -> FuncResult {
    let json = to_json(&args[0])?;
    let text = serde_yaml::to_string(&json).map_err(|e| FuncError::new(e.to_string()))?;
    Ok(Value::from(text))
}

fn yamldecode(args: &[Value]) -> FuncResult {
    let text = string_arg(args, 0)?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&text)
        .map_err(|e| FuncError::new(format!("invalid YAML: {e}")))?;
    from_yaml(yaml)
}

fn from_yaml(value: serde_yaml::Value) -> Result<Value, FuncError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            let decimal = if let Some(i) = n.as_i64() {
                Decimal::from(i)
            } else if let Some(u) = n.as_u64() {
                Decimal::from(u)
            } else {
                n.as_f64()
                    .and_then(Decimal::from_f64)
                    .ok_or_else(|| FuncError::new(format!("number {n} cannot be represented")))?
            };
            Value::Number(decimal)
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_yaml(item)?);
            }
            Value::List(out)
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                let serde_yaml::Value::String(key) = key else {
                    return Err(FuncError::new("YAML mapping keys must be strings"));
                };
                out.insert(key, from_yaml(item)?);
            }
            Value::Map(out)
        }
        serde_yaml::Value::Tagged(_) => {
            return Err(FuncError::new("YAML tags are not supported"));
        }
    })
}

/// `csvdecode(string)`: the first row is the header, every following row
/// becomes a map keyed by it
fn csvdecode(args: &[Value]) -> FuncResult {
    let text = string_arg(args, 0)?;
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FuncError::new(format!("invalid CSV: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FuncError::new(format!("invalid CSV: {e}")))?;
        let mut row = IndexMap::with_capacity(headers.len());
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), Value::from(field));
        }
        rows.push(Value::Map(row));
    }
    Ok(Value::List(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> FuncResult {
        (super::super::REGISTRY[name].call)(args)
    }

    #[test]
    fn json_round_trip() {
        let decoded = call("jsondecode", &[r#"{"a":[1,true,"x"]}"#.into()]).unwrap();
        let Value::Map(map) = &decoded else {
            panic!("expected map");
        };
        assert_eq!(
            map["a"],
            Value::List(vec![Value::from(1), Value::Bool(true), "x".into()])
        );
        assert_eq!(
            call("jsonencode", &[decoded]),
            Ok(r#"{"a":[1,true,"x"]}"#.into())
        );
    }

    #[test]
    fn jsonencode_scalars() {
        assert_eq!(call("jsonencode", &[Value::Null]), Ok("null".into()));
        assert_eq!(call("jsonencode", &["hi".into()]), Ok("\"hi\"".into()));
    }

    #[test]
    fn jsondecode_rejects_garbage() {
        assert!(call("jsondecode", &["{not json".into()]).is_err());
    }

    #[test]
    fn yaml_decode() {
        let decoded = call("yamldecode", &["a: 1\nb:\n  - x\n  - y\n".into()]).unwrap();
        let Value::Map(map) = decoded else {
            panic!("expected map");
        };
        assert_eq!(map["a"], Value::from(1));
        assert_eq!(map["b"], Value::List(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn yaml_encode_has_trailing_newline() {
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::from(1));
        assert_eq!(call("yamlencode", &[Value::Map(map)]), Ok("a: 1\n".into()));
    }

    #[test]
    fn csvdecode_headers_become_keys() {
        let decoded = call("csvdecode", &["a,b\n1,2\n3,4\n".into()]).unwrap();
        let Value::List(rows) = decoded else {
            panic!("expected list");
        };
        assert_eq!(rows.len(), 2);
        let Value::Map(first) = &rows[0] else {
            panic!("expected map row");
        };
        assert_eq!(first["a"], "1".into());
        assert_eq!(first["b"], "2".into());
    }

    #[test]
    fn csvdecode_rejects_ragged_rows() {
        assert!(call("csvdecode", &["a,b\n1\n".into()]).is_err());
    }

    #[test]
    fn unknown_values_cannot_be_encoded() {
        assert!(call("jsonencode", &[Value::Unknown]).is_err());
    }
}
