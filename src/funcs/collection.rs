//! Collection functions

use super::{int_arg, list_arg, map_arg, register, Arity, FuncError, FuncResult, Registry};
use crate::value::Value;
use indexmap::IndexMap;
use rust_decimal::Decimal;

pub(super) fn register_all(table: &mut Registry) {
    register(table, "chunklist", Arity::Exact(2), chunklist);
    register(table, "coalescelist", Arity::AtLeast(1), coalescelist);
    register(table, "compact", Arity::Exact(1), compact);
    register(table, "concat", Arity::AtLeast(1), concat);
    register(table, "contains", Arity::Exact(2), contains);
    register(table, "distinct", Arity::Exact(1), distinct);
    register(table, "element", Arity::Exact(2), element);
    register(table, "flatten", Arity::Exact(1), flatten);
    register(table, "keys", Arity::Exact(1), keys);
    register(table, "merge", Arity::AtLeast(1), merge);
    register(table, "range", Arity::Between(1, 3), range);
    register(table, "reverse", Arity::Exact(1), reverse);
    register(table, "setintersection", Arity::AtLeast(1), setintersection);
    register(table, "setproduct", Arity::AtLeast(2), setproduct);
    register(table, "setsubtract", Arity::Exact(2), setsubtract);
    register(table, "setunion", Arity::AtLeast(1), setunion);
    register(table, "slice", Arity::Exact(3), slice);
    register(table, "sort", Arity::Exact(1), sort);
    register(table, "values", Arity::Exact(1), values);
    register(table, "zipmap", Arity::Exact(2), zipmap);
}

/// `chunklist(list, size)`: split into chunks of at most `size` elements
fn chunklist(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    let size = int_arg(args, 1)?;
    if size < 1 {
        return Err(FuncError::new("chunk size must be positive"));
    }
    let chunks = items
        .chunks(size as usize)
        .map(|chunk| Value::List(chunk.to_vec()))
        .collect();
    Ok(Value::List(chunks))
}

/// First non-empty list among the arguments
fn coalescelist(args: &[Value]) -> FuncResult {
    for (idx, _) in args.iter().enumerate() {
        let items = list_arg(args, idx)?;
        if !items.is_empty() {
            return Ok(Value::List(items.to_vec()));
        }
    }
    Err(FuncError::new("no non-empty list argument was given"))
}

/// Remove empty strings and nulls from a list of strings
fn compact(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Null => {}
            Value::String(s) if s.is_empty() => {}
            Value::String(_) => out.push(item.clone()),
            other => {
                return Err(FuncError::new(format!(
                    "compact requires a list of strings, found {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(Value::List(out))
}

/// Concatenate lists into one
fn concat(args: &[Value]) -> FuncResult {
    let mut out = Vec::new();
    for (idx, _) in args.iter().enumerate() {
        out.extend(list_arg(args, idx)?.iter().cloned());
    }
    Ok(Value::List(out))
}

fn contains(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    Ok(Value::Bool(items.contains(&args[1])))
}

/// Remove duplicates, keeping the first occurrence of each element
fn distinct(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    Ok(Value::List(dedup(items.iter().cloned())))
}

/// `element(list, index)`: the index wraps around the list length
fn element(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    let index = int_arg(args, 1)?;
    if items.is_empty() {
        return Err(FuncError::new("cannot take an element from an empty list"));
    }
    if index < 0 {
        return Err(FuncError::new("the element index must not be negative"));
    }
    Ok(items[index as usize % items.len()].clone())
}

/// Recursively flatten nested lists
fn flatten(args: &[Value]) -> FuncResult {
    fn walk(items: &[Value], out: &mut Vec<Value>) {
        for item in items {
            match item {
                Value::List(inner) => walk(inner, out),
                other => out.push(other.clone()),
            }
        }
    }
    let items = list_arg(args, 0)?;
    let mut out = Vec::new();
    walk(items, &mut out);
    Ok(Value::List(out))
}

fn keys(args: &[Value]) -> FuncResult {
    let map = map_arg(args, 0)?;
    Ok(Value::List(map.keys().map(|k| Value::from(k.clone())).collect()))
}

fn values(args: &[Value]) -> FuncResult {
    let map = map_arg(args, 0)?;
    Ok(Value::List(map.values().cloned().collect()))
}

/// Merge maps left to right; later entries win
fn merge(args: &[Value]) -> FuncResult {
    let mut out: IndexMap<String, Value> = IndexMap::new();
    for (idx, _) in args.iter().enumerate() {
        for (key, value) in map_arg(args, idx)? {
            out.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Map(out))
}

const RANGE_LIMIT: usize = 1024;

/// `range(end)`, `range(start, end)` or `range(start, end, step)`
fn range(args: &[Value]) -> FuncResult {
    let (start, end, step) = match args.len() {
        1 => (Decimal::ZERO, super::number_arg(args, 0)?, Decimal::ONE),
        2 => (
            super::number_arg(args, 0)?,
            super::number_arg(args, 1)?,
            Decimal::ONE,
        ),
        _ => (
            super::number_arg(args, 0)?,
            super::number_arg(args, 1)?,
            super::number_arg(args, 2)?,
        ),
    };

    if step.is_zero() {
        return Err(FuncError::new("the step must not be zero"));
    }

    let mut out = Vec::new();
    let mut current = start;
    loop {
        let in_range = if step.is_sign_positive() {
            current < end
        } else {
            current > end
        };
        if !in_range {
            break;
        }
        if out.len() >= RANGE_LIMIT {
            return Err(FuncError::new(format!(
                "would produce more than {RANGE_LIMIT} values"
            )));
        }
        out.push(Value::Number(current));
        current += step;
    }
    Ok(Value::List(out))
}

fn reverse(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    Ok(Value::List(items.iter().rev().cloned().collect()))
}

/// `slice(list, start, end)`: half-open range, no clamping
fn slice(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    let start = int_arg(args, 1)?;
    let end = int_arg(args, 2)?;
    if start < 0 || end < start || end as usize > items.len() {
        return Err(FuncError::new("the slice bounds are outside the list"));
    }
    Ok(Value::List(items[start as usize..end as usize].to_vec()))
}

/// Sort a list of strings lexicographically
fn sort(args: &[Value]) -> FuncResult {
    let items = list_arg(args, 0)?;
    let mut strings = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => strings.push(s.clone()),
            other => {
                return Err(FuncError::new(format!(
                    "sort requires a list of strings, found {}",
                    other.type_name()
                )));
            }
        }
    }
    strings.sort();
    Ok(Value::List(strings.into_iter().map(Value::from).collect()))
}

/// `zipmap(keys, values)`: build a map from parallel lists
fn zipmap(args: &[Value]) -> FuncResult {
    let key_list = list_arg(args, 0)?;
    let value_list = list_arg(args, 1)?;
    if key_list.len() != value_list.len() {
        return Err(FuncError::new(
            "the key and value lists must have the same length",
        ));
    }
    let mut out = IndexMap::new();
    for (key, value) in key_list.iter().zip(value_list) {
        let key = match key {
            Value::String(s) => s.clone(),
            other => {
                return Err(FuncError::new(format!(
                    "map keys must be strings, found {}",
                    other.type_name()
                )));
            }
        };
        out.insert(key, value.clone());
    }
    Ok(Value::Map(out))
}

// ============================================================================
// Set operations (lists with set semantics: order kept, duplicates dropped)
// ============================================================================

fn setunion(args: &[Value]) -> FuncResult {
    let mut out = Vec::new();
    for (idx, _) in args.iter().enumerate() {
        for item in list_arg(args, idx)? {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
    }
    Ok(Value::List(out))
}

fn setintersection(args: &[Value]) -> FuncResult {
    let first = list_arg(args, 0)?;
    let mut out = dedup(first.iter().cloned());
    for (idx, _) in args.iter().enumerate().skip(1) {
        let other = list_arg(args, idx)?;
        out.retain(|item| other.contains(item));
    }
    Ok(Value::List(out))
}

fn setsubtract(args: &[Value]) -> FuncResult {
    let left = list_arg(args, 0)?;
    let right = list_arg(args, 1)?;
    let mut out = dedup(left.iter().cloned());
    out.retain(|item| !right.contains(item));
    Ok(Value::List(out))
}

/// Cartesian product of the given lists, as a list of lists
fn setproduct(args: &[Value]) -> FuncResult {
    let mut sets = Vec::with_capacity(args.len());
    for (idx, _) in args.iter().enumerate() {
        sets.push(dedup(list_arg(args, idx)?.iter().cloned()));
    }

    let mut out: Vec<Vec<Value>> = vec![Vec::new()];
    for set in &sets {
        let mut next = Vec::with_capacity(out.len() * set.len());
        for prefix in &out {
            for item in set {
                let mut row = prefix.clone();
                row.push(item.clone());
                next.push(row);
            }
        }
        out = next;
    }

    Ok(Value::List(out.into_iter().map(Value::List).collect()))
}

fn dedup(items: impl Iterator<Item = Value>) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
