//! String functions

use super::{
    int_arg, list_arg, register, string_arg, to_json, Arity, FuncError, FuncResult, Registry,
};
use crate::value::{format_number, Value};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

pub(super) fn register_all(table: &mut Registry) {
    register(table, "chomp", Arity::Exact(1), chomp);
    register(table, "format", Arity::AtLeast(1), format_fn);
    register(table, "formatlist", Arity::AtLeast(1), formatlist);
    register(table, "indent", Arity::Exact(2), indent);
    register(table, "join", Arity::Exact(2), join);
    register(table, "lower", Arity::Exact(1), lower);
    register(table, "upper", Arity::Exact(1), upper);
    register(table, "regex", Arity::Exact(2), regex_fn);
    register(table, "regexall", Arity::Exact(2), regexall);
    register(table, "split", Arity::Exact(2), split);
    register(table, "strrev", Arity::Exact(1), strrev);
    register(table, "substr", Arity::Exact(3), substr);
    register(table, "title", Arity::Exact(1), title);
    register(table, "trim", Arity::Exact(2), trim);
    register(table, "trimprefix", Arity::Exact(2), trimprefix);
    register(table, "trimspace", Arity::Exact(1), trimspace);
    register(table, "trimsuffix", Arity::Exact(2), trimsuffix);
}

static TRAILING_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\r?\n)*\z").unwrap());

fn chomp(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    Ok(Value::from(TRAILING_NEWLINES.replace(&s, "").into_owned()))
}

fn lower(args: &[Value]) -> FuncResult {
    Ok(Value::from(string_arg(args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> FuncResult {
    Ok(Value::from(string_arg(args, 0)?.to_uppercase()))
}

/// `indent(spaces, text)`: pad every line after the first
fn indent(args: &[Value]) -> FuncResult {
    let spaces = int_arg(args, 0)?;
    let text = string_arg(args, 1)?;
    if spaces < 0 {
        return Err(FuncError::new("indent width must not be negative"));
    }
    let pad = " ".repeat(spaces as usize);
    Ok(Value::from(text.replace('\n', &format!("\n{pad}"))))
}

/// `join(separator, list)`
fn join(args: &[Value]) -> FuncResult {
    let sep = string_arg(args, 0)?;
    let items = list_arg(args, 1)?;
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            return Err(FuncError::null());
        }
        parts.push(item.try_string().map_err(|_| {
            FuncError::new(format!("cannot join a {} element", item.type_name()))
        })?);
    }
    Ok(Value::from(parts.join(&sep)))
}

/// `split(separator, string)`; an empty separator splits into characters
fn split(args: &[Value]) -> FuncResult {
    let sep = string_arg(args, 0)?;
    let text = string_arg(args, 1)?;
    let parts: Vec<Value> = if sep.is_empty() {
        text.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        text.split(&sep).map(Value::from).collect()
    };
    Ok(Value::List(parts))
}

fn strrev(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    Ok(Value::from(s.chars().rev().collect::<String>()))
}

/// `substr(string, offset, length)`: character-based; a negative offset
/// counts back from the end, length -1 takes the rest of the string
fn substr(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    let offset = int_arg(args, 1)?;
    let length = int_arg(args, 2)?;

    if length < -1 {
        return Err(FuncError::new("length must not be less than -1"));
    }

    let chars: Vec<char> = s.chars().collect();
    let total = chars.len() as i64;

    let start = if offset < 0 {
        (total + offset).max(0)
    } else {
        offset.min(total)
    } as usize;

    let end = if length == -1 {
        total as usize
    } else {
        (start + length as usize).min(total as usize)
    };

    Ok(Value::from(chars[start..end].iter().collect::<String>()))
}

/// Capitalize the first letter of each word
fn title(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    Ok(Value::from(out))
}

/// `trim(string, cutset)`: remove any leading/trailing characters in cutset
fn trim(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    let cutset: Vec<char> = string_arg(args, 1)?.chars().collect();
    Ok(Value::from(s.trim_matches(|c| cutset.contains(&c))))
}

fn trimprefix(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    let prefix = string_arg(args, 1)?;
    Ok(Value::from(s.strip_prefix(&prefix).unwrap_or(&s)))
}

fn trimsuffix(args: &[Value]) -> FuncResult {
    let s = string_arg(args, 0)?;
    let suffix = string_arg(args, 1)?;
    Ok(Value::from(s.strip_suffix(&suffix).unwrap_or(&s)))
}

fn trimspace(args: &[Value]) -> FuncResult {
    Ok(Value::from(string_arg(args, 0)?.trim()))
}

// ============================================================================
// format / formatlist
// ============================================================================

fn format_fn(args: &[Value]) -> FuncResult {
    let fmt = string_arg(args, 0)?;
    apply_format(&fmt, &args[1..]).map(Value::from)
}

/// `formatlist(fmt, args...)`: list arguments are iterated in lockstep,
/// scalars repeat; produces one formatted string per element
fn formatlist(args: &[Value]) -> FuncResult {
    let fmt = string_arg(args, 0)?;
    let rest = &args[1..];

    let mut len: Option<usize> = None;
    for arg in rest {
        if let Value::List(items) = arg {
            match len {
                None => len = Some(items.len()),
                Some(want) if want != items.len() => {
                    return Err(FuncError::new(
                        "list arguments must all have the same length",
                    ));
                }
                Some(_) => {}
            }
        }
    }

    let len = len.unwrap_or(1);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = rest
            .iter()
            .map(|arg| match arg {
                Value::List(items) => items[i].clone(),
                other => other.clone(),
            })
            .collect();
        out.push(Value::from(apply_format(&fmt, &call_args)?));
    }
    Ok(Value::List(out))
}

/// Minimal printf: `%%`, `%s`, `%d`, `%f`, `%v`, `%q`
fn apply_format(fmt: &str, args: &[Value]) -> Result<String, FuncError> {
    use rust_decimal::prelude::ToPrimitive;

    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(verb) = chars.next() else {
            return Err(FuncError::new("format string ends in a bare %"));
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let arg = args.get(next_arg).ok_or_else(|| {
            FuncError::new(format!("not enough arguments for %{verb} at position {next_arg}"))
        })?;
        next_arg += 1;

        if arg.is_null() && verb != 'v' {
            return Err(FuncError::null());
        }

        match verb {
            's' => out.push_str(&arg.try_string().map_err(|_| {
                FuncError::new(format!("cannot format a {} value with %s", arg.type_name()))
            })?),
            'd' => {
                let n = arg.try_number().map_err(|_| {
                    FuncError::new(format!("cannot format a {} value with %d", arg.type_name()))
                })?;
                if !n.fract().is_zero() {
                    return Err(FuncError::new("%d requires a whole number"));
                }
                out.push_str(&format_number(n));
            }
            'f' => {
                let n = arg.try_number().map_err(|_| {
                    FuncError::new(format!("cannot format a {} value with %f", arg.type_name()))
                })?;
                let f = n.to_f64().ok_or_else(|| FuncError::new("number out of range"))?;
                out.push_str(&format!("{f:.6}"));
            }
            'v' => out.push_str(&verb_v(arg)?),
            'q' => {
                let s = arg.try_string().map_err(|_| {
                    FuncError::new(format!("cannot format a {} value with %q", arg.type_name()))
                })?;
                out.push_str(&serde_json::Value::String(s).to_string());
            }
            other => {
                return Err(FuncError::new(format!("unsupported format verb %{other}")));
            }
        }
    }

    if next_arg < args.len() {
        return Err(FuncError::new(format!(
            "too many arguments: format string consumes {} but {} were given",
            next_arg,
            args.len()
        )));
    }

    Ok(out)
}

/// Default rendering for `%v`: strings raw, collections as JSON
fn verb_v(value: &Value) -> Result<String, FuncError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::String(s) => Ok(s.clone()),
        Value::List(_) | Value::Map(_) => {
            let json = to_json(value)?;
            serde_json::to_string(&json).map_err(|e| FuncError::new(e.to_string()))
        }
        Value::Unknown => Err(FuncError::new("cannot format an unknown value")),
    }
}

// ============================================================================
// regex / regexall
// ============================================================================

fn compile(pattern: &str) -> Result<Regex, FuncError> {
    Regex::new(pattern).map_err(|e| FuncError::new(format!("invalid regex pattern: {e}")))
}

/// `regex(pattern, string)`: first match; errors when nothing matches
fn regex_fn(args: &[Value]) -> FuncResult {
    let pattern = string_arg(args, 0)?;
    let text = string_arg(args, 1)?;
    let re = compile(&pattern)?;
    let caps = re.captures(&text).ok_or_else(|| {
        FuncError::new("pattern did not match any part of the given string")
    })?;
    Ok(capture_value(&re, &caps))
}

/// `regexall(pattern, string)`: list of every match, possibly empty
fn regexall(args: &[Value]) -> FuncResult {
    let pattern = string_arg(args, 0)?;
    let text = string_arg(args, 1)?;
    let re = compile(&pattern)?;
    let matches = re
        .captures_iter(&text)
        .map(|caps| capture_value(&re, &caps))
        .collect();
    Ok(Value::List(matches))
}

/// Shape of one match: the whole match when the pattern has no groups, a map
/// when it has named groups, otherwise a list of the unnamed groups
fn capture_value(re: &Regex, caps: &regex::Captures<'_>) -> Value {
    if re.captures_len() == 1 {
        return Value::from(caps.get(0).map(|m| m.as_str()).unwrap_or(""));
    }

    let named: Vec<&str> = re.capture_names().flatten().collect();
    if !named.is_empty() {
        let mut map = IndexMap::new();
        for name in named {
            let value = caps
                .name(name)
                .map(|m| Value::from(m.as_str()))
                .unwrap_or(Value::Null);
            map.insert(name.to_string(), value);
        }
        Value::Map(map)
    } else {
        let groups = (1..re.captures_len())
            .map(|i| {
                caps.get(i)
                    .map(|m| Value::from(m.as_str()))
                    .unwrap_or(Value::Null)
            })
            .collect();
        Value::List(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> FuncResult {
        (super::super::REGISTRY[name].call)(args)
    }

    #[test]
    fn case_functions() {
        assert_eq!(call("lower", &["BAR".into()]), Ok("bar".into()));
        assert_eq!(call("upper", &["bar".into()]), Ok("BAR".into()));
    }

    #[test]
    fn chomp_strips_trailing_newlines() {
        assert_eq!(call("chomp", &["hello\n".into()]), Ok("hello".into()));
        assert_eq!(call("chomp", &["hello\r\n\r\n".into()]), Ok("hello".into()));
        assert_eq!(call("chomp", &["a\nb".into()]), Ok("a\nb".into()));
    }

    #[test]
    fn join_and_split() {
        let list = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(call("join", &[",".into(), list.clone()]), Ok("a,b".into()));
        assert_eq!(call("split", &[",".into(), "a,b".into()]), Ok(list));
    }

    #[test]
    fn join_converts_numbers() {
        let list = Value::List(vec![Value::from(1), Value::from(2)]);
        assert_eq!(call("join", &["-".into(), list]), Ok("1-2".into()));
    }

    #[test]
    fn substr_offsets() {
        assert_eq!(
            call("substr", &["hello world".into(), 6.into(), 5.into()]),
            Ok("world".into())
        );
        assert_eq!(
            call("substr", &["hello".into(), (-3).into(), (-1).into()]),
            Ok("llo".into())
        );
        assert_eq!(
            call("substr", &["hello".into(), 1.into(), 100.into()]),
            Ok("ello".into())
        );
    }

    #[test]
    fn title_capitalizes_words() {
        assert_eq!(
            call("title", &["hello world".into()]),
            Ok("Hello World".into())
        );
    }

    #[test]
    fn trims() {
        assert_eq!(
            call("trim", &["??hello?".into(), "?".into()]),
            Ok("hello".into())
        );
        assert_eq!(
            call("trimprefix", &["helloworld".into(), "hello".into()]),
            Ok("world".into())
        );
        assert_eq!(
            call("trimsuffix", &["helloworld".into(), "world".into()]),
            Ok("hello".into())
        );
        assert_eq!(call("trimspace", &["  hi \n".into()]), Ok("hi".into()));
    }

    #[test]
    fn indent_pads_following_lines() {
        assert_eq!(
            call("indent", &[2.into(), "a\nb".into()]),
            Ok("a\n  b".into())
        );
    }

    #[test]
    fn format_verbs() {
        assert_eq!(
            call("format", &["%s-%d".into(), "x".into(), 3.into()]),
            Ok("x-3".into())
        );
        assert_eq!(
            call("format", &["100%%".into()]),
            Ok("100%".into())
        );
        assert_eq!(
            call("format", &["%q".into(), "hi".into()]),
            Ok("\"hi\"".into())
        );
        assert_eq!(call("format", &["%v".into(), Value::Null]), Ok("null".into()));
    }

    #[test]
    fn format_argument_count_is_checked() {
        assert!(call("format", &["%s %s".into(), "x".into()]).is_err());
        assert!(call("format", &["%s".into(), "x".into(), "y".into()]).is_err());
    }

    #[test]
    fn formatlist_iterates_lists() {
        let hosts = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(
            call("formatlist", &["%s:%d".into(), hosts, 80.into()]),
            Ok(Value::List(vec!["a:80".into(), "b:80".into()]))
        );
    }

    #[test]
    fn regex_whole_match() {
        assert_eq!(
            call("regex", &["[0-9]+".into(), "abc123def".into()]),
            Ok("123".into())
        );
    }

    #[test]
    fn regex_named_groups_give_a_map() {
        let result = call(
            "regex",
            &["(?P<y>[0-9]{4})-(?P<m>[0-9]{2})".into(), "2023-07".into()],
        )
        .unwrap();
        let Value::Map(map) = result else {
            panic!("expected map");
        };
        assert_eq!(map["y"], "2023".into());
        assert_eq!(map["m"], "07".into());
    }

    #[test]
    fn regex_unnamed_groups_give_a_list() {
        assert_eq!(
            call("regex", &["([a-z]+)([0-9]+)".into(), "ab12".into()]),
            Ok(Value::List(vec!["ab".into(), "12".into()]))
        );
    }

    #[test]
    fn regex_no_match_is_an_error() {
        assert!(call("regex", &["[0-9]".into(), "abc".into()]).is_err());
    }

    #[test]
    fn regexall_collects_matches() {
        assert_eq!(
            call("regexall", &["[0-9]+".into(), "a1b22".into()]),
            Ok(Value::List(vec!["1".into(), "22".into()]))
        );
        assert_eq!(
            call("regexall", &["[0-9]".into(), "abc".into()]),
            Ok(Value::List(vec![]))
        );
    }

    #[test]
    fn strrev_reverses() {
        assert_eq!(call("strrev", &["abc".into()]), Ok("cba".into()));
    }
}
