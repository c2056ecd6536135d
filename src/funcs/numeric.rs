//! Numeric functions

use super::{int_arg, number_arg, register, string_arg, Arity, FuncError, FuncResult, Registry};
use crate::value::Value;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

pub(super) fn register_all(table: &mut Registry) {
    register(table, "abs", Arity::Exact(1), abs);
    register(table, "ceil", Arity::Exact(1), ceil);
    register(table, "floor", Arity::Exact(1), floor);
    register(table, "log", Arity::Exact(2), log);
    register(table, "max", Arity::AtLeast(1), max);
    register(table, "min", Arity::AtLeast(1), min);
    register(table, "parseint", Arity::Exact(2), parseint);
    register(table, "pow", Arity::Exact(2), pow);
    register(table, "signum", Arity::Exact(1), signum);
}

fn abs(args: &[Value]) -> FuncResult {
    Ok(Value::Number(number_arg(args, 0)?.abs()))
}

fn ceil(args: &[Value]) -> FuncResult {
    Ok(Value::Number(number_arg(args, 0)?.ceil()))
}

fn floor(args: &[Value]) -> FuncResult {
    Ok(Value::Number(number_arg(args, 0)?.floor()))
}

/// `log(number, base)`, computed in floating point
fn log(args: &[Value]) -> FuncResult {
    let num = to_f64(number_arg(args, 0)?)?;
    let base = to_f64(number_arg(args, 1)?)?;
    if num <= 0.0 || base <= 0.0 {
        return Err(FuncError::new("log arguments must be positive"));
    }
    from_f64(num.ln() / base.ln())
}

fn max(args: &[Value]) -> FuncResult {
    fold_extreme(args, |best, n| n > best)
}

fn min(args: &[Value]) -> FuncResult {
    fold_extreme(args, |best, n| n < best)
}

fn fold_extreme(args: &[Value], better: fn(&Decimal, &Decimal) -> bool) -> FuncResult {
    let mut best = number_arg(args, 0)?;
    for idx in 1..args.len() {
        let n = number_arg(args, idx)?;
        if better(&best, &n) {
            best = n;
        }
    }
    Ok(Value::Number(best))
}

/// `parseint(string, base)` with bases 2 through 36
fn parseint(args: &[Value]) -> FuncResult {
    let text = string_arg(args, 0)?;
    let base = int_arg(args, 1)?;
    if !(2..=36).contains(&base) {
        return Err(FuncError::new("base must be between 2 and 36"));
    }
    let parsed = i64::from_str_radix(text.trim(), base as u32).map_err(|_| {
        FuncError::new(format!("cannot parse {text:?} as an integer in base {base}"))
    })?;
    Ok(Value::from(parsed))
}

/// `pow(base, exponent)`, computed in floating point
fn pow(args: &[Value]) -> FuncResult {
    let base = to_f64(number_arg(args, 0)?)?;
    let exponent = to_f64(number_arg(args, 1)?)?;
    from_f64(base.powf(exponent))
}

fn signum(args: &[Value]) -> FuncResult {
    let n = number_arg(args, 0)?;
    let sign = if n.is_zero() {
        Decimal::ZERO
    } else if n.is_sign_positive() {
        Decimal::ONE
    } else {
        Decimal::NEGATIVE_ONE
    };
    Ok(Value::Number(sign))
}

fn to_f64(n: Decimal) -> Result<f64, FuncError> {
    n.to_f64().ok_or_else(|| FuncError::new("number out of range"))
}

fn from_f64(f: f64) -> FuncResult {
    Decimal::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| FuncError::new("result is out of the representable range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> FuncResult {
        (super::super::REGISTRY[name].call)(args)
    }

    #[test]
    fn rounding() {
        assert_eq!(
            call("ceil", &[Value::Number("1.2".parse().unwrap())]),
            Ok(Value::from(2))
        );
        assert_eq!(
            call("floor", &[Value::Number("1.8".parse().unwrap())]),
            Ok(Value::from(1))
        );
        assert_eq!(call("abs", &[(-3).into()]), Ok(Value::from(3)));
    }

    #[test]
    fn extremes() {
        assert_eq!(call("max", &[1.into(), 5.into(), 3.into()]), Ok(Value::from(5)));
        assert_eq!(call("min", &[1.into(), 5.into(), 3.into()]), Ok(Value::from(1)));
    }

    #[test]
    fn parseint_bases() {
        assert_eq!(call("parseint", &["ff".into(), 16.into()]), Ok(Value::from(255)));
        assert_eq!(call("parseint", &["-10".into(), 2.into()]), Ok(Value::from(-2)));
        assert!(call("parseint", &["zz".into(), 10.into()]).is_err());
        assert!(call("parseint", &["1".into(), 1.into()]).is_err());
    }

    #[test]
    fn pow_and_log() {
        assert_eq!(call("pow", &[2.into(), 10.into()]), Ok(Value::from(1024)));
        // log is computed in floating point, so compare with a tolerance
        let Ok(Value::Number(n)) = call("log", &[8.into(), 2.into()]) else {
            panic!("expected a number");
        };
        assert!((n - Decimal::from(3)).abs() < "0.000001".parse().unwrap());
        assert!(call("log", &[(-1).into(), 2.into()]).is_err());
    }

    #[test]
    fn signum_signs() {
        assert_eq!(call("signum", &[(-9).into()]), Ok(Value::from(-1)));
        assert_eq!(call("signum", &[0.into()]), Ok(Value::from(0)));
        assert_eq!(call("signum", &[7.into()]), Ok(Value::from(1)));
    }

    #[test]
    fn string_arguments_convert() {
        assert_eq!(call("abs", &["-2".into()]), Ok(Value::from(2)));
    }
}
