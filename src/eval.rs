//! Expression evaluation
//!
//! Walks the expression tree against an [`Environment`] of variable scopes
//! plus the shared function table. Unknown values flow through most
//! operations; the exceptions are `&&` with a known-false operand, `||` with
//! a known-true operand, and the guarded forms `try`/`can`.

use crate::ast::*;
use crate::error::{Error, Result, TemplateSource};
use crate::funcs::REGISTRY;
use crate::value::{ConvertError, Value};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Variable bindings, innermost scope last
///
/// Loop directives and comprehensions push a scope for their bindings and pop
/// it when done; lookups search from the innermost scope outwards.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<IndexMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![IndexMap::new()],
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.scopes
            .last_mut()
            .expect("environment always has a scope")
            .insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// One iteration element of a loop or comprehension
pub(crate) struct LoopItem {
    /// What a single-name target binds: list element, or map key
    pub single: Value,
    /// First name of a pair target: list index, or map key
    pub key: Value,
    /// Second name of a pair target: the element or entry value
    pub value: Value,
}

/// Expand an iterable into loop items, in order
pub(crate) fn loop_items(
    value: &Value,
    span: Span,
    source: &TemplateSource,
) -> Result<Vec<LoopItem>> {
    match value {
        Value::List(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| LoopItem {
                single: item.clone(),
                key: Value::Number(Decimal::from(i as i64)),
                value: item.clone(),
            })
            .collect()),
        Value::Map(map) => Ok(map
            .iter()
            .map(|(k, v)| LoopItem {
                single: Value::from(k.clone()),
                key: Value::from(k.clone()),
                value: v.clone(),
            })
            .collect()),
        other => Err(Error::NotIterable {
            type_name: other.type_name(),
            span,
            src: source.named_source(),
        }),
    }
}

/// Bind a loop target in the current (innermost) scope
pub(crate) fn bind_target(env: &mut Environment, target: &Target, item: &LoopItem) {
    match target {
        Target::Single(name) => env.set(name.name.clone(), item.single.clone()),
        Target::Pair(first, second) => {
            env.set(first.name.clone(), item.key.clone());
            env.set(second.name.clone(), item.value.clone());
        }
    }
}

/// Expression evaluator
pub struct Evaluator<'a> {
    env: &'a mut Environment,
    source: &'a TemplateSource,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a mut Environment, source: &'a TemplateSource) -> Self {
        Self { env, source }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => self.eval_literal(lit),
            Expr::Var(ident) => self
                .env
                .get(&ident.name)
                .cloned()
                .ok_or_else(|| Error::UndefinedVariable {
                    name: ident.name.clone(),
                    span: ident.span,
                    src: self.source.named_source(),
                }),
            Expr::Unary(e) => self.eval_unary(e),
            Expr::Binary(e) => self.eval_binary(e),
            Expr::Conditional(e) => self.eval_conditional(e),
            Expr::Index(e) => self.eval_index(e),
            Expr::Attr(e) => self.eval_attr(e),
            Expr::Call(e) => self.eval_call(e),
            Expr::ForList(e) => self.eval_for_list(e),
            Expr::ForObject(e) => self.eval_for_object(e),
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> Result<Value> {
        match lit {
            Literal::Null(_) => Ok(Value::Null),
            Literal::Bool(b, _) => Ok(Value::Bool(*b)),
            Literal::Number(n, _) => Ok(Value::Number(*n)),
            Literal::String(s, _) => Ok(Value::String(s.clone())),
            Literal::List(elements, _) => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    out.push(self.eval(element)?);
                }
                Ok(Value::List(out))
            }
            Literal::Object(entries, _) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.eval(key_expr)?;
                    if key.is_unknown() {
                        return Ok(Value::Unknown);
                    }
                    let key = self.to_string(&key, key_expr.span())?;
                    out.insert(key, self.eval(value_expr)?);
                }
                Ok(Value::Map(out))
            }
        }
    }

    fn eval_unary(&mut self, e: &UnaryExpr) -> Result<Value> {
        let operand = self.eval(&e.expr)?;
        if operand.is_unknown() {
            return Ok(Value::Unknown);
        }
        match e.op {
            UnaryOp::Not => Ok(Value::Bool(!self.to_bool(&operand, e.expr.span())?)),
            UnaryOp::Neg => Ok(Value::Number(-self.to_number(&operand, e.expr.span())?)),
        }
    }

    fn eval_binary(&mut self, e: &BinaryExpr) -> Result<Value> {
        // Logical operators first: a known-dominant operand decides the
        // result even when the other side is unknown
        if matches!(e.op, BinaryOp::And | BinaryOp::Or) {
            return self.eval_logical(e);
        }

        let left = self.eval(&e.left)?;
        let right = self.eval(&e.right)?;
        if left.is_unknown() || right.is_unknown() {
            return Ok(Value::Unknown);
        }

        match e.op {
            // Equality is structural and type-strict: no coercion, so
            // `1 == "1"` is false rather than an error
            BinaryOp::Eq => Ok(Value::Bool(left == right)),
            BinaryOp::Ne => Ok(Value::Bool(left != right)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let l = self.to_number(&left, e.left.span())?;
                let r = self.to_number(&right, e.right.span())?;
                let result = match e.op {
                    BinaryOp::Lt => l < r,
                    BinaryOp::Le => l <= r,
                    BinaryOp::Gt => l > r,
                    _ => l >= r,
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.eval_arithmetic(e, &left, &right)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_logical(&mut self, e: &BinaryExpr) -> Result<Value> {
        let left = self.eval(&e.left)?;
        let right = self.eval(&e.right)?;

        let l = if left.is_unknown() {
            None
        } else {
            Some(self.to_bool(&left, e.left.span())?)
        };
        let r = if right.is_unknown() {
            None
        } else {
            Some(self.to_bool(&right, e.right.span())?)
        };

        let result = match e.op {
            BinaryOp::And => match (l, r) {
                (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Unknown,
            },
            _ => match (l, r) {
                (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Unknown,
            },
        };
        Ok(result)
    }

    fn eval_arithmetic(&mut self, e: &BinaryExpr, left: &Value, right: &Value) -> Result<Value> {
        let l = self.to_number(left, e.left.span())?;
        let r = self.to_number(right, e.right.span())?;

        if r.is_zero() && matches!(e.op, BinaryOp::Div | BinaryOp::Mod) {
            return Err(self.type_mismatch("division by zero".to_string(), e.span));
        }

        let result = match e.op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Sub => l.checked_sub(r),
            BinaryOp::Mul => l.checked_mul(r),
            BinaryOp::Div => l.checked_div(r),
            _ => l.checked_rem(r),
        };
        result
            .map(Value::Number)
            .ok_or_else(|| self.type_mismatch("numeric overflow".to_string(), e.span))
    }

    fn eval_conditional(&mut self, e: &ConditionalExpr) -> Result<Value> {
        let condition = self.eval(&e.condition)?;
        // An unknown condition hides which branch applies, so neither branch
        // is evaluated
        if condition.is_unknown() {
            return Ok(Value::Unknown);
        }
        if self.to_bool(&condition, e.condition.span())? {
            self.eval(&e.then_expr)
        } else {
            self.eval(&e.else_expr)
        }
    }

    fn eval_index(&mut self, e: &IndexExpr) -> Result<Value> {
        let base = self.eval(&e.base)?;
        let index = self.eval(&e.index)?;
        if base.is_unknown() || index.is_unknown() {
            return Ok(Value::Unknown);
        }

        match &base {
            Value::List(items) => {
                let n = self.to_number(&index, e.index.span())?;
                if !n.fract().is_zero() {
                    return Err(
                        self.type_mismatch("list index must be a whole number".to_string(), e.span)
                    );
                }
                let idx = n.to_usize().and_then(|i| items.get(i)).cloned();
                idx.ok_or_else(|| {
                    self.type_mismatch(format!("list index {n} is out of range"), e.span)
                })
            }
            Value::Map(map) => {
                let key = self.to_string(&index, e.index.span())?;
                map.get(&key).cloned().ok_or_else(|| {
                    self.type_mismatch(format!("map has no key {key:?}"), e.span)
                })
            }
            other => Err(self.type_mismatch(
                format!("cannot index a {} value", other.type_name()),
                e.span,
            )),
        }
    }

    fn eval_attr(&mut self, e: &AttrExpr) -> Result<Value> {
        let base = self.eval(&e.base)?;
        if base.is_unknown() {
            return Ok(Value::Unknown);
        }
        match &base {
            Value::Map(map) => map.get(&e.attr.name).cloned().ok_or_else(|| {
                self.type_mismatch(format!("map has no key {:?}", e.attr.name), e.span)
            }),
            other => Err(self.type_mismatch(
                format!("cannot access attributes on a {} value", other.type_name()),
                e.span,
            )),
        }
    }

    fn eval_call(&mut self, e: &CallExpr) -> Result<Value> {
        // Guarded evaluation needs the unevaluated argument expressions, so
        // try and can live here rather than in the registry
        match e.name.name.as_str() {
            "try" => return self.eval_try(e),
            "can" => return self.eval_can(e),
            _ => {}
        }

        let Some(function) = REGISTRY.get(e.name.name.as_str()) else {
            return Err(Error::UnknownFunction {
                name: e.name.name.clone(),
                span: e.name.span,
                src: self.source.named_source(),
            });
        };

        if !function.arity.accepts(e.args.len()) {
            return Err(Error::ArityMismatch {
                name: function.name.to_string(),
                expected: function.arity.describe(),
                got: e.args.len(),
                span: e.span,
                src: self.source.named_source(),
            });
        }

        let mut values = Vec::with_capacity(e.args.len());
        for arg in &e.args {
            values.push(self.eval(arg)?);
        }
        // Functions are strict in unknowns: any unknown argument makes the
        // result unknown without calling
        if values.iter().any(Value::is_unknown) {
            return Ok(Value::Unknown);
        }

        (function.call)(&values).map_err(|err| {
            self.type_mismatch(format!("in call to `{}`: {}", function.name, err.message), e.span)
        })
    }

    /// `try(expr, ...)`: first candidate that evaluates cleanly wins; an
    /// unknown candidate defers the whole decision
    fn eval_try(&mut self, e: &CallExpr) -> Result<Value> {
        if e.args.is_empty() {
            return Err(Error::ArityMismatch {
                name: "try".to_string(),
                expected: "at least 1".to_string(),
                got: 0,
                span: e.span,
                src: self.source.named_source(),
            });
        }
        let mut last_err = None;
        for arg in &e.args {
            match self.eval(arg) {
                Ok(value) if value.is_unknown() => return Ok(Value::Unknown),
                Ok(value) => return Ok(value),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.expect("at least one candidate"))
    }

    /// `can(expr)`: true when the expression evaluates without error
    fn eval_can(&mut self, e: &CallExpr) -> Result<Value> {
        if e.args.len() != 1 {
            return Err(Error::ArityMismatch {
                name: "can".to_string(),
                expected: "1".to_string(),
                got: e.args.len(),
                span: e.span,
                src: self.source.named_source(),
            });
        }
        match self.eval(&e.args[0]) {
            Ok(value) if value.is_unknown() => Ok(Value::Unknown),
            Ok(_) => Ok(Value::Bool(true)),
            Err(_) => Ok(Value::Bool(false)),
        }
    }

    fn eval_for_list(&mut self, e: &ForListExpr) -> Result<Value> {
        let iterable = self.eval(&e.iter)?;
        if iterable.is_unknown() {
            return Ok(Value::Unknown);
        }
        let items = loop_items(&iterable, e.iter.span(), self.source)?;

        self.env.push_scope();
        let result = self.eval_for_list_items(e, &items);
        self.env.pop_scope();
        result
    }

    fn eval_for_list_items(&mut self, e: &ForListExpr, items: &[LoopItem]) -> Result<Value> {
        let mut out = Vec::new();
        for item in items {
            bind_target(self.env, &e.target, item);
            if let Some(condition) = &e.condition {
                let keep = self.eval(condition)?;
                if keep.is_unknown() {
                    return Ok(Value::Unknown);
                }
                if !self.to_bool(&keep, condition.span())? {
                    continue;
                }
            }
            out.push(self.eval(&e.value)?);
        }
        Ok(Value::List(out))
    }

    fn eval_for_object(&mut self, e: &ForObjectExpr) -> Result<Value> {
        let iterable = self.eval(&e.iter)?;
        if iterable.is_unknown() {
            return Ok(Value::Unknown);
        }
        let items = loop_items(&iterable, e.iter.span(), self.source)?;

        self.env.push_scope();
        let result = self.eval_for_object_items(e, &items);
        self.env.pop_scope();
        result
    }

    fn eval_for_object_items(&mut self, e: &ForObjectExpr, items: &[LoopItem]) -> Result<Value> {
        let mut out = IndexMap::new();
        for item in items {
            bind_target(self.env, &e.target, item);
            if let Some(condition) = &e.condition {
                let keep = self.eval(condition)?;
                if keep.is_unknown() {
                    return Ok(Value::Unknown);
                }
                if !self.to_bool(&keep, condition.span())? {
                    continue;
                }
            }
            let key = self.eval(&e.key)?;
            if key.is_unknown() {
                return Ok(Value::Unknown);
            }
            let key = self.to_string(&key, e.key.span())?;
            if out.contains_key(&key) {
                return Err(
                    self.type_mismatch(format!("duplicate object key {key:?}"), e.key.span())
                );
            }
            let value = self.eval(&e.value)?;
            out.insert(key, value);
        }
        Ok(Value::Map(out))
    }

    // ========================================================================
    // Conversions with span attachment
    // ========================================================================

    pub(crate) fn to_bool(&self, value: &Value, span: Span) -> Result<bool> {
        value.try_bool().map_err(|e| self.convert_err(e, span))
    }

    pub(crate) fn to_number(&self, value: &Value, span: Span) -> Result<Decimal> {
        value.try_number().map_err(|e| self.convert_err(e, span))
    }

    pub(crate) fn to_string(&self, value: &Value, span: Span) -> Result<String> {
        value.try_string().map_err(|e| self.convert_err(e, span))
    }

    fn convert_err(&self, e: ConvertError, span: Span) -> Error {
        match e {
            ConvertError::Unconvertible { from, to } => Error::Unconvertible {
                from,
                to,
                span,
                src: self.source.named_source(),
            },
            ConvertError::NullNotAllowed => Error::NullNotAllowed {
                span,
                src: self.source.named_source(),
            },
        }
    }

    fn type_mismatch(&self, message: String, span: Span) -> Error {
        Error::TypeMismatch {
            message,
            span,
            src: self.source.named_source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn eval_with(expr: &str, env: &mut Environment) -> Result<Value> {
        let parser = Parser::new("test", format!("${{ {expr} }}"));
        let source = parser.source().clone();
        let template = parser.parse().expect("expression should parse");
        let Node::Interp(node) = &template.body[0] else {
            panic!("expected interpolation");
        };
        Evaluator::new(env, &source).eval(&node.expr)
    }

    fn eval(expr: &str) -> Result<Value> {
        eval_with(expr, &mut Environment::new())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::from(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::from(9));
        assert_eq!(eval("7 % 3").unwrap(), Value::from(1));
        assert_eq!(eval("-(2 - 5)").unwrap(), Value::from(3));
    }

    #[test]
    fn division_by_zero() {
        let err = eval("1 / 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        assert_eq!(eval("0.1 + 0.2").unwrap(), Value::Number("0.3".parse().unwrap()));
    }

    #[test]
    fn equality_is_type_strict() {
        assert_eq!(eval("1 == \"1\"").unwrap(), Value::Bool(false));
        assert_eq!(eval("1 == 1").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"a\" != \"b\"").unwrap(), Value::Bool(true));
    }

    #[test]
    fn comparison_converts_strings() {
        assert_eq!(eval("\"10\" > 9").unwrap(), Value::Bool(true));
        assert!(eval("\"abc\" > 1").is_err());
    }

    #[test]
    fn undefined_variable() {
        let err = eval("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
        assert_eq!(err.to_string(), "undefined variable `missing`");
    }

    #[test]
    fn variable_lookup() {
        let mut env = Environment::new();
        env.set("name", Value::from("bar"));
        assert_eq!(eval_with("name", &mut env).unwrap(), Value::from("bar"));
    }

    #[test]
    fn call_dispatch() {
        assert_eq!(eval("lower(\"BAR\")").unwrap(), Value::from("bar"));
        assert_eq!(
            eval("nosuch(1)").unwrap_err().kind(),
            ErrorKind::UnknownFunction
        );
        assert_eq!(
            eval("lower(\"a\", \"b\")").unwrap_err().kind(),
            ErrorKind::ArityMismatch
        );
        assert_eq!(
            eval("lower([1])").unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn unknown_is_infectious() {
        let mut env = Environment::new();
        env.set("pending", Value::Unknown);
        assert_eq!(eval_with("pending + 1", &mut env).unwrap(), Value::Unknown);
        assert_eq!(
            eval_with("upper(pending)", &mut env).unwrap(),
            Value::Unknown
        );
        assert_eq!(
            eval_with("pending == 1", &mut env).unwrap(),
            Value::Unknown
        );
    }

    #[test]
    fn logical_operators_dominate_unknown() {
        let mut env = Environment::new();
        env.set("pending", Value::Unknown);
        assert_eq!(
            eval_with("false && pending", &mut env).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval_with("pending || true", &mut env).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_with("true && pending", &mut env).unwrap(),
            Value::Unknown
        );
    }

    #[test]
    fn conditional_expr() {
        assert_eq!(eval("2 > 1 ? \"big\" : \"small\"").unwrap(), Value::from("big"));
        let mut env = Environment::new();
        env.set("pending", Value::Unknown);
        assert_eq!(
            eval_with("pending ? missing : alsomissing", &mut env).unwrap(),
            Value::Unknown
        );
    }

    #[test]
    fn index_and_attr() {
        let mut env = Environment::new();
        let mut user = IndexMap::new();
        user.insert("name".to_string(), Value::from("ada"));
        env.set("user", Value::Map(user));
        env.set("items", Value::List(vec!["a".into(), "b".into()]));

        assert_eq!(eval_with("user.name", &mut env).unwrap(), Value::from("ada"));
        assert_eq!(
            eval_with("user[\"name\"]", &mut env).unwrap(),
            Value::from("ada")
        );
        assert_eq!(eval_with("items[1]", &mut env).unwrap(), Value::from("b"));
        assert_eq!(
            eval_with("items[5]", &mut env).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            eval_with("user.missing", &mut env).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn try_picks_first_success() {
        let mut env = Environment::new();
        env.set("x", Value::from("hit"));
        assert_eq!(
            eval_with("try(missing, x, \"fallback\")", &mut env).unwrap(),
            Value::from("hit")
        );
        assert_eq!(
            eval_with("try(missing, \"fallback\")", &mut env).unwrap(),
            Value::from("fallback")
        );
        assert_eq!(
            eval("try(missing)").unwrap_err().kind(),
            ErrorKind::UndefinedVariable
        );
    }

    #[test]
    fn try_defers_on_unknown_candidate() {
        let mut env = Environment::new();
        env.set("pending", Value::Unknown);
        assert_eq!(
            eval_with("try(pending, \"fallback\")", &mut env).unwrap(),
            Value::Unknown
        );
    }

    #[test]
    fn can_reports_success() {
        assert_eq!(eval("can(1 + 1)").unwrap(), Value::Bool(true));
        assert_eq!(eval("can(missing)").unwrap(), Value::Bool(false));
        let mut env = Environment::new();
        env.set("pending", Value::Unknown);
        assert_eq!(eval_with("can(pending)", &mut env).unwrap(), Value::Unknown);
    }

    #[test]
    fn for_list_comprehension() {
        let mut env = Environment::new();
        env.set(
            "xs",
            Value::List(vec!["a".into(), "".into(), "b".into()]),
        );
        assert_eq!(
            eval_with("[for x in xs : upper(x) if x != \"\"]", &mut env).unwrap(),
            Value::List(vec!["A".into(), "B".into()])
        );
    }

    #[test]
    fn for_object_comprehension() {
        let mut env = Environment::new();
        env.set("xs", Value::List(vec!["a".into(), "b".into()]));
        let result = eval_with("{for i, x in xs : x => i}", &mut env).unwrap();
        let Value::Map(map) = result else {
            panic!("expected map");
        };
        assert_eq!(map["a"], Value::from(0));
        assert_eq!(map["b"], Value::from(1));
    }

    #[test]
    fn for_over_map_binds_keys() {
        let mut env = Environment::new();
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::from(1));
        m.insert("b".to_string(), Value::from(2));
        env.set("m", Value::Map(m));
        assert_eq!(
            eval_with("[for k in m : k]", &mut env).unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            eval_with("[for k, v in m : v]", &mut env).unwrap(),
            Value::List(vec![Value::from(1), Value::from(2)])
        );
    }

    #[test]
    fn iterating_a_scalar_fails() {
        let mut env = Environment::new();
        env.set("n", Value::from(5));
        assert_eq!(
            eval_with("[for x in n : x]", &mut env).unwrap_err().kind(),
            ErrorKind::NotIterable
        );
    }

    #[test]
    fn comprehension_scope_is_popped() {
        let mut env = Environment::new();
        env.set("xs", Value::List(vec!["a".into()]));
        eval_with("[for x in xs : x]", &mut env).unwrap();
        assert!(env.get("x").is_none());
    }

    #[test]
    fn object_literal() {
        let result = eval("{ a = 1, \"b\" = 2 }").unwrap();
        let Value::Map(map) = result else {
            panic!("expected map");
        };
        assert_eq!(map["a"], Value::from(1));
        assert_eq!(map["b"], Value::from(2));
    }

    #[test]
    fn null_in_arithmetic_is_rejected() {
        assert_eq!(
            eval("null + 1").unwrap_err().kind(),
            ErrorKind::NullNotAllowed
        );
    }

    #[test]
    fn bool_conversion_failure() {
        assert_eq!(
            eval("\"maybe\" ? 1 : 2").unwrap_err().kind(),
            ErrorKind::Unconvertible
        );
    }
}
