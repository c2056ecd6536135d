//! Template rendering and the host entry point
//!
//! [`Template::parse`] + [`Template::render`] are the embedding API;
//! [`render_template`] is the one-shot driver for hosts that hand over a raw
//! template string and a set of string (or not-yet-known) bindings.

use crate::ast::{self, Node, Span};
use crate::error::{Error, Result, TemplateSource};
use crate::eval::{bind_target, loop_items, Environment, Evaluator};
use crate::parser::Parser;
use crate::value::Value;
use indexmap::IndexMap;

/// The name used for templates that arrive as bare strings
const ANONYMOUS_TEMPLATE: &str = "<string_tmpl>";

/// A parsed template, ready to render any number of times
#[derive(Debug, Clone)]
pub struct Template {
    body: Vec<Node>,
    source: TemplateSource,
}

impl Template {
    /// Parse a template; the name shows up in diagnostics
    pub fn parse(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let parser = Parser::new(name, text);
        let source = parser.source().clone();
        let template = parser.parse()?;
        tracing::debug!(
            name = source.name(),
            nodes = template.body.len(),
            "parsed template"
        );
        Ok(Self {
            body: template.body,
            source,
        })
    }

    /// Render against an environment, producing one output string
    pub fn render(&self, env: &Environment) -> Result<String> {
        let mut renderer = Renderer {
            env: env.clone(),
            source: &self.source,
            output: String::new(),
        };
        renderer.render_nodes(&self.body)?;
        tracing::trace!(
            name = self.source.name(),
            bytes = renderer.output.len(),
            "rendered template"
        );
        Ok(renderer.output)
    }

    /// The source this template was parsed from
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }
}

struct Renderer<'a> {
    env: Environment,
    source: &'a TemplateSource,
    output: String,
}

impl Renderer<'_> {
    fn render_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.output.push_str(&text.text),
                Node::Interp(interp) => {
                    let value = self.eval(&interp.expr)?;
                    self.append_value(&value, interp.span)?;
                }
                Node::If(node) => {
                    let condition = self.eval(&node.condition)?;
                    if condition.is_unknown() {
                        return Err(self.result_unknown(node.condition.span()));
                    }
                    let condition = Evaluator::new(&mut self.env, self.source)
                        .to_bool(&condition, node.condition.span())?;
                    if condition {
                        self.render_nodes(&node.then_body)?;
                    } else if let Some(else_body) = &node.else_body {
                        self.render_nodes(else_body)?;
                    }
                }
                Node::For(node) => {
                    let iterable = self.eval(&node.iter)?;
                    if iterable.is_unknown() {
                        return Err(self.result_unknown(node.iter.span()));
                    }
                    let items = loop_items(&iterable, node.iter.span(), self.source)?;
                    self.env.push_scope();
                    let mut result = Ok(());
                    for item in &items {
                        bind_target(&mut self.env, &node.target, item);
                        result = self.render_nodes(&node.body);
                        if result.is_err() {
                            break;
                        }
                    }
                    self.env.pop_scope();
                    result?;
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &ast::Expr) -> Result<Value> {
        Evaluator::new(&mut self.env, self.source).eval(expr)
    }

    /// Append an interpolated value to the output
    ///
    /// Only strings, numbers and bools have a textual form here; anything
    /// else must be encoded explicitly inside the template.
    fn append_value(&mut self, value: &Value, span: Span) -> Result<()> {
        match value {
            Value::String(s) => self.output.push_str(s),
            Value::Number(n) => self.output.push_str(&crate::value::format_number(*n)),
            Value::Bool(b) => self.output.push_str(if *b { "true" } else { "false" }),
            Value::Unknown => return Err(self.result_unknown(span)),
            Value::Null | Value::List(_) | Value::Map(_) => {
                return Err(Error::NotStringConvertible {
                    type_name: value.type_name(),
                    span,
                    src: self.source.named_source(),
                });
            }
        }
        Ok(())
    }

    fn result_unknown(&self, span: Span) -> Error {
        Error::ResultUnknown {
            span,
            src: self.source.named_source(),
        }
    }
}

/// A variable binding supplied by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A resolved string value
    Known(String),
    /// A value promised but not yet available
    Unknown,
}

/// One-shot driver: parse, bind variables and render
///
/// `None` arguments are rejected up front. Unknown bindings may flow through
/// the template; the render fails with a "result unknown" error only when one
/// of them would reach the output.
pub fn render_template(
    template: Option<&str>,
    variables: Option<&IndexMap<String, Binding>>,
) -> Result<String> {
    let text = template.ok_or(Error::ArgumentNull { name: "template" })?;
    let variables = variables.ok_or(Error::ArgumentNull { name: "variables" })?;

    let template = Template::parse(ANONYMOUS_TEMPLATE, text)?;

    let mut env = Environment::new();
    for (name, binding) in variables {
        let value = match binding {
            Binding::Known(s) => Value::String(s.clone()),
            Binding::Unknown => Value::Unknown,
        };
        env.set(name.clone(), value);
    }

    template.render(&env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> IndexMap<String, Binding> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Binding::Known(v.to_string())))
            .collect()
    }

    fn render(template: &str, variables: &IndexMap<String, Binding>) -> Result<String> {
        render_template(Some(template), Some(variables))
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("hello", &vars(&[])).unwrap(), "hello");
    }

    #[test]
    fn interpolates_variables() {
        assert_eq!(
            render("foo-${var}-bat", &vars(&[("var", "bar")])).unwrap(),
            "foo-bar-bat"
        );
    }

    #[test]
    fn escaped_marker_is_literal() {
        assert_eq!(
            render("foo-$${var}-bat", &vars(&[("var", "bar")])).unwrap(),
            "foo-${var}-bat"
        );
    }

    #[test]
    fn function_call_in_interpolation() {
        assert_eq!(
            render("foo-${lower(var)}-bat", &vars(&[("var", "BAR")])).unwrap(),
            "foo-bar-bat"
        );
    }

    #[test]
    fn null_arguments_are_rejected() {
        let err = render_template(None, Some(&vars(&[]))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentNull);
        assert_eq!(err.to_string(), "argument must not be null: template");

        let err = render_template(Some("x"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentNull);
    }

    #[test]
    fn undefined_variable_in_empty_environment() {
        let err = render("${missing}", &vars(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn unknown_binding_reaching_output_fails() {
        let mut variables = vars(&[]);
        variables.insert("var".to_string(), Binding::Unknown);
        let err = render("foo-${var}-bat", &variables).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResultUnknown);
    }

    #[test]
    fn known_dominant_operand_hides_unknown() {
        let mut variables = vars(&[]);
        variables.insert("pending".to_string(), Binding::Unknown);
        assert_eq!(
            render("${ false && pending ? \"a\" : \"b\" }", &variables).unwrap(),
            "b"
        );
    }

    #[test]
    fn resolved_binding_renders_normally() {
        let mut variables = vars(&[]);
        variables.insert("var".to_string(), Binding::Unknown);
        assert!(render("v=${var}", &variables).is_err());

        variables.insert("var".to_string(), Binding::Known("1".to_string()));
        assert_eq!(render("v=${var}", &variables).unwrap(), "v=1");
    }

    #[test]
    fn if_directive() {
        assert_eq!(
            render(
                "%{ if var == \"a\" }yes%{ else }no%{ endif }",
                &vars(&[("var", "a")])
            )
            .unwrap(),
            "yes"
        );
        assert_eq!(
            render(
                "%{ if var == \"a\" }yes%{ else }no%{ endif }",
                &vars(&[("var", "b")])
            )
            .unwrap(),
            "no"
        );
    }

    #[test]
    fn for_directive() {
        assert_eq!(
            render(
                "%{ for x in split(\",\", csv) }[${x}]%{ endfor }",
                &vars(&[("csv", "a,b,c")])
            )
            .unwrap(),
            "[a][b][c]"
        );
    }

    #[test]
    fn for_directive_with_index() {
        assert_eq!(
            render(
                "%{ for i, x in split(\",\", csv) }${i}=${x};%{ endfor }",
                &vars(&[("csv", "a,b")])
            )
            .unwrap(),
            "0=a;1=b;"
        );
    }

    #[test]
    fn strip_markers_trim_whitespace() {
        assert_eq!(
            render("a\n%{~ if true ~}\n  b\n%{~ endif ~}\nc", &vars(&[])).unwrap(),
            "abc"
        );
        assert_eq!(
            render("x ${~ \"y\" } z", &vars(&[])).unwrap(),
            "xy z"
        );
    }

    #[test]
    fn unknown_condition_fails_render() {
        let mut variables = vars(&[]);
        variables.insert("pending".to_string(), Binding::Unknown);
        let err = render("%{ if pending }x%{ endif }", &variables).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResultUnknown);
    }

    #[test]
    fn numbers_render_without_artifacts() {
        assert_eq!(render("${ 1 + 2 }", &vars(&[])).unwrap(), "3");
        assert_eq!(render("${ 0.1 + 0.2 }", &vars(&[])).unwrap(), "0.3");
    }

    #[test]
    fn lists_do_not_stringify_implicitly() {
        let err = render("${ [1, 2] }", &vars(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotStringConvertible);
        assert_eq!(
            render("${ jsonencode([1, 2]) }", &vars(&[])).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let variables = vars(&[("var", "x")]);
        let first = render("a-${var}", &variables).unwrap();
        let second = render("a-${var}", &variables).unwrap();
        assert_eq!(first, second);

        let e1 = render("${missing}", &variables).unwrap_err().kind();
        let e2 = render("${missing}", &variables).unwrap_err().kind();
        assert_eq!(e1, e2);
    }

    #[test]
    fn parsed_template_renders_many_times() {
        let template = Template::parse("greeting", "hi ${name}").unwrap();
        let mut env = Environment::new();
        env.set("name", Value::from("ada"));
        assert_eq!(template.render(&env).unwrap(), "hi ada");
        env.set("name", Value::from("lin"));
        assert_eq!(template.render(&env).unwrap(), "hi lin");
    }

    #[test]
    fn try_provides_fallbacks_in_templates() {
        assert_eq!(
            render("${ try(missing, \"default\") }", &vars(&[])).unwrap(),
            "default"
        );
    }
}
