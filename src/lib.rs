//! Safran - an embeddable string template engine
//!
//! Templates are plain text with two kinds of markers:
//!
//! - `${ expr }` interpolates an expression into the output
//! - `%{ if cond } ... %{ else } ... %{ endif }` and
//!   `%{ for x in coll } ... %{ endfor }` are directives
//!
//! `$${` and `%%{` escape a marker into literal text; a `~` next to a marker
//! brace (`${~`, `%{~`, `~}`) strips adjacent whitespace. Expressions cover
//! literals (numbers are exact decimals), variables, operators, a conditional
//! `?:`, list/object literals and comprehensions, and calls into a built-in
//! function library. `try` and `can` guard evaluation of fallible
//! expressions.
//!
//! ```
//! use safran::{render_template, Binding};
//! use indexmap::IndexMap;
//!
//! let mut vars = IndexMap::new();
//! vars.insert("var".to_string(), Binding::Known("BAR".to_string()));
//! let out = render_template(Some("foo-${lower(var)}-bat"), Some(&vars)).unwrap();
//! assert_eq!(out, "foo-bar-bat");
//! ```
//!
//! For repeated rendering, parse once with [`Template::parse`] and render
//! against an [`Environment`] of arbitrary [`Value`]s. All errors are miette
//! diagnostics pointing into the template source.

pub mod ast;
mod error;
mod eval;
pub mod funcs;
pub mod lexer;
pub mod parser;
mod render;
pub mod value;

pub use error::{Error, ErrorKind, Result, TemplateSource};
pub use eval::{Environment, Evaluator};
pub use funcs::{Arity, FuncError, Function, REGISTRY};
pub use render::{render_template, Binding, Template};
pub use value::Value;
