//! Error types for the template engine
//!
//! Every failure is reported as a tagged [`Error`] value carrying a span into
//! the template source where one exists. The host surfaces the `Display`
//! message verbatim; [`Error::kind`] exposes the taxonomy tag so callers can
//! branch without string matching.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// The template source, kept for error reporting
///
/// Owned by the parsed template and cloned into errors so miette can render
/// the offending line with a label.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: String,
    text: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Arc::new(text.into()),
        }
    }

    /// Template name as given to `Template::parse`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text
    pub fn text(&self) -> &Arc<String> {
        &self.text
    }

    /// Build a miette named source for attaching to an error
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.as_ref().clone())
    }
}

/// Error taxonomy tag
///
/// One tag per failure class in the external contract. `Error::kind` maps
/// every error onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required top-level argument was absent
    ArgumentNull,
    /// Malformed marker syntax (unterminated interpolation/directive)
    Lex,
    /// Syntactically invalid expression inside a marker
    Parse,
    /// Expression references a name absent from the environment
    UndefinedVariable,
    /// Call to a name not in the function registry
    UnknownFunction,
    /// Wrong number of arguments to a registered function
    ArityMismatch,
    /// An argument or operand has a kind the operation cannot accept
    TypeMismatch,
    /// A value could not be coerced to the required kind
    Unconvertible,
    /// Null reached a context that demands a value
    NullNotAllowed,
    /// `for` applied to a non-collection value
    NotIterable,
    /// Final render step received a list/map/null
    NotStringConvertible,
    /// Final render step received an unknown value
    ResultUnknown,
}

/// A template engine error
///
/// Spanned variants carry the source so miette renders them against the
/// template text.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("argument must not be null: {name}")]
    #[diagnostic(code(safran::argument_null))]
    ArgumentNull { name: &'static str },

    #[error("unterminated {marker} sequence")]
    #[diagnostic(
        code(safran::unterminated),
        help("every interpolation or directive must be closed with `}}`")
    )]
    Unterminated {
        /// The opening marker text, `${` or `%{`
        marker: &'static str,
        #[label("opened here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(safran::syntax))]
    Syntax {
        expected: String,
        found: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("undefined variable `{name}`")]
    #[diagnostic(code(safran::undefined_variable))]
    UndefinedVariable {
        name: String,
        #[label("not found in the environment")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("call to unknown function `{name}`")]
    #[diagnostic(code(safran::unknown_function))]
    UnknownFunction {
        name: String,
        #[label("no function with this name")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    #[diagnostic(code(safran::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
        #[label("in this call")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(safran::type_mismatch))]
    TypeMismatch {
        message: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("cannot convert {from} to {to}")]
    #[diagnostic(code(safran::unconvertible))]
    Unconvertible {
        from: &'static str,
        to: &'static str,
        #[label("this value")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("null value is not allowed here")]
    #[diagnostic(code(safran::null_not_allowed))]
    NullNotAllowed {
        #[label("evaluates to null")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("cannot iterate over a {type_name} value")]
    #[diagnostic(code(safran::not_iterable))]
    NotIterable {
        type_name: &'static str,
        #[label("not a list or map")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("template result not string: a {type_name} value has no string form")]
    #[diagnostic(
        code(safran::not_string_convertible),
        help("encode lists and maps explicitly, e.g. with jsonencode(...)")
    )]
    NotStringConvertible {
        type_name: &'static str,
        #[label("this value")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("template result depends on values that are not yet known")]
    #[diagnostic(code(safran::result_unknown))]
    ResultUnknown {
        #[label("unknown at render time")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

impl Error {
    /// The taxonomy tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ArgumentNull { .. } => ErrorKind::ArgumentNull,
            Error::Unterminated { .. } => ErrorKind::Lex,
            Error::Syntax { .. } => ErrorKind::Parse,
            Error::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            Error::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            Error::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Unconvertible { .. } => ErrorKind::Unconvertible,
            Error::NullNotAllowed { .. } => ErrorKind::NullNotAllowed,
            Error::NotIterable { .. } => ErrorKind::NotIterable,
            Error::NotStringConvertible { .. } => ErrorKind::NotStringConvertible,
            Error::ResultUnknown { .. } => ErrorKind::ResultUnknown,
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = Error::ArgumentNull { name: "template" };
        assert_eq!(err.kind(), ErrorKind::ArgumentNull);
        assert_eq!(err.to_string(), "argument must not be null: template");
    }

    #[test]
    fn named_source_carries_name() {
        let src = TemplateSource::new("greeting", "hello ${name}");
        assert_eq!(src.name(), "greeting");
        assert_eq!(src.text().as_str(), "hello ${name}");
    }
}
