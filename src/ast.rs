//! AST for the template language
//!
//! A template is a sequence of nodes: literal text, `${...}` interpolations,
//! and `%{...}` directives. Expressions inside markers form their own tree.
//! Every node and expression carries a span into the original source.

use rust_decimal::Decimal;

/// Source span (byte offset + length)
pub type Span = miette::SourceSpan;

/// Helper to create a span
pub fn span(offset: usize, len: usize) -> Span {
    Span::new(offset.into(), len)
}

/// Join two spans into one covering both
pub fn join(a: Span, b: Span) -> Span {
    let start = a.offset().min(b.offset());
    let end = (a.offset() + a.len()).max(b.offset() + b.len());
    span(start, end - start)
}

/// An identifier with its span
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub body: Vec<Node>,
    pub span: Span,
}

/// Template-level node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, escapes already unescaped
    Text(TextNode),
    /// `${ expr }`
    Interp(InterpNode),
    /// `%{ if } ... %{ else } ... %{ endif }`
    If(IfNode),
    /// `%{ for x in expr } ... %{ endfor }`
    For(ForNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpNode {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Expr,
    pub then_body: Vec<Node>,
    pub else_body: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub target: Target,
    pub iter: Expr,
    pub body: Vec<Node>,
    pub span: Span,
}

/// Loop binding: one symbol binds elements (or keys), two bind
/// index-or-key and value
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Single(Ident),
    Pair(Ident, Ident),
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Var(Ident),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    /// `cond ? a : b`
    Conditional(ConditionalExpr),
    /// `base[index]`
    Index(IndexExpr),
    /// `base.attr`
    Attr(AttrExpr),
    /// `name(args...)`
    Call(CallExpr),
    /// `[for x in coll : expr if cond]`
    ForList(ForListExpr),
    /// `{for k, v in coll : key => value if cond}`
    ForObject(ForObjectExpr),
}

impl Expr {
    /// The span covered by this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Var(ident) => ident.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Conditional(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Attr(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::ForList(e) => e.span,
            Expr::ForObject(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null(Span),
    Bool(bool, Span),
    Number(Decimal, Span),
    String(String, Span),
    /// `[a, b, c]`
    List(Vec<Expr>, Span),
    /// `{ key = value, ... }`
    Object(Vec<(Expr, Expr)>, Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Null(span)
            | Literal::Bool(_, span)
            | Literal::Number(_, span)
            | Literal::String(_, span)
            | Literal::List(_, span)
            | Literal::Object(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrExpr {
    pub base: Box<Expr>,
    pub attr: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForListExpr {
    pub target: Target,
    pub iter: Box<Expr>,
    pub value: Box<Expr>,
    pub condition: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForObjectExpr {
    pub target: Target,
    pub iter: Box<Expr>,
    pub key: Box<Expr>,
    pub value: Box<Expr>,
    pub condition: Option<Box<Expr>>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_covers_both_spans() {
        let joined = join(span(2, 3), span(10, 4));
        assert_eq!(joined.offset(), 2);
        assert_eq!(joined.len(), 12);
    }
}
