//! Parser for the template language
//!
//! Transforms the token stream into an AST with full span information.
//! Directives nest; expressions use precedence climbing with the conditional
//! operator loosest and postfix index/attribute/call tightest. The parser
//! never evaluates anything; unknown function names surface at evaluation.

use crate::ast::*;
use crate::error::{Error, Result, TemplateSource};
use crate::lexer::{tokenize, Token, TokenKind};
use std::sync::Arc;

/// Parser state
pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    source: TemplateSource,
    /// Current token
    current: Token,
    /// Previous token (for span info)
    previous: Token,
    /// Pending token (for lookahead pushback)
    pending: Option<Token>,
    /// Open marker span, for unterminated diagnostics at EOF
    open_marker: Option<(&'static str, Span)>,
    /// Source length, for the EOF span
    end: usize,
}

impl Parser {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source_str: String = source.into();
        let end = source_str.len();
        let source_arc = Arc::new(source_str.clone());
        let template_source = TemplateSource::new(name, source_str);

        let mut tokens = tokenize(source_arc).into_iter();
        let current = tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, end, 0));
        Self {
            tokens,
            source: template_source,
            current: current.clone(),
            previous: current,
            pending: None,
            open_marker: None,
            end,
        }
    }

    /// The template source held by this parser
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Parse the full template
    pub fn parse(mut self) -> Result<Template> {
        let start = self.current.span;
        let body = self.parse_body(&[])?;
        let end = self.previous.span;

        Ok(Template {
            body,
            span: join(start, end),
        })
    }

    /// Parse template body until we hit a terminator directive
    fn parse_body(&mut self, terminators: &[TokenKind]) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            if self.is_at_end() {
                break;
            }

            // Terminators come after %{ so we need to peek one token ahead
            if self.check(&TokenKind::DirectiveOpen { strip: false }) {
                let next = self.pending.take().unwrap_or_else(|| self.next_raw());
                let is_terminator = terminators
                    .iter()
                    .any(|t| std::mem::discriminant(&next.kind) == std::mem::discriminant(t));

                if is_terminator {
                    // Save the terminator token; caller will consume it
                    self.pending = Some(next);
                    break;
                }

                // Not a terminator: shift so current is the directive keyword
                let open = std::mem::replace(&mut self.current, next);
                self.open_marker = Some(("%{", open.span));
                let open_span = open.span;
                self.previous = open;
                let node = self.parse_directive(open_span)?;
                nodes.push(node);
                continue;
            }

            let node = self.parse_node()?;
            // Strip markers can trim a literal run down to nothing
            if !matches!(&node, Node::Text(t) if t.text.is_empty()) {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    /// Parse a single non-directive node
    fn parse_node(&mut self) -> Result<Node> {
        match &self.current.kind {
            TokenKind::Text(text) => {
                let text = text.clone();
                let span = self.current.span;
                self.advance();
                Ok(Node::Text(TextNode { text, span }))
            }
            TokenKind::InterpOpen { .. } => self.parse_interp(),
            _ => Err(self.syntax_error("text, `${` or `%{`".to_string())),
        }
    }

    /// Parse an interpolation: `${ expr }`
    fn parse_interp(&mut self) -> Result<Node> {
        let start = self.current.span;
        self.open_marker = Some(("${", start));
        self.expect(&TokenKind::InterpOpen { strip: false })?;

        let expr = self.parse_expr()?;

        self.expect_close()?;
        let end = self.previous.span;

        Ok(Node::Interp(InterpNode {
            expr,
            span: join(start, end),
        }))
    }

    /// Parse a directive body after `%{` has been consumed
    fn parse_directive(&mut self, start: Span) -> Result<Node> {
        match &self.current.kind {
            TokenKind::If => self.parse_if(start),
            TokenKind::For => self.parse_for(start),
            _ => Err(self.syntax_error("`if` or `for`".to_string())),
        }
    }

    /// Parse an if directive
    fn parse_if(&mut self, start: Span) -> Result<Node> {
        self.expect(&TokenKind::If)?;

        let condition = self.parse_expr()?;
        self.expect_close()?;

        let then_body = self.parse_body(&[TokenKind::Else, TokenKind::Endif])?;

        // Else branch: peek at pending to see what follows %{
        let else_body = if self
            .pending
            .as_ref()
            .is_some_and(|t| matches!(t.kind, TokenKind::Else))
        {
            self.open_marker = Some(("%{", self.current.span));
            self.advance(); // consume %{
            self.advance(); // consume else (from pending)
            self.expect_close()?;
            Some(self.parse_body(&[TokenKind::Endif])?)
        } else {
            None
        };

        // Expect %{ endif }
        self.expect_directive_open()?;
        self.expect(&TokenKind::Endif)?;
        self.expect_close()?;

        let end = self.previous.span;

        Ok(Node::If(IfNode {
            condition,
            then_body,
            else_body,
            span: join(start, end),
        }))
    }

    /// Parse a for directive
    fn parse_for(&mut self, start: Span) -> Result<Node> {
        self.expect(&TokenKind::For)?;

        let target = self.parse_target()?;
        self.expect(&TokenKind::In)?;

        let iter = self.parse_expr()?;
        self.expect_close()?;

        let body = self.parse_body(&[TokenKind::Endfor])?;

        // Expect %{ endfor }
        self.expect_directive_open()?;
        self.expect(&TokenKind::Endfor)?;
        self.expect_close()?;

        let end = self.previous.span;

        Ok(Node::For(ForNode {
            target,
            iter,
            body,
            span: join(start, end),
        }))
    }

    /// Parse a loop target: one or two comma-separated names
    fn parse_target(&mut self) -> Result<Target> {
        let first = self.expect_ident()?;

        if self.check(&TokenKind::Comma) {
            self.advance();
            let second = self.expect_ident()?;
            Ok(Target::Pair(first, second))
        } else {
            Ok(Target::Single(first))
        }
    }

    // ========================================================================
    // Expression parsing (precedence climbing)
    // ========================================================================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_conditional()
    }

    /// `cond ? then : else`, right-associative
    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;

        if self.check(&TokenKind::Question) {
            self.advance();
            let then_expr = self.parse_expr()?;
            self.expect(&TokenKind::Colon)?;
            let else_expr = self.parse_expr()?;

            let span = join(condition.span(), else_expr.span());
            Ok(Expr::Conditional(ConditionalExpr {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                span,
            }))
        } else {
            Ok(condition)
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;

        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;

        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right);
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match &self.current.kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match &self.current.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.current.span;

        let op = match &self.current.kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let expr = self.parse_unary()?;
            let span = join(start, expr.span());
            Ok(Expr::Unary(UnaryExpr {
                op,
                expr: Box::new(expr),
                span,
            }))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                let attr = self.expect_ident()?;
                let span = join(expr.span(), attr.span);
                expr = Expr::Attr(AttrExpr {
                    base: Box::new(expr),
                    attr,
                    span,
                });
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                let span = join(expr.span(), self.previous.span);
                expr = Expr::Index(IndexExpr {
                    base: Box::new(expr),
                    index: Box::new(index),
                    span,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current.clone();

        match &token.kind {
            TokenKind::Number(v) => {
                let v = *v;
                self.advance();
                Ok(Expr::Literal(Literal::Number(v, token.span)))
            }
            TokenKind::String(v) => {
                let v = v.clone();
                self.advance();
                Ok(Expr::Literal(Literal::String(v, token.span)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true, token.span)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false, token.span)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null(token.span)))
            }
            TokenKind::Ident(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span: token.span,
                };
                self.advance();

                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(&TokenKind::RParen)?;
                    let span = join(ident.span, self.previous.span);
                    Ok(Expr::Call(CallExpr {
                        name: ident,
                        args,
                        span,
                    }))
                } else {
                    Ok(Expr::Var(ident))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                if self.check(&TokenKind::For) {
                    self.parse_for_list(token.span)
                } else {
                    let elements = self.parse_list_elements()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = join(token.span, self.previous.span);
                    Ok(Expr::Literal(Literal::List(elements, span)))
                }
            }
            TokenKind::LBrace => {
                self.advance();
                if self.check(&TokenKind::For) {
                    self.parse_for_object(token.span)
                } else {
                    let entries = self.parse_object_entries()?;
                    self.expect(&TokenKind::RBrace)?;
                    let span = join(token.span, self.previous.span);
                    Ok(Expr::Literal(Literal::Object(entries, span)))
                }
            }
            _ => Err(self.syntax_error("expression".to_string())),
        }
    }

    /// `[for x in coll : expr]`, optionally with a trailing `if cond`
    fn parse_for_list(&mut self, start: Span) -> Result<Expr> {
        self.expect(&TokenKind::For)?;
        let target = self.parse_target()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expr()?;

        let condition = if self.check(&TokenKind::If) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        self.expect(&TokenKind::RBracket)?;
        let span = join(start, self.previous.span);

        Ok(Expr::ForList(ForListExpr {
            target,
            iter: Box::new(iter),
            value: Box::new(value),
            condition,
            span,
        }))
    }

    /// `{for k, v in coll : key => value}`, optionally with `if cond`
    fn parse_for_object(&mut self, start: Span) -> Result<Expr> {
        self.expect(&TokenKind::For)?;
        let target = self.parse_target()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let key = self.parse_expr()?;
        self.expect(&TokenKind::FatArrow)?;
        let value = self.parse_expr()?;

        let condition = if self.check(&TokenKind::If) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        self.expect(&TokenKind::RBrace)?;
        let span = join(start, self.previous.span);

        Ok(Expr::ForObject(ForObjectExpr {
            target,
            iter: Box::new(iter),
            key: Box::new(key),
            value: Box::new(value),
            condition,
            span,
        }))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&TokenKind::RParen) {
                    break;
                }
                args.push(self.parse_expr()?);
            }
        }

        Ok(args)
    }

    fn parse_list_elements(&mut self) -> Result<Vec<Expr>> {
        let mut elements = Vec::new();

        if !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expr()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expr()?);
            }
        }

        Ok(elements)
    }

    fn parse_object_entries(&mut self) -> Result<Vec<(Expr, Expr)>> {
        let mut entries = Vec::new();

        if !self.check(&TokenKind::RBrace) {
            entries.push(self.parse_object_entry()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                entries.push(self.parse_object_entry()?);
            }
        }

        Ok(entries)
    }

    /// One `key = value` entry; `:` is accepted in place of `=`
    fn parse_object_entry(&mut self) -> Result<(Expr, Expr)> {
        // A naked identifier key is a literal name, not a variable reference
        let key = if let TokenKind::Ident(name) = &self.current.kind {
            let key = Expr::Literal(Literal::String(name.clone(), self.current.span));
            self.advance();
            key
        } else {
            self.parse_expr()?
        };

        if self.check(&TokenKind::Assign) || self.check(&TokenKind::Colon) {
            self.advance();
        } else {
            return Err(self.syntax_error("`=` or `:`".to_string()));
        }

        let value = self.parse_expr()?;
        Ok((key, value))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn next_raw(&mut self) -> Token {
        self.tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, self.end, 0))
    }

    fn advance(&mut self) {
        let next = self.pending.take().unwrap_or_else(|| self.next_raw());
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error(describe(kind)))
        }
    }

    /// Expect the closing `}` of a marker and clear the open-marker state
    fn expect_close(&mut self) -> Result<()> {
        self.expect(&TokenKind::CodeClose { strip: false })?;
        self.open_marker = None;
        Ok(())
    }

    /// Expect a `%{` and record it as the open marker
    fn expect_directive_open(&mut self) -> Result<()> {
        let span = self.current.span;
        self.expect(&TokenKind::DirectiveOpen { strip: false })?;
        self.open_marker = Some(("%{", span));
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        if let TokenKind::Ident(name) = &self.current.kind {
            let name = name.clone();
            let span = self.current.span;
            self.advance();
            Ok(Ident { name, span })
        } else {
            Err(self.syntax_error("identifier".to_string()))
        }
    }

    /// Build the error for an unexpected current token
    ///
    /// EOF inside an unclosed marker is reported as unterminated, pointing at
    /// the marker that was never closed rather than at the end of input.
    fn syntax_error(&self, expected: String) -> Error {
        if self.is_at_end() {
            if let Some((marker, span)) = self.open_marker {
                return Error::Unterminated {
                    marker,
                    span,
                    src: self.source.named_source(),
                };
            }
        }
        let found = match &self.current.kind {
            TokenKind::Text(_) => "text".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Error(message) => message.clone(),
            other => describe(other),
        };
        Error::Syntax {
            expected,
            found,
            span: self.current.span,
            src: self.source.named_source(),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = join(left.span(), right.span());
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    })
}

/// Human-readable token description for diagnostics
fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::InterpOpen { .. } => "`${`".to_string(),
        TokenKind::DirectiveOpen { .. } => "`%{`".to_string(),
        TokenKind::CodeClose { .. } => "`}`".to_string(),
        TokenKind::String(_) => "string".to_string(),
        TokenKind::Number(_) => "number".to_string(),
        TokenKind::Ident(_) => "identifier".to_string(),
        TokenKind::If => "`if`".to_string(),
        TokenKind::Else => "`else`".to_string(),
        TokenKind::Endif => "`endif`".to_string(),
        TokenKind::For => "`for`".to_string(),
        TokenKind::Endfor => "`endfor`".to_string(),
        TokenKind::In => "`in`".to_string(),
        TokenKind::True => "`true`".to_string(),
        TokenKind::False => "`false`".to_string(),
        TokenKind::Null => "`null`".to_string(),
        TokenKind::Dot => "`.`".to_string(),
        TokenKind::Comma => "`,`".to_string(),
        TokenKind::Colon => "`:`".to_string(),
        TokenKind::Question => "`?`".to_string(),
        TokenKind::LParen => "`(`".to_string(),
        TokenKind::RParen => "`)`".to_string(),
        TokenKind::LBracket => "`[`".to_string(),
        TokenKind::RBracket => "`]`".to_string(),
        TokenKind::LBrace => "`{`".to_string(),
        TokenKind::RBrace => "`}`".to_string(),
        TokenKind::Assign => "`=`".to_string(),
        TokenKind::FatArrow => "`=>`".to_string(),
        other => format!("{other:?}"),
    }
}
