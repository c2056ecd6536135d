//! Lexer for the template language
//!
//! Two-mode scanner: raw text until a `${` or `%{` marker, then expression
//! code until the matching `}`. `$${` and `%%{` escape a marker into literal
//! text; `${~`, `%{~` and `~}` carry a strip flag the parser uses to trim
//! adjacent literal whitespace.

use crate::ast::Span;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            span: Span::new(offset.into(), len),
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Text(String),    // Raw template text, escapes already unescaped
    String(String),  // "string"
    Number(Decimal), // 123, 1.25, 1e3
    Ident(String),   // variable_name

    // Keywords
    If,
    Else,
    Endif,
    For,
    Endfor,
    In,
    True,
    False,
    Null,

    // Delimiters
    InterpOpen { strip: bool },    // ${ or ${~
    DirectiveOpen { strip: bool }, // %{ or %{~
    CodeClose { strip: bool },     // } or ~}

    // Operators
    Dot,      // .
    Comma,    // ,
    Colon,    // :
    Question, // ?
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // { (object literal, inside code)
    RBrace,   // }
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    Bang,     // !
    Assign,   // =
    FatArrow, // =>
    Eq,       // ==
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    AndAnd,   // &&
    OrOr,     // ||

    // Special
    Eof,
    Error(String),
}

impl TokenKind {
    /// Map an identifier to a keyword token where one exists
    pub fn from_ident(s: &str) -> TokenKind {
        match s {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "endif" => TokenKind::Endif,
            "for" => TokenKind::For,
            "endfor" => TokenKind::Endfor,
            "in" => TokenKind::In,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(s.to_string()),
        }
    }
}

/// Lexer state (owns the source string via Arc for cheap cloning)
pub struct Lexer {
    source: Arc<String>,
    /// Current byte position in source
    pos: usize,
    /// Are we inside a marker (vs raw text)?
    in_code: bool,
    /// Open `{` braces inside code; `}` at depth zero closes the marker
    brace_depth: usize,
}

impl Lexer {
    pub fn new(source: Arc<String>) -> Self {
        Self {
            source,
            pos: 0,
            in_code: false,
            brace_depth: 0,
        }
    }

    /// Get the source string
    pub fn source(&self) -> &Arc<String> {
        &self.source
    }

    /// Peek at the next character without consuming
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    /// Peek at the next n bytes as a string slice
    fn peek_n(&self, n: usize) -> Option<&str> {
        if self.pos + n <= self.source.len() {
            Some(&self.source[self.pos..self.pos + n])
        } else {
            None
        }
    }

    /// Advance by one character and return it
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace (only when in code mode)
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        if self.in_code {
            self.lex_code()
        } else {
            self.lex_text()
        }
    }

    /// True if the source at `pos` starts an unescaped marker
    fn at_marker(&self) -> bool {
        matches!(self.peek_n(2), Some("${" | "%{"))
    }

    /// Lex raw template text until we hit a marker
    fn lex_text(&mut self) -> Token {
        let start = self.pos;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            // `$${` and `%%{` unescape to a single literal marker
            if (c == '$' && self.peek_n(3) == Some("$${"))
                || (c == '%' && self.peek_n(3) == Some("%%{"))
            {
                self.pos += 2;
                text.push(c);
                text.push('{');
                self.pos += 1;
                continue;
            }
            if self.at_marker() {
                break;
            }
            text.push(self.advance().unwrap());
        }

        if text.is_empty() {
            // Must be at a marker or EOF
            self.lex_marker_or_eof()
        } else {
            Token::new(TokenKind::Text(text), start, self.pos - start)
        }
    }

    /// Lex an opening marker or EOF
    fn lex_marker_or_eof(&mut self) -> Token {
        let start = self.pos;

        match self.peek_n(2) {
            Some("${") => {
                self.pos += 2;
                self.in_code = true;
                self.brace_depth = 0;
                let strip = self.eat_strip();
                Token::new(TokenKind::InterpOpen { strip }, start, self.pos - start)
            }
            Some("%{") => {
                self.pos += 2;
                self.in_code = true;
                self.brace_depth = 0;
                let strip = self.eat_strip();
                Token::new(TokenKind::DirectiveOpen { strip }, start, self.pos - start)
            }
            _ => Token::new(TokenKind::Eof, start, 0),
        }
    }

    /// Consume a `~` strip flag right after an opening marker
    fn eat_strip(&mut self) -> bool {
        if self.peek() == Some('~') {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Lex code (inside `${ }` or `%{ }`)
    fn lex_code(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        // Two-character operators and the stripping close
        if let Some(next2) = self.peek_n(2) {
            let kind = match next2 {
                "~}" if self.brace_depth == 0 => {
                    self.in_code = false;
                    Some(TokenKind::CodeClose { strip: true })
                }
                "==" => Some(TokenKind::Eq),
                "!=" => Some(TokenKind::Ne),
                "<=" => Some(TokenKind::Le),
                ">=" => Some(TokenKind::Ge),
                "&&" => Some(TokenKind::AndAnd),
                "||" => Some(TokenKind::OrOr),
                "=>" => Some(TokenKind::FatArrow),
                _ => None,
            };
            if let Some(kind) = kind {
                self.pos += 2;
                return Token::new(kind, start, 2);
            }
        }

        // Single character or longer tokens
        match self.peek() {
            None => Token::new(TokenKind::Eof, start, 0),
            Some(c) => match c {
                '}' => {
                    self.advance();
                    if self.brace_depth == 0 {
                        self.in_code = false;
                        Token::new(TokenKind::CodeClose { strip: false }, start, 1)
                    } else {
                        self.brace_depth -= 1;
                        Token::new(TokenKind::RBrace, start, 1)
                    }
                }
                '{' => {
                    self.advance();
                    self.brace_depth += 1;
                    Token::new(TokenKind::LBrace, start, 1)
                }
                '.' => {
                    self.advance();
                    Token::new(TokenKind::Dot, start, 1)
                }
                ',' => {
                    self.advance();
                    Token::new(TokenKind::Comma, start, 1)
                }
                ':' => {
                    self.advance();
                    Token::new(TokenKind::Colon, start, 1)
                }
                '?' => {
                    self.advance();
                    Token::new(TokenKind::Question, start, 1)
                }
                '(' => {
                    self.advance();
                    Token::new(TokenKind::LParen, start, 1)
                }
                ')' => {
                    self.advance();
                    Token::new(TokenKind::RParen, start, 1)
                }
                '[' => {
                    self.advance();
                    Token::new(TokenKind::LBracket, start, 1)
                }
                ']' => {
                    self.advance();
                    Token::new(TokenKind::RBracket, start, 1)
                }
                '+' => {
                    self.advance();
                    Token::new(TokenKind::Plus, start, 1)
                }
                '-' => {
                    self.advance();
                    Token::new(TokenKind::Minus, start, 1)
                }
                '*' => {
                    self.advance();
                    Token::new(TokenKind::Star, start, 1)
                }
                '/' => {
                    self.advance();
                    Token::new(TokenKind::Slash, start, 1)
                }
                '%' => {
                    self.advance();
                    Token::new(TokenKind::Percent, start, 1)
                }
                '!' => {
                    self.advance();
                    Token::new(TokenKind::Bang, start, 1)
                }
                '=' => {
                    self.advance();
                    Token::new(TokenKind::Assign, start, 1)
                }
                '<' => {
                    self.advance();
                    Token::new(TokenKind::Lt, start, 1)
                }
                '>' => {
                    self.advance();
                    Token::new(TokenKind::Gt, start, 1)
                }
                '"' => self.lex_string(),
                '0'..='9' => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_ident(),
                _ => {
                    self.advance();
                    Token::new(
                        TokenKind::Error(format!("unexpected character `{c}`")),
                        start,
                        self.pos - start,
                    )
                }
            },
        }
    }

    /// Lex a string literal
    fn lex_string(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // consume opening quote

        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Token::new(
                        TokenKind::Error("unclosed string".to_string()),
                        start,
                        self.pos - start,
                    );
                }
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                Some(c) => value.push(c),
            }
        }

        Token::new(TokenKind::String(value), start, self.pos - start)
    }

    /// Lex a decimal number literal, optionally with fraction and exponent
    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();
        let mut has_exponent = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(self.advance().unwrap());
            } else if c == '.' && !has_exponent {
                // Only a fraction if a digit follows, otherwise it's attribute
                // access on a number (unlikely but the dot is not ours)
                let rest = &self.source[self.pos + 1..];
                if rest.chars().next().is_some_and(|d| d.is_ascii_digit()) {
                    s.push('.');
                    self.advance();
                } else {
                    break;
                }
            } else if (c == 'e' || c == 'E') && !has_exponent {
                let rest = &self.source[self.pos + c.len_utf8()..];
                let mut chars = rest.chars();
                let next = chars.next();
                let after_sign = matches!(next, Some('+' | '-'))
                    && chars.next().is_some_and(|d| d.is_ascii_digit());
                if next.is_some_and(|d| d.is_ascii_digit()) || after_sign {
                    has_exponent = true;
                    s.push('e');
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        s.push(sign);
                        self.advance();
                    }
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let parsed = if has_exponent {
            Decimal::from_scientific(&s)
        } else {
            s.parse::<Decimal>()
        };

        match parsed {
            Ok(value) => Token::new(TokenKind::Number(value), start, self.pos - start),
            Err(_) => Token::new(
                TokenKind::Error(format!("invalid number literal `{s}`")),
                start,
                self.pos - start,
            ),
        }
    }

    /// Lex an identifier or keyword
    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(self.advance().unwrap());
            } else {
                break;
            }
        }

        let kind = TokenKind::from_ident(&s);
        Token::new(kind, start, self.pos - start)
    }
}

/// Tokenize a whole source, applying strip markers to adjacent text
///
/// `${~` / `%{~` trim trailing whitespace from the literal run before them;
/// `~}` trims leading whitespace from the run after. Spans of trimmed text
/// tokens are adjusted to keep covering only the surviving bytes.
pub fn tokenize(source: Arc<String>) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let at_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if at_eof {
            break;
        }
    }

    for i in 0..tokens.len() {
        match tokens[i].kind {
            TokenKind::InterpOpen { strip: true } | TokenKind::DirectiveOpen { strip: true } => {
                if i > 0 {
                    let span = tokens[i - 1].span;
                    if let TokenKind::Text(text) = &mut tokens[i - 1].kind {
                        let trimmed = text.trim_end().len();
                        let removed = text.len() - trimmed;
                        text.truncate(trimmed);
                        tokens[i - 1].span = Span::new(span.offset().into(), span.len() - removed);
                    }
                }
            }
            TokenKind::CodeClose { strip: true } => {
                if let Some(next) = tokens.get_mut(i + 1) {
                    let span = next.span;
                    if let TokenKind::Text(text) = &mut next.kind {
                        let removed = text.len() - text.trim_start().len();
                        text.drain(..removed);
                        next.span =
                            Span::new((span.offset() + removed).into(), span.len() - removed);
                    }
                }
            }
            _ => {}
        }
    }

    tokens
}

/// Iterator implementation for convenient use
impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if matches!(token.kind, TokenKind::Eof) {
            None
        } else {
            Some(token)
        }
    }
}
