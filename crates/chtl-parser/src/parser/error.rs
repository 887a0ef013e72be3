//! Parse error types.

use chtl_ast::error::{CompileError, ErrorKind};
use chtl_ast::foundation::Span;
use chtl_lexer::{Token, TokenKind};
use std::fmt;

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token was expected and another one was found.
    UnexpectedToken,

    /// Input ended inside an unfinished construct (unclosed block, missing `;`).
    UnexpectedEof,

    /// Tokens are present but the construct is malformed, e.g. an unknown
    /// `@Type` or an `@`-usage followed by neither `;` nor `{`.
    InvalidSyntax,

    /// The lexer produced an illegal token.
    IllegalToken,

    /// Blocks or expressions nested deeper than the configured limit.
    DepthLimit,

    /// Import statement could not be satisfied.
    Import,

    /// Anything else, e.g. a rejected `[Configuration]` entry.
    Other,
}

impl ParseError {
    /// "expected X, got Y"
    pub fn expected_token(expected: TokenKind, found: &Token) -> Self {
        Self::expected(&expected.describe(), found)
    }

    /// "expected <what>, got Y" for expectations that are not one token kind.
    pub fn expected(what: &str, found: &Token) -> Self {
        Self {
            kind: if found.kind == TokenKind::Eof {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span: found.span,
            message: format!("expected {}, got {}", what, describe(found)),
        }
    }

    /// "unexpected Y <context>"
    pub fn unexpected_token(found: &Token, context: &str) -> Self {
        Self {
            kind: match found.kind {
                TokenKind::Eof => ParseErrorKind::UnexpectedEof,
                TokenKind::Illegal => ParseErrorKind::IllegalToken,
                _ => ParseErrorKind::UnexpectedToken,
            },
            span: found.span,
            message: format!("unexpected {} {}", describe(found), context),
        }
    }

    pub fn illegal(found: &Token) -> Self {
        Self {
            kind: ParseErrorKind::IllegalToken,
            span: found.span,
            message: format!("unrecognized input '{}'", found.literal),
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    pub fn depth_limit(limit: usize, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::DepthLimit,
            span,
            message: format!("nesting exceeds the limit of {} levels", limit),
        }
    }

    pub fn import(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Import,
            span,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Other,
            span,
            message: message.into(),
        }
    }
}

/// Token as it appears in messages: kind plus literal where useful.
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Ident | TokenKind::Number => {
            format!("{} '{}'", token.kind.describe(), token.literal)
        }
        TokenKind::Str => format!("string \"{}\"", token.literal),
        TokenKind::Illegal => format!("input '{}'", token.literal),
        kind => kind.describe(),
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.message, self.span.start_line)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        let kind = match err.kind {
            ParseErrorKind::IllegalToken => ErrorKind::Lex,
            ParseErrorKind::DepthLimit => ErrorKind::DepthLimit,
            ParseErrorKind::Import => ErrorKind::Import,
            ParseErrorKind::UnexpectedToken
            | ParseErrorKind::UnexpectedEof
            | ParseErrorKind::InvalidSyntax
            | ParseErrorKind::Other => ErrorKind::Syntax,
        };
        CompileError::new(kind, err.span, err.message)
    }
}
