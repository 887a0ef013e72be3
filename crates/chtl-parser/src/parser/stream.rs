//! Token stream wrapper for the hand-written parser.

use super::ParseError;
use chtl_ast::foundation::Span;
use chtl_lexer::{Lexer, RawBlock, Token, TokenKind};

/// Token stream with one token of lazy lookahead.
///
/// `peek()` is the next unconsumed token. The token after it is only lexed
/// when `peek_next()` asks for it, which keeps the lexer positioned directly
/// behind a `{` so raw blocks can be read verbatim.
pub struct TokenStream<'src> {
    lexer: Lexer<'src>,
    current: Token,
    next: Option<Token>,
    /// Span of the last consumed token
    last: Span,
}

impl<'src> TokenStream<'src> {
    pub fn new(mut lexer: Lexer<'src>) -> Self {
        let current = lexer.next_token();
        let last = Span::zero(lexer.file_id());
        Self {
            lexer,
            current,
            next: None,
            last,
        }
    }

    /// The next unconsumed token.
    pub fn peek(&self) -> &Token {
        &self.current
    }

    /// The token after `peek()`.
    pub fn peek_next(&mut self) -> &Token {
        let lexer = &mut self.lexer;
        self.next.get_or_insert_with(|| lexer.next_token())
    }

    /// Consume and return the current token. At end of input keeps
    /// returning `Eof`.
    pub fn advance(&mut self) -> Token {
        let following = match self.next.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        };
        let token = std::mem::replace(&mut self.current, following);
        if token.kind != TokenKind::Eof {
            self.last = token.span;
        }
        token
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub fn check_next(&mut self, kind: TokenKind) -> bool {
        self.peek_next().kind == kind
    }

    /// Consume the current token if it has `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail with "expected X, got Y".
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected_token(kind, &self.current))
        }
    }

    /// Consume an identifier or keyword and return its text.
    pub fn expect_word(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current.word() {
            Some(word) => {
                let word = word.to_string();
                self.advance();
                Ok(word)
            }
            None => Err(ParseError::expected(what, &self.current)),
        }
    }

    pub fn at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Span of the current token.
    pub fn current_span(&self) -> Span {
        self.current.span
    }

    /// Span from `start` through the last consumed token.
    pub fn span_from(&self, start: Span) -> Span {
        if self.last.file_id != start.file_id || self.last.end < start.start {
            return start;
        }
        start.merge(&self.last)
    }

    /// Read the verbatim body of the block opened by the current `{`.
    ///
    /// On success the stream is positioned after the closing `}`.
    pub fn raw_block(&mut self) -> Result<RawBlock, ParseError> {
        if !self.check(TokenKind::LBrace) {
            return Err(ParseError::expected_token(TokenKind::LBrace, &self.current));
        }
        if self.next.is_some() {
            return Err(ParseError::other(
                "raw block requested after lookahead",
                self.current.span,
            ));
        }
        self.last = self.current.span;
        let raw = self.lexer.read_raw_block();
        match &raw.close {
            Some(close) => {
                self.last = close.span;
                self.current = self.lexer.next_token();
                Ok(raw)
            }
            None => {
                self.current = self.lexer.next_token();
                Err(ParseError::expected_token(TokenKind::RBrace, &self.current))
            }
        }
    }

    /// Skip to the next statement boundary after an error.
    ///
    /// Stops after a `;` or after the `}` balancing a `{` opened while
    /// skipping; stops before a `}` that belongs to an enclosing block.
    pub fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Register keyword aliases and re-classify held lookahead.
    pub fn lexer_mut(&mut self) -> &mut Lexer<'src> {
        &mut self.lexer
    }

    pub fn reclassify_lookahead(&mut self) {
        self.lexer.reclassify(&mut self.current);
        if let Some(next) = self.next.as_mut() {
            self.lexer.reclassify(next);
        }
    }

    pub fn file_id(&self) -> u16 {
        self.lexer.file_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chtl_lexer::KeywordTable;

    fn stream(src: &str) -> TokenStream<'_> {
        TokenStream::new(Lexer::new(src, KeywordTable::default()))
    }

    #[test]
    fn test_peek_and_advance() {
        let mut s = stream("a { }");
        assert_eq!(&*s.peek().literal, "a");
        assert!(s.check_next(TokenKind::LBrace));
        assert_eq!(&*s.advance().literal, "a");
        assert!(s.eat(TokenKind::LBrace));
        assert!(s.expect(TokenKind::RBrace).is_ok());
        assert!(s.at_end());
        assert_eq!(s.advance().kind, TokenKind::Eof);
    }

    #[test]
    fn test_expect_reports_expected_and_found() {
        let mut s = stream("div");
        let err = s.expect(TokenKind::LBrace).unwrap_err();
        assert_eq!(err.message, "expected '{', got identifier 'div'");
    }

    #[test]
    fn test_synchronize_skips_statement() {
        let mut s = stream("width 10px; next");
        s.synchronize();
        assert_eq!(&*s.peek().literal, "next");
    }

    #[test]
    fn test_synchronize_skips_balanced_block() {
        let mut s = stream("oops { a { b } } next");
        s.synchronize();
        assert_eq!(&*s.peek().literal, "next");
    }

    #[test]
    fn test_synchronize_stops_at_enclosing_brace() {
        let mut s = stream("oops } next");
        s.synchronize();
        assert!(s.check(TokenKind::RBrace));
    }

    #[test]
    fn test_raw_block() {
        let mut s = stream("script { let x = {a: 1}; } div");
        s.advance();
        let raw = s.raw_block().unwrap();
        assert_eq!(raw.text, "let x = {a: 1};");
        assert_eq!(&*s.peek().literal, "div");
    }

    #[test]
    fn test_raw_block_refused_after_lookahead() {
        let mut s = stream("{ x }");
        s.peek_next();
        assert!(s.raw_block().is_err());
    }

    #[test]
    fn test_span_from() {
        let mut s = stream("div { }");
        let start = s.current_span();
        s.advance();
        s.advance();
        s.advance();
        let span = s.span_from(start);
        assert_eq!((span.start, span.end), (0, 7));
    }
}
