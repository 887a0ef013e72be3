//! Pull-based lexer over the raw scanner.

use crate::keywords::KeywordTable;
use crate::{Lexeme, Token, TokenKind};
use chtl_ast::foundation::Span;
use logos::Logos;
use std::ops::Range;
use std::rc::Rc;

/// Classifying, position-tracking lexer.
///
/// Hands out one [`Token`] per call to [`next_token`](Lexer::next_token) and
/// keeps returning `Eof` once the input is exhausted.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Lexeme>,
    source: &'src str,
    keywords: KeywordTable,
    file_id: u16,
    line: u32,
    /// Byte offset where `line` starts
    line_start: usize,
    /// Newlines before this offset have been counted
    scanned: usize,
    finished: bool,
}

/// Verbatim body of a `{ ... }` block read by [`Lexer::read_raw_block`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// Content between the braces, trimmed
    pub text: String,
    /// Untrimmed content span
    pub span: Span,
    /// The balancing `}`; `None` when input ended first
    pub close: Option<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, keywords: KeywordTable) -> Self {
        Self::with_file(source, keywords, 0)
    }

    /// Lexer whose spans carry `file_id`.
    pub fn with_file(source: &'src str, keywords: KeywordTable, file_id: u16) -> Self {
        Self {
            inner: Lexeme::lexer(source),
            source,
            keywords,
            file_id,
            line: 1,
            line_start: 0,
            scanned: 0,
            finished: false,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn file_id(&self) -> u16 {
        self.file_id
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Keyword aliases registered here apply to every token lexed afterwards.
    pub fn keywords_mut(&mut self) -> &mut KeywordTable {
        &mut self.keywords
    }

    /// Produce the next token; `Eof` at and after end of input.
    pub fn next_token(&mut self) -> Token {
        let Some(result) = self.inner.next() else {
            let end = self.source.len();
            return self.make_token(TokenKind::Eof, "", end..end);
        };

        let range = self.inner.span();
        let slice = self.inner.slice();
        let (kind, literal) = match result {
            Ok(Lexeme::Word) => (self.classify_word(slice), slice),
            Ok(Lexeme::BlockWord) => {
                let name = &slice[1..slice.len() - 1];
                match self.keywords.block(name) {
                    Some(block) => (TokenKind::Block(block), name),
                    None => (TokenKind::Illegal, slice),
                }
            }
            Ok(Lexeme::Str) => (TokenKind::Str, &slice[1..slice.len() - 1]),
            Ok(Lexeme::GeneratorComment) => (TokenKind::GeneratorComment, slice[2..].trim_end()),
            Ok(other) => (TokenKind::from(other), slice),
            Err(_) => (TokenKind::Illegal, slice),
        };
        self.make_token(kind, literal, range)
    }

    /// Re-run keyword classification on an already lexed token.
    ///
    /// Used after a `[Name]` block registered aliases while the parser was
    /// already holding lookahead tokens.
    pub fn reclassify(&self, token: &mut Token) {
        if matches!(token.kind, TokenKind::Ident | TokenKind::Keyword(_)) {
            token.kind = self.classify_word(&token.literal);
        }
    }

    /// Read the verbatim body of a block whose `{` was the last token lexed.
    ///
    /// The body is not tokenized, so script and origin content may contain
    /// anything. Braces are balanced by counting, skipping over quoted
    /// strings. A quote with no closing partner (on the same line, for `'`
    /// and `"`) is ordinary text.
    pub fn read_raw_block(&mut self) -> RawBlock {
        let start = self.inner.span().end;
        let rest = self.inner.remainder();

        let bytes = rest.as_bytes();
        let mut depth = 1usize;
        let mut close_at = None;
        let mut idx = 0;
        while idx < bytes.len() {
            match bytes[idx] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close_at = Some(idx);
                        break;
                    }
                }
                quote @ (b'"' | b'\'' | b'`') => {
                    if let Some(len) = quoted_len(&bytes[idx + 1..], quote) {
                        idx += len + 1;
                    }
                }
                _ => {}
            }
            idx += 1;
        }

        let body_len = close_at.unwrap_or(rest.len());
        let text = rest[..body_len].trim().to_string();
        let span = self.span_for(start..start + body_len);

        let close = close_at.map(|idx| {
            self.inner.bump(idx + 1);
            let brace = start + idx;
            self.make_token(TokenKind::RBrace, "}", brace..brace + 1)
        });
        if close.is_none() {
            self.inner.bump(rest.len());
        }

        RawBlock { text, span, close }
    }

    fn classify_word(&self, word: &str) -> TokenKind {
        self.keywords
            .keyword(word)
            .map_or(TokenKind::Ident, TokenKind::Keyword)
    }

    fn make_token(&mut self, kind: TokenKind, literal: &str, range: Range<usize>) -> Token {
        let span = self.span_for(range.clone());
        let column = self.source[self.line_start..range.start].chars().count() as u32 + 1;
        Token {
            kind,
            literal: Rc::from(literal),
            span,
            line: self.line,
            column,
        }
    }

    /// Span for a byte range, advancing line tracking up to its start.
    fn span_for(&mut self, range: Range<usize>) -> Span {
        if range.start > self.scanned {
            let skipped = &self.source.as_bytes()[self.scanned..range.start];
            for (idx, byte) in skipped.iter().enumerate() {
                if *byte == b'\n' {
                    self.line += 1;
                    self.line_start = self.scanned + idx + 1;
                }
            }
            self.scanned = range.start;
        }
        Span::new(
            self.file_id,
            range.start as u32,
            range.end as u32,
            self.line,
        )
    }
}

/// Bytes up to the quote closing a string whose opening quote was just
/// passed. Backslash escapes are honoured; `'` and `"` strings end at a
/// newline, template strings may span lines.
fn quoted_len(bytes: &[u8], quote: u8) -> Option<usize> {
    let mut escaped = false;
    for (idx, &byte) in bytes.iter().enumerate() {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'\n' if quote != b'`' => return None,
            _ if byte == quote => return Some(idx),
            _ => {}
        }
    }
    None
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Tokens up to, not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
            return None;
        }
        Some(token)
    }
}
