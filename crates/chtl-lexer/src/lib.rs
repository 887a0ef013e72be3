// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for CHTL.
//!
//! Tokenization runs in two layers:
//!
//! - [`Lexeme`] - the raw logos scanner: punctuation, words, numbers,
//!   strings, bracketed block words and generator comments. `//` and `/* */`
//!   comments and whitespace are skipped here.
//! - [`Lexer`] - wraps the scanner, classifies words through a
//!   [`KeywordTable`] and attaches line/column/span information. It never
//!   fails: anything the scanner rejects becomes an [`TokenKind::Illegal`]
//!   token so the parser keeps control of recovery.
//!
//! The lexer is pulled one token at a time, which lets the parser switch to
//! raw mode for `script { ... }` and `[Origin]` bodies via
//! [`Lexer::read_raw_block`].
//!
//! # Examples
//!
//! ```
//! # use chtl_lexer::*;
//! let tokens: Vec<Token> = Lexer::new("div { text { \"hi\" } }", KeywordTable::default()).collect();
//! assert_eq!(tokens[0].kind, TokenKind::Ident);
//! assert_eq!(tokens[2].kind, TokenKind::Keyword(Keyword::Text));
//! ```

mod keywords;
mod lexer;

pub use keywords::{BlockKind, Keyword, KeywordTable};
pub use lexer::{Lexer, RawBlock};

use chtl_ast::foundation::Span;
use logos::Logos;
use std::fmt;
use std::rc::Rc;

/// Raw scanner output.
///
/// Words, numbers and strings carry no payload; their text is taken from the
/// source slice by [`Lexer`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip // comments
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")] // Skip /* */ comments
pub enum Lexeme {
    /// `# text` - preserved and re-emitted as an HTML comment
    #[regex(r"# [^\n]*")]
    GeneratorComment,

    /// `[Word]`
    #[regex(r"\[[A-Za-z][A-Za-z0-9_]*\]")]
    BlockWord,

    /// Identifier; hyphens allowed after the first character
    #[regex(r"[A-Za-z_][A-Za-z0-9_-]*")]
    Word,

    #[regex(r"[0-9]+(\.[0-9]*)?")]
    Number,

    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Str,

    #[token("**")]
    Power,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("&")]
    Ampersand,
    #[token("@")]
    At,
    #[token("#")]
    Hash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Classified token kind as seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    /// Recognised `[Template]`-style block keyword
    Block(BlockKind),
    Number,
    /// String literal; `literal` holds the text without quotes
    Str,
    /// `# text`; `literal` holds the text after `# `
    GeneratorComment,
    Power,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Gt,
    Lt,
    Question,
    Colon,
    Equals,
    Semicolon,
    Comma,
    Dot,
    Ampersand,
    At,
    Hash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// Unrecognised character or unknown block keyword; `literal` is the raw text
    Illegal,
    Eof,
}

impl TokenKind {
    /// Fixed spelling of punctuation kinds, used in diagnostics.
    pub fn describe(self) -> String {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Keyword(kw) => return format!("keyword '{}'", kw.default_word()),
            TokenKind::Block(block) => return format!("'[{}]'", block.name()),
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::GeneratorComment => "comment",
            TokenKind::Power => "'**'",
            TokenKind::Star => "'*'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::Question => "'?'",
            TokenKind::Colon => "':'",
            TokenKind::Equals => "'='",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Ampersand => "'&'",
            TokenKind::At => "'@'",
            TokenKind::Hash => "'#'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Illegal => "illegal token",
            TokenKind::Eof => "end of input",
        };
        s.to_string()
    }
}

impl From<Lexeme> for TokenKind {
    /// Direct mapping for punctuation. Words, block words and literals are
    /// classified by [`Lexer`], which has the keyword table.
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::GeneratorComment => TokenKind::GeneratorComment,
            Lexeme::BlockWord => TokenKind::Illegal,
            Lexeme::Word => TokenKind::Ident,
            Lexeme::Number => TokenKind::Number,
            Lexeme::Str => TokenKind::Str,
            Lexeme::Power => TokenKind::Power,
            Lexeme::Star => TokenKind::Star,
            Lexeme::Plus => TokenKind::Plus,
            Lexeme::Minus => TokenKind::Minus,
            Lexeme::Slash => TokenKind::Slash,
            Lexeme::Percent => TokenKind::Percent,
            Lexeme::Gt => TokenKind::Gt,
            Lexeme::Lt => TokenKind::Lt,
            Lexeme::Question => TokenKind::Question,
            Lexeme::Colon => TokenKind::Colon,
            Lexeme::Equals => TokenKind::Equals,
            Lexeme::Semicolon => TokenKind::Semicolon,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Dot => TokenKind::Dot,
            Lexeme::Ampersand => TokenKind::Ampersand,
            Lexeme::At => TokenKind::At,
            Lexeme::Hash => TokenKind::Hash,
            Lexeme::LParen => TokenKind::LParen,
            Lexeme::RParen => TokenKind::RParen,
            Lexeme::LBrace => TokenKind::LBrace,
            Lexeme::RBrace => TokenKind::RBrace,
            Lexeme::LBracket => TokenKind::LBracket,
            Lexeme::RBracket => TokenKind::RBracket,
        }
    }
}

/// One classified token.
///
/// Uses `Rc<str>` for the literal so tokens stay cheap to clone through the
/// parser's lookahead.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: Rc<str>,
    pub span: Span,
    /// 1-based
    pub line: u32,
    /// 1-based, in characters
    pub column: u32,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Text usable as a plain word: identifiers and keywords.
    ///
    /// Keywords such as `top` or `after` are ordinary CSS values, so every
    /// position that accepts a name accepts them too.
    pub fn word(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Ident | TokenKind::Keyword(_) => Some(&self.literal),
            _ => None,
        }
    }

    /// Whether `next` starts exactly where `self` ends, with no whitespace.
    pub fn touches(&self, next: &Token) -> bool {
        self.span.end == next.span.start
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "\"{}\"", self.literal),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Block(block) => write!(f, "[{}]", block.name()),
            _ => write!(f, "{}", self.literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test helper: lex and keep only the kinds.
    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, KeywordTable::default())
            .map(|t| t.kind)
            .collect()
    }

    /// Test helper: lex and keep only the literals.
    fn literals(source: &str) -> Vec<String> {
        Lexer::new(source, KeywordTable::default())
            .map(|t| t.literal.to_string())
            .collect()
    }

    #[test]
    fn test_raw_scanner_prefers_power() {
        let raw: Vec<_> = Lexeme::lexer("** * ***").filter_map(Result::ok).collect();
        assert_eq!(raw, vec![Lexeme::Power, Lexeme::Star, Lexeme::Power, Lexeme::Star]);
    }

    #[test]
    fn test_identifiers_allow_hyphens() {
        assert_eq!(literals("font-size my_var x1"), vec!["font-size", "my_var", "x1"]);
        assert_eq!(kinds("font-size"), vec![TokenKind::Ident]);
    }

    #[test]
    fn test_keywords_classified() {
        assert_eq!(
            kinds("text style script delete insert except"),
            vec![
                TokenKind::Keyword(Keyword::Text),
                TokenKind::Keyword(Keyword::Style),
                TokenKind::Keyword(Keyword::Script),
                TokenKind::Keyword(Keyword::Delete),
                TokenKind::Keyword(Keyword::Insert),
                TokenKind::Keyword(Keyword::Except),
            ]
        );
    }

    #[test]
    fn test_block_keywords() {
        assert_eq!(
            kinds("[Template] [Custom] [Import] [Namespace] [Origin] [Configuration] [Name]"),
            vec![
                TokenKind::Block(BlockKind::Template),
                TokenKind::Block(BlockKind::Custom),
                TokenKind::Block(BlockKind::Import),
                TokenKind::Block(BlockKind::Namespace),
                TokenKind::Block(BlockKind::Origin),
                TokenKind::Block(BlockKind::Configuration),
                TokenKind::Block(BlockKind::Name),
            ]
        );
    }

    #[test]
    fn test_unknown_block_keyword_is_illegal() {
        let tokens: Vec<_> = Lexer::new("[Bogus] div", KeywordTable::default()).collect();
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(&*tokens[0].literal, "[Bogus]");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn test_bracket_without_letter_is_plain() {
        assert_eq!(
            kinds("div[1]"),
            vec![
                TokenKind::Ident,
                TokenKind::LBracket,
                TokenKind::Number,
                TokenKind::RBracket
            ]
        );
    }

    #[test]
    fn test_strings_strip_quotes() {
        assert_eq!(literals(r#""hello" 'world'"#), vec!["hello", "world"]);
        assert_eq!(kinds(r#""a" 'b'"#), vec![TokenKind::Str, TokenKind::Str]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(literals("100 1.5 0 1."), vec!["100", "1.5", "0", "1."]);
        assert_eq!(
            kinds("100px"),
            vec![TokenKind::Number, TokenKind::Ident]
        );
    }

    #[test]
    fn test_comments() {
        let tokens: Vec<_> = Lexer::new(
            "// line\ndiv /* block\n */ # kept comment\nspan",
            KeywordTable::default(),
        )
        .collect();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ident, TokenKind::GeneratorComment, TokenKind::Ident]
        );
        assert_eq!(&*tokens[1].literal, "kept comment");
    }

    #[test]
    fn test_hash_without_space_is_punctuation() {
        assert_eq!(
            kinds("#box #fff"),
            vec![
                TokenKind::Hash,
                TokenKind::Ident,
                TokenKind::Hash,
                TokenKind::Ident
            ]
        );
    }

    #[test]
    fn test_operators_and_delimiters() {
        assert_eq!(
            kinds("+ - * / % ** > < ? : = ; , . & @ ( ) { }"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Power,
                TokenKind::Gt,
                TokenKind::Lt,
                TokenKind::Question,
                TokenKind::Colon,
                TokenKind::Equals,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Ampersand,
                TokenKind::At,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_unrecognized_character_is_illegal_and_lexing_continues() {
        let tokens: Vec<_> = Lexer::new("div $ span", KeywordTable::default()).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(&*tokens[1].literal, "$");
        assert_eq!(tokens[2].kind, TokenKind::Ident);
    }

    #[test]
    fn test_unterminated_string_is_illegal() {
        let tokens: Vec<_> = Lexer::new("\"abc", KeywordTable::default()).collect();
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens: Vec<_> =
            Lexer::new("div {\n  span {}\n}", KeywordTable::default()).collect();
        let positions: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (1, 5), (2, 3), (2, 8), (2, 9), (3, 1)]
        );
        assert_eq!(tokens[2].span.start_line, 2);
    }

    #[test]
    fn test_token_touches() {
        let tokens: Vec<_> = Lexer::new("10px 10 px", KeywordTable::default()).collect();
        assert!(tokens[0].touches(&tokens[1]));
        assert!(!tokens[2].touches(&tokens[3]));
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<_> = Lexer::new("\"a\" [Custom] x", KeywordTable::default()).collect();
        assert_eq!(tokens[0].to_string(), "\"a\"");
        assert_eq!(tokens[1].to_string(), "[Custom]");
        assert_eq!(tokens[2].to_string(), "x");
    }
}
