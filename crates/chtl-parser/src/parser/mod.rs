//! Hand-written recursive descent parser for CHTL documents.
//!
//! ## Architecture
//!
//! - `stream`: token stream with lazy lookahead and raw-block reads
//! - `error`: `ParseError` and its conversion into `CompileError`
//! - `expr`: precedence climbing for property values
//! - `element`: elements, attributes, text, style and script blocks
//! - `definition`: `[Template]`/`[Custom]` definitions, namespaces,
//!   `[Configuration]`, `[Origin]`, `except` and `use`
//! - `usage`: `@Type Name` usages with specializations, `[Import]`
//!
//! One [`Parser`] handles one document. It allocates nodes into that
//! document's [`Ast`] and records, in source order, every definition and
//! import it sees as a [`SymbolEvent`]. Registries are not built here: the
//! program builder replays those events once every imported file is parsed.
//!
//! Errors never abort the document. A failing statement is recorded and the
//! stream is resynchronized at the next statement boundary.

mod definition;
mod element;
mod error;
mod expr;
mod stream;
mod usage;

pub use error::{ParseError, ParseErrorKind};
pub use stream::TokenStream;

use crate::ParseOptions;
use chtl_ast::{Ast, DefCategory, Import, Node, NodeId, Settings, Span, GLOBAL_NAMESPACE};
use chtl_lexer::{BlockKind, Keyword, Lexer, TokenKind};
use tracing::debug;

/// Definition or import seen while parsing, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolEvent {
    Define {
        category: DefCategory,
        namespace: String,
        name: String,
        node: NodeId,
    },
    /// Index into [`ParsedFile::imports`]
    Import(usize),
}

/// One `[Import]` statement awaiting resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    pub node: NodeId,
    pub import: Import,
    pub span: Span,
    /// Namespace active at the import statement
    pub namespace: String,
}

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub ast: Ast,
    pub imports: Vec<ImportRequest>,
    pub events: Vec<SymbolEvent>,
    pub errors: Vec<ParseError>,
    pub settings: Settings,
}

pub struct Parser<'src> {
    stream: TokenStream<'src>,
    ast: Ast,
    errors: Vec<ParseError>,
    imports: Vec<ImportRequest>,
    events: Vec<SymbolEvent>,
    settings: Settings,
    /// Enclosing `[Namespace]` names, innermost last
    namespaces: Vec<String>,
    depth: usize,
    max_depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, file_id: u16, options: &ParseOptions) -> Self {
        let lexer = Lexer::with_file(source, options.keywords.clone(), file_id);
        Self {
            stream: TokenStream::new(lexer),
            ast: Ast::new(file_id),
            errors: Vec::new(),
            imports: Vec::new(),
            events: Vec::new(),
            settings: Settings::default(),
            namespaces: Vec::new(),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    /// Parse the whole document.
    pub fn parse_file(mut self) -> ParsedFile {
        while !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            if self.stream.check(TokenKind::RBrace) {
                let token = self.stream.advance();
                self.errors
                    .push(ParseError::unexpected_token(&token, "at top level"));
                continue;
            }
            match self.parse_statement() {
                Ok(Some(id)) => self.ast.push_root(id),
                Ok(None) => {}
                Err(err) => self.recover(err),
            }
        }

        debug!(
            file_id = self.ast.file_id(),
            nodes = self.ast.len(),
            imports = self.imports.len(),
            errors = self.errors.len(),
            "parsed document"
        );

        ParsedFile {
            ast: self.ast,
            imports: self.imports,
            events: self.events,
            errors: self.errors,
            settings: self.settings,
        }
    }

    /// One statement of a document, element, namespace or element
    /// definition body. `Ok(None)` for statements that leave no node.
    pub(crate) fn parse_statement(&mut self) -> Result<Option<NodeId>, ParseError> {
        let span = self.stream.current_span();
        self.enter(span)?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Option<NodeId>, ParseError> {
        let token = self.stream.peek().clone();
        match token.kind {
            TokenKind::GeneratorComment => {
                self.stream.advance();
                Ok(Some(
                    self.alloc(Node::Comment(token.literal.to_string()), token.span),
                ))
            }
            TokenKind::Keyword(Keyword::Text) => self.parse_text().map(Some),
            TokenKind::Keyword(Keyword::Style) => self.parse_style_block().map(Some),
            TokenKind::Keyword(Keyword::Script) => self.parse_script().map(Some),
            TokenKind::Keyword(Keyword::Except) => self.parse_except().map(Some),
            TokenKind::Keyword(Keyword::Use) => self.parse_use().map(Some),
            TokenKind::Keyword(Keyword::If) => self.parse_if().map(Some),
            TokenKind::Block(BlockKind::Template) | TokenKind::Block(BlockKind::Custom) => {
                self.parse_definition().map(Some)
            }
            TokenKind::Block(BlockKind::Import) => self.parse_import().map(Some),
            TokenKind::Block(BlockKind::Namespace) => self.parse_namespace().map(Some),
            TokenKind::Block(BlockKind::Origin) => self.parse_origin().map(Some),
            TokenKind::Block(BlockKind::Configuration) => {
                self.parse_configuration()?;
                Ok(None)
            }
            TokenKind::At => self.parse_usage().map(Some),
            TokenKind::Ident if self.stream.check_next(TokenKind::LBrace) => {
                self.parse_element().map(Some)
            }
            TokenKind::Illegal => Err(ParseError::illegal(&token)),
            _ => Err(ParseError::unexpected_token(&token, "at start of statement")),
        }
    }

    /// Statements up to the `}` closing a block; the current token must be
    /// the opening `{`.
    pub(crate) fn parse_body(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.stream.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            match self.parse_statement() {
                Ok(Some(id)) => body.push(id),
                Ok(None) => {}
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(body)
    }

    /// Record an illegal token and step over it. Returns whether it did.
    pub(crate) fn skip_illegal(&mut self) -> bool {
        if !self.stream.check(TokenKind::Illegal) {
            return false;
        }
        let token = self.stream.advance();
        self.errors.push(ParseError::illegal(&token));
        true
    }

    pub(crate) fn recover(&mut self, err: ParseError) {
        debug!(error = %err, "recovering");
        // Every unclosed block fails at the same end of input; one report is enough.
        let repeated_eof = err.kind == ParseErrorKind::UnexpectedEof
            && self
                .errors
                .last()
                .is_some_and(|last| last.kind == ParseErrorKind::UnexpectedEof);
        if !repeated_eof {
            self.errors.push(err);
        }
        self.stream.synchronize();
    }

    pub(crate) fn enter(&mut self, span: Span) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::depth_limit(self.max_depth, span));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        self.ast.alloc(node, span)
    }

    /// Innermost enclosing namespace, or the global one.
    pub(crate) fn current_namespace(&self) -> &str {
        self.namespaces
            .last()
            .map(String::as_str)
            .unwrap_or(GLOBAL_NAMESPACE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chtl_ast::{CompileError, Expr};

    /// Test helper: parse `src` as one property value that must span the
    /// whole input.
    pub(crate) fn parse_expr(src: &str) -> Result<Expr, ParseError> {
        let options = ParseOptions::default();
        let mut parser = Parser::new(src, 0, &options);
        let expr = parser.parse_value()?;
        if !parser.stream.at_end() {
            return Err(ParseError::unexpected_token(
                parser.stream.peek(),
                "after expression",
            ));
        }
        Ok(expr)
    }

    pub(crate) fn parse(src: &str) -> ParsedFile {
        Parser::new(src, 0, &ParseOptions::default()).parse_file()
    }

    pub(crate) fn root(file: &ParsedFile, index: usize) -> &Node {
        let id = file.ast.roots()[index];
        file.ast.get(id).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let file = parse("");
        assert!(file.ast.roots().is_empty());
        assert!(file.errors.is_empty());
    }

    #[test]
    fn test_comment_statement() {
        let file = parse("# header\ndiv {}");
        assert_eq!(root(&file, 0), &Node::Comment("header".into()));
        assert!(matches!(root(&file, 1), Node::Element(_)));
    }

    #[test]
    fn test_recovers_at_next_statement() {
        let file = parse("div { span ; p {} } section {}");
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.ast.roots().len(), 2);
        match root(&file, 0) {
            Node::Element(el) => assert_eq!(el.children.len(), 1),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_illegal_token_is_skipped() {
        let file = parse("div {} $ span {}");
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].kind, ParseErrorKind::IllegalToken);
        assert_eq!(file.ast.roots().len(), 2);

        let diagnostic = CompileError::from(file.errors[0].clone());
        assert_eq!(diagnostic.to_string(), "error: illegal token: unrecognized input '$'");
    }

    #[test]
    fn test_stray_closing_brace() {
        let file = parse("} div {}");
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.ast.roots().len(), 1);
    }

    #[test]
    fn test_unclosed_block_reports_eof() {
        let file = parse("div { span {");
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].kind, ParseErrorKind::UnexpectedEof);
        assert_eq!(file.errors[0].message, "expected '}', got end of input");
    }

    #[test]
    fn test_depth_limit() {
        let src = format!("{}{}", "div {".repeat(20), "}".repeat(20));
        let options = ParseOptions {
            max_depth: 8,
            ..ParseOptions::default()
        };
        let file = Parser::new(&src, 0, &options).parse_file();
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].kind, ParseErrorKind::DepthLimit);
    }

    #[test]
    fn test_definition_events_carry_namespace() {
        let file = parse(
            "[Template] @Style A { color: red; }\n\
             [Namespace] ui { [Custom] @Element B { div {} } }",
        );
        assert!(file.errors.is_empty(), "{:?}", file.errors);
        let defines: Vec<_> = file
            .events
            .iter()
            .map(|event| match event {
                SymbolEvent::Define {
                    category,
                    namespace,
                    name,
                    ..
                } => (*category, namespace.as_str(), name.as_str()),
                SymbolEvent::Import(_) => panic!("unexpected import"),
            })
            .collect();
        assert_eq!(
            defines,
            vec![
                (DefCategory::Template, GLOBAL_NAMESPACE, "A"),
                (DefCategory::Custom, "ui", "B"),
            ]
        );
    }
}
