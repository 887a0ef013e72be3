//! `@Type Name` usages, their specializations and `[Import]` statements.

use super::{ImportRequest, ParseError, Parser, SymbolEvent};
use chtl_ast::{
    CustomUsage, DefCategory, DefKind, Import, Insert, InsertPosition, Node, NodeId, Selector,
    Usage,
};
use chtl_lexer::{BlockKind, Keyword, TokenKind};
use tracing::debug;

impl<'src> Parser<'src> {
    /// `@Type Name [from ns];` or `@Type Name [from ns] { specializations }`.
    pub(crate) fn parse_usage(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        let kind = self.parse_def_kind()?;
        let name = self.stream.expect_word("usage name")?;
        let namespace = if self.stream.eat(TokenKind::Keyword(Keyword::From)) {
            Some(self.parse_namespace_path()?)
        } else {
            None
        };
        let usage = Usage {
            kind,
            name,
            namespace,
        };

        if self.stream.eat(TokenKind::Semicolon) {
            let span = self.stream.span_from(start);
            return Ok(self.alloc(Node::TemplateUsage(usage), span));
        }
        if !self.stream.check(TokenKind::LBrace) {
            return Err(ParseError::invalid_syntax(
                format!(
                    "expected ';' or '{{' after '{}', got {}",
                    usage,
                    self.stream.peek().kind.describe()
                ),
                self.stream.current_span(),
            ));
        }

        let specializations = self.parse_specializations()?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(
            Node::CustomUsage(CustomUsage {
                usage,
                specializations,
            }),
            span,
        ))
    }

    /// `a.b.c`; registries are keyed by the innermost name, so only the last
    /// segment is kept.
    fn parse_namespace_path(&mut self) -> Result<String, ParseError> {
        let mut name = self.stream.expect_word("namespace name")?;
        while self.stream.eat(TokenKind::Dot) {
            name = self.stream.expect_word("namespace name")?;
        }
        Ok(name)
    }

    fn parse_specializations(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.stream.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            let item = match self.stream.peek().kind {
                TokenKind::GeneratorComment => {
                    self.stream.advance();
                    Ok(Vec::new())
                }
                TokenKind::Keyword(Keyword::Delete) => self.parse_delete().map(|id| vec![id]),
                TokenKind::Keyword(Keyword::Insert) => self.parse_insert().map(|id| vec![id]),
                _ => self.parse_properties(false),
            };
            match item {
                Ok(ids) => items.extend(ids),
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(items)
    }

    /// `delete padding, span[1];`
    fn parse_delete(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        let mut selectors = vec![self.parse_selector_ref()?];
        while self.stream.eat(TokenKind::Comma) {
            selectors.push(self.parse_selector_ref()?);
        }
        self.stream.expect(TokenKind::Semicolon)?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Delete(selectors), span))
    }

    /// `name` or `name[index]`.
    fn parse_selector_ref(&mut self) -> Result<Selector, ParseError> {
        let name = self.stream.expect_word("property or tag name")?;
        let index = if self.stream.eat(TokenKind::LBracket) {
            let token = self.stream.expect(TokenKind::Number)?;
            let index = token.literal.parse::<usize>().map_err(|_| {
                ParseError::invalid_syntax(
                    format!("index must be a non-negative integer, got '{}'", token.literal),
                    token.span,
                )
            })?;
            self.stream.expect(TokenKind::RBracket)?;
            Some(index)
        } else {
            None
        };
        Ok(Selector { name, index })
    }

    /// `insert after div[0] { ... }`, `insert at top { ... }`
    fn parse_insert(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();

        let token = self.stream.advance();
        let position = match token.kind {
            TokenKind::Keyword(Keyword::After) => InsertPosition::After(self.parse_selector_ref()?),
            TokenKind::Keyword(Keyword::Before) => {
                InsertPosition::Before(self.parse_selector_ref()?)
            }
            TokenKind::Keyword(Keyword::Replace) => {
                InsertPosition::Replace(self.parse_selector_ref()?)
            }
            TokenKind::Keyword(Keyword::At) => {
                let edge = self.stream.advance();
                match edge.kind {
                    TokenKind::Keyword(Keyword::Top) => InsertPosition::AtTop,
                    TokenKind::Keyword(Keyword::Bottom) => InsertPosition::AtBottom,
                    _ => return Err(ParseError::expected("'top' or 'bottom'", &edge)),
                }
            }
            _ => {
                return Err(ParseError::expected(
                    "'after', 'before', 'replace' or 'at'",
                    &token,
                ))
            }
        };

        let body = self.parse_body()?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Insert(Insert { position, body }), span))
    }

    /// `[Import] @Chtl from "path";`
    /// `[Import] @Style from "path";`
    /// `[Import] [Custom] @Element Box from "path" as Card;`
    pub(crate) fn parse_import(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();

        let category = match self.stream.peek().kind {
            TokenKind::Block(BlockKind::Template) => Some(DefCategory::Template),
            TokenKind::Block(BlockKind::Custom) => Some(DefCategory::Custom),
            _ => None,
        };
        if category.is_some() {
            self.stream.advance();
        }

        let typed = self.stream.eat(TokenKind::At);
        if category.is_none() && !typed {
            return Err(ParseError::expected(
                "'[Template]', '[Custom]' or '@Type'",
                self.stream.peek(),
            ));
        }
        let kind = if typed {
            let token = self.stream.peek().clone();
            let type_name = self.stream.expect_word("import type")?;
            match (type_name.as_str(), DefKind::from_name(&type_name)) {
                ("Chtl", _) if category.is_none() => None,
                (_, Some(kind)) => Some(kind),
                _ => {
                    return Err(ParseError::invalid_syntax(
                        format!("cannot import '@{}'", type_name),
                        token.span,
                    ))
                }
            }
        } else {
            None
        };
        let name = match self.stream.peek().word() {
            Some(_) if self.stream.check(TokenKind::Keyword(Keyword::From)) => None,
            Some(word) if category.is_some() => {
                let word = word.to_string();
                self.stream.advance();
                Some(word)
            }
            _ => None,
        };

        self.stream.expect(TokenKind::Keyword(Keyword::From))?;
        let path = self.parse_import_path()?;

        let alias = if self.stream.eat(TokenKind::Keyword(Keyword::As)) {
            Some(self.stream.expect_word("alias")?)
        } else {
            None
        };
        if alias.is_some() && name.is_none() {
            return Err(ParseError::invalid_syntax(
                "'as' requires a precise import of one definition",
                self.stream.current_span(),
            ));
        }
        self.stream.expect(TokenKind::Semicolon)?;

        let import = Import {
            category,
            kind,
            name,
            path,
            alias,
        };
        let span = self.stream.span_from(start);
        let node = self.alloc(Node::Import(import.clone()), span);

        debug!(path = %import.path, precise = import.is_precise(), "import");
        let namespace = self.current_namespace().to_string();
        self.imports.push(ImportRequest {
            node,
            import,
            span,
            namespace,
        });
        self.events.push(SymbolEvent::Import(self.imports.len() - 1));
        Ok(node)
    }

    /// Quoted path, or an unquoted one made of touching tokens
    /// (`lib/theme.chtl`).
    fn parse_import_path(&mut self) -> Result<String, ParseError> {
        let first = self.stream.peek().clone();
        if first.kind == TokenKind::Str {
            self.stream.advance();
            return Ok(first.literal.to_string());
        }
        if first.word().is_none() && first.kind != TokenKind::Dot {
            return Err(ParseError::expected("import path", &first));
        }

        let mut path = String::new();
        let mut last = self.stream.advance();
        path.push_str(&last.literal);
        loop {
            let next = self.stream.peek();
            let continues = last.touches(next)
                && matches!(
                    next.kind,
                    TokenKind::Ident | TokenKind::Keyword(_) | TokenKind::Dot | TokenKind::Slash
                );
            if !continues {
                break;
            }
            last = self.stream.advance();
            path.push_str(&last.literal);
        }
        Ok(path)
    }
}
