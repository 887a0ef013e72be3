//! Definitions and the other bracketed top-level blocks.

use super::{ParseError, Parser, SymbolEvent};
use chtl_ast::{
    Constraint, DefCategory, DefKind, Definition, Namespace, Node, NodeId, Origin, OriginKind,
};
use chtl_lexer::{BlockKind, Keyword, TokenKind};
use tracing::debug;

impl<'src> Parser<'src> {
    /// `[Template] @Style Name { ... }` / `[Custom] @Element Name { ... }`
    pub(crate) fn parse_definition(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        let category = match self.stream.advance().kind {
            TokenKind::Block(BlockKind::Custom) => DefCategory::Custom,
            _ => DefCategory::Template,
        };
        let kind = self.parse_def_kind()?;
        let name = self.stream.expect_word("definition name")?;

        let body = match kind {
            DefKind::Style | DefKind::Var => {
                self.parse_property_body(category == DefCategory::Custom)?
            }
            DefKind::Element => self.parse_body()?,
        };

        let span = self.stream.span_from(start);
        let definition = Definition {
            kind,
            name: name.clone(),
            body,
        };
        let node = match category {
            DefCategory::Template => Node::TemplateDefinition(definition),
            DefCategory::Custom => Node::CustomDefinition(definition),
        };
        let id = self.alloc(node, span);

        let namespace = self.current_namespace().to_string();
        debug!(%category, %kind, %name, %namespace, "definition");
        self.events.push(SymbolEvent::Define {
            category,
            namespace,
            name,
            node: id,
        });
        Ok(id)
    }

    /// `@Style`, `@Var` or `@Element`.
    pub(crate) fn parse_def_kind(&mut self) -> Result<DefKind, ParseError> {
        self.stream.expect(TokenKind::At)?;
        let token = self.stream.peek().clone();
        let name = self.stream.expect_word("definition type")?;
        DefKind::from_name(&name).ok_or_else(|| {
            ParseError::invalid_syntax(
                format!("unknown type '@{}', expected @Style, @Var or @Element", name),
                token.span,
            )
        })
    }

    /// Body of a Style or Var definition: properties plus inherited
    /// definitions (`@Style Base;`, `inherit @Style Base;`).
    fn parse_property_body(&mut self, allow_valueless: bool) -> Result<Vec<NodeId>, ParseError> {
        self.stream.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            let kind = self.stream.peek().kind;
            let item = match kind {
                TokenKind::GeneratorComment => {
                    self.stream.advance();
                    Ok(Vec::new())
                }
                TokenKind::Keyword(Keyword::Inherit) if self.stream.check_next(TokenKind::At) => {
                    self.stream.advance();
                    self.parse_usage().map(|id| vec![id])
                }
                TokenKind::At => self.parse_usage().map(|id| vec![id]),
                _ => self.parse_properties(allow_valueless),
            };
            match item {
                Ok(ids) => body.extend(ids),
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(body)
    }

    /// `[Namespace] name { ... }`
    pub(crate) fn parse_namespace(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        let name = self.stream.expect_word("namespace name")?;

        self.namespaces.push(name.clone());
        let body = self.parse_body();
        self.namespaces.pop();
        let body = body?;

        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Namespace(Namespace { name, body }), span))
    }

    /// `[Configuration] { KEY = value; [Name] { KEYWORD_X = word; } }`
    ///
    /// Entries are applied as they are read, so a keyword alias affects the
    /// rest of the document. A rejected entry is reported and skipped.
    pub(crate) fn parse_configuration(&mut self) -> Result<(), ParseError> {
        self.stream.advance();
        self.stream.expect(TokenKind::LBrace)?;
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            let entry = if self.stream.check(TokenKind::Block(BlockKind::Name)) {
                self.parse_name_group()
            } else {
                self.parse_setting()
            };
            if let Err(err) = entry {
                self.recover(err);
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(())
    }

    /// `KEY = value;` or `KEY: value;`, returning the key, its span and the
    /// value text.
    fn parse_config_entry(&mut self) -> Result<(String, chtl_ast::Span, String), ParseError> {
        let span = self.stream.current_span();
        let key = self.stream.expect_word("configuration key")?;
        if !self.stream.eat(TokenKind::Equals) && !self.stream.eat(TokenKind::Colon) {
            return Err(ParseError::expected_token(TokenKind::Equals, self.stream.peek()));
        }
        let token = self.stream.peek().clone();
        let value = match token.kind {
            TokenKind::Ident | TokenKind::Keyword(_) | TokenKind::Number | TokenKind::Str => {
                self.stream.advance();
                token.literal.to_string()
            }
            _ => return Err(ParseError::expected("configuration value", &token)),
        };
        self.stream.expect(TokenKind::Semicolon)?;
        Ok((key, span, value))
    }

    fn parse_setting(&mut self) -> Result<(), ParseError> {
        let (key, span, value) = self.parse_config_entry()?;
        self.settings
            .set(&key, &value)
            .map_err(|message| ParseError::other(message, span))
    }

    fn parse_name_group(&mut self) -> Result<(), ParseError> {
        self.stream.advance();
        self.stream.expect(TokenKind::LBrace)?;
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            match self.parse_config_entry() {
                Ok((key, span, word)) => match Keyword::from_config_key(&key) {
                    Some(keyword) => {
                        debug!(%key, %word, "keyword alias");
                        self.stream.lexer_mut().keywords_mut().alias(keyword, &word);
                        self.stream.reclassify_lookahead();
                    }
                    None => self
                        .errors
                        .push(ParseError::other(format!("unknown keyword name '{}'", key), span)),
                },
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(())
    }

    /// `[Origin] @Html [name] { raw }`
    pub(crate) fn parse_origin(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        self.stream.expect(TokenKind::At)?;
        let token = self.stream.peek().clone();
        let type_name = self.stream.expect_word("origin type")?;
        let kind = OriginKind::from_name(&type_name).ok_or_else(|| {
            ParseError::invalid_syntax(
                format!(
                    "unknown origin type '@{}', expected @Html, @Style or @JavaScript",
                    type_name
                ),
                token.span,
            )
        })?;

        let name = match self.stream.peek().word() {
            Some(word) => {
                let word = word.to_string();
                self.stream.advance();
                Some(word)
            }
            None => None,
        };

        let raw = self.stream.raw_block()?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(
            Node::Origin(Origin {
                kind,
                name,
                content: raw.text,
            }),
            span,
        ))
    }

    /// `except span, [Custom] @Element Box, @Html;`
    pub(crate) fn parse_except(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();

        let mut constraints = vec![self.parse_constraint()?];
        while self.stream.eat(TokenKind::Comma) {
            constraints.push(self.parse_constraint()?);
        }
        self.stream.expect(TokenKind::Semicolon)?;

        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Except(constraints), span))
    }

    fn parse_constraint(&mut self) -> Result<Constraint, ParseError> {
        let category = match self.stream.peek().kind {
            TokenKind::Block(BlockKind::Template) => Some(DefCategory::Template),
            TokenKind::Block(BlockKind::Custom) => Some(DefCategory::Custom),
            _ => None,
        };
        if category.is_some() {
            self.stream.advance();
        }

        let type_name = if self.stream.eat(TokenKind::At) {
            Some(self.stream.expect_word("constraint type")?)
        } else {
            None
        };

        let name = match self.stream.peek().word() {
            Some(word) => {
                let word = word.to_string();
                self.stream.advance();
                Some(word)
            }
            None => None,
        };

        if category.is_none() && type_name.is_none() && name.is_none() {
            return Err(ParseError::expected("constraint", self.stream.peek()));
        }
        Ok(Constraint {
            category,
            type_name,
            name,
        })
    }

    /// `use html5;`
    pub(crate) fn parse_use(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        let target = self.stream.expect_word("use target")?;
        self.stream.expect(TokenKind::Semicolon)?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Use(target), span))
    }
}
