//! Elements and the blocks that live inside them.

use super::{ParseError, Parser};
use chtl_ast::{
    Attribute, Element, Expr, IfBranch, IfChain, Node, NodeId, StyleProperty, StyleRule,
};
use chtl_lexer::{Keyword, Token, TokenKind};

impl<'src> Parser<'src> {
    /// `tag { attr: value; children... }`
    pub(crate) fn parse_element(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        let tag = self.stream.expect(TokenKind::Ident)?.literal.to_string();
        self.stream.expect(TokenKind::LBrace)?;

        let mut attributes = Vec::new();
        let mut children = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            if self.at_attribute() {
                match self.parse_attribute() {
                    Ok((attr, span)) if attr.name == Keyword::Text.default_word() => {
                        children.push(self.alloc(Node::Text(attr.value), span));
                    }
                    Ok((attr, _)) => attributes.push(attr),
                    Err(err) => self.recover(err),
                }
                continue;
            }
            match self.parse_statement() {
                Ok(Some(id)) => children.push(id),
                Ok(None) => {}
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;

        let span = self.stream.span_from(start);
        Ok(self.alloc(
            Node::Element(Element {
                tag,
                attributes,
                children,
            }),
            span,
        ))
    }

    /// A word followed by `:` or `=`.
    fn at_attribute(&mut self) -> bool {
        self.stream.peek().word().is_some()
            && (self.stream.check_next(TokenKind::Colon)
                || self.stream.check_next(TokenKind::Equals))
    }

    /// `name: value;` with an optional `;` before `}`.
    fn parse_attribute(&mut self) -> Result<(Attribute, chtl_ast::Span), ParseError> {
        let start = self.stream.current_span();
        let token = self.stream.advance();
        let name = match token.kind {
            TokenKind::Keyword(Keyword::Text) => Keyword::Text.default_word().to_string(),
            _ => token.literal.to_string(),
        };
        self.stream.advance();

        let value = self.parse_literal_value("attribute value")?;
        if !self.stream.eat(TokenKind::Semicolon) && !self.stream.check(TokenKind::RBrace) {
            return Err(ParseError::expected_token(TokenKind::Semicolon, self.stream.peek()));
        }
        Ok((Attribute { name, value }, self.stream.span_from(start)))
    }

    /// String, word or number (with a touching unit) as plain text.
    fn parse_literal_value(&mut self, what: &str) -> Result<String, ParseError> {
        let token = self.stream.peek().clone();
        match token.kind {
            TokenKind::Str | TokenKind::Ident | TokenKind::Keyword(_) => {
                self.stream.advance();
                Ok(token.literal.to_string())
            }
            TokenKind::Number => {
                self.stream.advance();
                let mut text = token.literal.to_string();
                let next = self.stream.peek();
                if token.touches(next)
                    && matches!(next.kind, TokenKind::Ident | TokenKind::Percent)
                {
                    text.push_str(&self.stream.advance().literal);
                }
                Ok(text)
            }
            _ => Err(ParseError::expected(what, &token)),
        }
    }

    /// `text { "..." }`; unquoted words are joined with single spaces.
    pub(crate) fn parse_text(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        self.stream.expect(TokenKind::LBrace)?;

        let mut parts: Vec<String> = Vec::new();
        while !self.stream.check(TokenKind::RBrace) {
            let token = self.stream.peek().clone();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::expected_token(TokenKind::RBrace, &token));
                }
                TokenKind::LBrace => {
                    return Err(ParseError::unexpected_token(&token, "in text block"));
                }
                _ => {
                    self.stream.advance();
                    parts.push(token.literal.to_string());
                }
            }
        }
        self.stream.advance();

        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Text(parts.join(" ")), span))
    }

    /// `if { condition: expr; ... } else if { ... } else { ... }`
    pub(crate) fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        let mut branches = Vec::new();
        let mut otherwise = None;
        loop {
            self.stream.advance();
            self.stream.expect(TokenKind::LBrace)?;
            let condition = self.parse_condition()?;
            let body = self.parse_if_body()?;
            branches.push(IfBranch { condition, body });

            if !self.stream.eat(TokenKind::Keyword(Keyword::Else)) {
                break;
            }
            if self.stream.check(TokenKind::Keyword(Keyword::If)) {
                continue;
            }
            self.stream.expect(TokenKind::LBrace)?;
            otherwise = Some(self.parse_if_body()?);
            break;
        }

        let span = self.stream.span_from(start);
        Ok(self.alloc(
            Node::If(IfChain {
                branches,
                otherwise,
            }),
            span,
        ))
    }

    /// `condition: expr;` opening every `if` block.
    fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        if self.stream.peek().word() != Some("condition") {
            return Err(ParseError::expected(
                "'condition' as the first item of an if block",
                self.stream.peek(),
            ));
        }
        self.stream.advance();
        if !self.stream.eat(TokenKind::Colon) && !self.stream.eat(TokenKind::Equals) {
            return Err(ParseError::expected_token(TokenKind::Colon, self.stream.peek()));
        }
        let condition = self.parse_value()?;
        self.stream.expect(TokenKind::Semicolon)?;
        Ok(condition)
    }

    /// Rest of an `if`/`else` block up to and including its `}`: `name: value;`
    /// items are style properties, anything else is an element-body statement.
    fn parse_if_body(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut body = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            if self.stream.check(TokenKind::Keyword(Keyword::Text)) && self.at_attribute() {
                match self.parse_attribute() {
                    Ok((attr, span)) => body.push(self.alloc(Node::Text(attr.value), span)),
                    Err(err) => self.recover(err),
                }
                continue;
            }
            let item = if self.at_attribute() {
                self.parse_properties(false)
            } else {
                self.parse_statement().map(|id| id.into_iter().collect())
            };
            match item {
                Ok(ids) => body.extend(ids),
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;
        Ok(body)
    }

    /// `script { raw }`
    pub(crate) fn parse_script(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        let raw = self.stream.raw_block()?;
        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Script(raw.text), span))
    }

    /// `style { properties, rules and usages }`
    pub(crate) fn parse_style_block(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        self.stream.advance();
        self.stream.expect(TokenKind::LBrace)?;

        let mut items = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            match self.parse_style_item() {
                Ok(ids) => items.extend(ids),
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;

        let span = self.stream.span_from(start);
        Ok(self.alloc(Node::Style(items), span))
    }

    fn parse_style_item(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let token = self.stream.peek().clone();
        match token.kind {
            TokenKind::GeneratorComment => {
                self.stream.advance();
                Ok(Vec::new())
            }
            TokenKind::Dot | TokenKind::Hash | TokenKind::Ampersand => {
                Ok(vec![self.parse_style_rule()?])
            }
            TokenKind::At => Ok(vec![self.parse_usage()?]),
            TokenKind::Ident | TokenKind::Keyword(_) => self.parse_properties(false),
            _ => Err(ParseError::unexpected_token(&token, "in style block")),
        }
    }

    /// `.box:hover { color: red; }`
    fn parse_style_rule(&mut self) -> Result<NodeId, ParseError> {
        let start = self.stream.current_span();
        let selector = self.parse_selector()?;
        self.stream.expect(TokenKind::LBrace)?;

        let mut properties = Vec::new();
        while !self.stream.check(TokenKind::RBrace) && !self.stream.at_end() {
            if self.skip_illegal() {
                continue;
            }
            match self.parse_properties(false) {
                Ok(ids) => properties.extend(ids),
                Err(err) => self.recover(err),
            }
        }
        self.stream.expect(TokenKind::RBrace)?;

        let span = self.stream.span_from(start);
        Ok(self.alloc(
            Node::StyleRule(StyleRule {
                selector,
                properties,
            }),
            span,
        ))
    }

    /// Selector text up to `{`. Tokens separated by whitespace in the
    /// source are joined with one space, touching tokens are concatenated.
    fn parse_selector(&mut self) -> Result<String, ParseError> {
        let mut selector = String::new();
        let mut previous: Option<Token> = None;
        loop {
            let token = self.stream.peek().clone();
            match token.kind {
                TokenKind::LBrace => break,
                TokenKind::Eof | TokenKind::RBrace | TokenKind::Semicolon => {
                    return Err(ParseError::expected_token(TokenKind::LBrace, &token));
                }
                _ => {}
            }
            if let Some(prev) = &previous {
                if !prev.touches(&token) {
                    selector.push(' ');
                }
            }
            selector.push_str(&token.literal);
            previous = Some(self.stream.advance());
        }
        if selector.is_empty() {
            return Err(ParseError::expected("selector", self.stream.peek()));
        }
        Ok(selector)
    }

    /// `name: expr;`, or with `allow_valueless` a declaration list such as
    /// `color, font-size;` of properties without values.
    pub(crate) fn parse_properties(
        &mut self,
        allow_valueless: bool,
    ) -> Result<Vec<NodeId>, ParseError> {
        let start = self.stream.current_span();
        let name = self.stream.expect_word("property name")?;

        if allow_valueless
            && (self.stream.check(TokenKind::Comma) || self.stream.check(TokenKind::Semicolon))
        {
            let mut ids = vec![self.alloc_property(name, None, start)];
            while self.stream.eat(TokenKind::Comma) {
                let span = self.stream.current_span();
                let name = self.stream.expect_word("property name")?;
                ids.push(self.alloc_property(name, None, span));
            }
            self.stream.expect(TokenKind::Semicolon)?;
            return Ok(ids);
        }

        if !self.stream.eat(TokenKind::Colon) && !self.stream.eat(TokenKind::Equals) {
            return Err(ParseError::expected_token(TokenKind::Colon, self.stream.peek()));
        }
        let value = self.parse_value()?;
        if !self.stream.eat(TokenKind::Semicolon) && !self.stream.check(TokenKind::RBrace) {
            return Err(ParseError::expected_token(TokenKind::Semicolon, self.stream.peek()));
        }
        let span = self.stream.span_from(start);
        Ok(vec![self.alloc_property(name, Some(value), span)])
    }

    fn alloc_property(
        &mut self,
        name: String,
        value: Option<chtl_ast::Expr>,
        span: chtl_ast::Span,
    ) -> NodeId {
        self.alloc(Node::StyleProperty(StyleProperty { name, value }), span)
    }
}
