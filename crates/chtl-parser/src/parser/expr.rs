//! Precedence climbing for property value expressions.
//!
//! Binding levels, lowest to highest:
//!
//! | level       | operators      | associativity |
//! |-------------|----------------|---------------|
//! | Conditional | `? :`          | right         |
//! | Compare     | `>` `<`        | left          |
//! | Sum         | `+` `-`        | left          |
//! | Product     | `*` `/` `%`    | left          |
//! | Power       | `**`           | right         |
//! | Prefix      | unary `-`      |               |
//!
//! A full property value is a comma list of space-separated sequences of
//! such expressions: `1px solid red, 2px dashed blue`.

use super::{ParseError, Parser};
use chtl_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use chtl_lexer::{Token, TokenKind};

const LOWEST: u8 = 0;
const CONDITIONAL: u8 = 1;
const COMPARE: u8 = 2;
const SUM: u8 = 3;
const PRODUCT: u8 = 4;
const POWER: u8 = 5;
const PREFIX: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// Precedence, associativity and operator of an infix token.
fn binary_op_info(kind: TokenKind) -> Option<(u8, Assoc, BinaryOp)> {
    match kind {
        TokenKind::Gt => Some((COMPARE, Assoc::Left, BinaryOp::Gt)),
        TokenKind::Lt => Some((COMPARE, Assoc::Left, BinaryOp::Lt)),
        TokenKind::Plus => Some((SUM, Assoc::Left, BinaryOp::Add)),
        TokenKind::Minus => Some((SUM, Assoc::Left, BinaryOp::Sub)),
        TokenKind::Star => Some((PRODUCT, Assoc::Left, BinaryOp::Mul)),
        TokenKind::Slash => Some((PRODUCT, Assoc::Left, BinaryOp::Div)),
        TokenKind::Percent => Some((PRODUCT, Assoc::Left, BinaryOp::Rem)),
        TokenKind::Power => Some((POWER, Assoc::Right, BinaryOp::Pow)),
        _ => None,
    }
}

/// Whether a token can begin another term of a space-separated sequence.
fn starts_term(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Number
            | TokenKind::Ident
            | TokenKind::Keyword(_)
            | TokenKind::Str
            | TokenKind::Hash
            | TokenKind::LParen
    )
}

impl<'src> Parser<'src> {
    /// Parse a complete property value.
    pub(crate) fn parse_value(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_sequence()?;
        if !self.stream.check(TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span;
        let mut items = vec![first];
        while self.stream.eat(TokenKind::Comma) {
            items.push(self.parse_sequence()?);
        }
        Ok(Expr::new(ExprKind::List(items), self.stream.span_from(start)))
    }

    fn parse_sequence(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expression(LOWEST)?;
        if !starts_term(self.stream.peek()) {
            return Ok(first);
        }

        let start = first.span;
        let mut terms = vec![first];
        while starts_term(self.stream.peek()) {
            terms.push(self.parse_expression(LOWEST)?);
        }
        Ok(Expr::new(ExprKind::Sequence(terms), self.stream.span_from(start)))
    }

    /// Parse one expression, consuming operators that bind tighter than
    /// `min_prec`.
    pub(crate) fn parse_expression(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let span = self.stream.current_span();
        self.enter(span)?;
        let result = self.parse_expression_inner(min_prec);
        self.leave();
        result
    }

    fn parse_expression_inner(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let kind = self.stream.peek().kind;

            if kind == TokenKind::Question {
                if CONDITIONAL <= min_prec {
                    break;
                }
                left = self.parse_conditional(left)?;
                continue;
            }

            let Some((prec, assoc, op)) = binary_op_info(kind) else {
                break;
            };
            if prec <= min_prec {
                break;
            }

            self.stream.advance();
            let next_prec = match assoc {
                Assoc::Left => prec,
                Assoc::Right => prec - 1,
            };
            let right = self.parse_expression(next_prec)?;
            let span = left.span.merge(&right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// `condition ? consequence : alternative`, right associative.
    fn parse_conditional(&mut self, condition: Expr) -> Result<Expr, ParseError> {
        self.stream.expect(TokenKind::Question)?;
        let consequence = self.parse_expression(LOWEST)?;
        self.stream.expect(TokenKind::Colon)?;
        let alternative = self.parse_expression(LOWEST)?;
        let span = condition.span.merge(&alternative.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                consequence: Box::new(consequence),
                alternative: Box::new(alternative),
            },
            span,
        ))
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.stream.peek().clone();
        match token.kind {
            TokenKind::Number => self.parse_number(),
            TokenKind::Str => {
                self.stream.advance();
                Ok(Expr::new(ExprKind::Str(token.literal.to_string()), token.span))
            }
            TokenKind::Ident | TokenKind::Keyword(_) => self.parse_word(),
            TokenKind::Hash => self.parse_hash_literal(),
            TokenKind::Minus => {
                self.stream.advance();
                let operand = self.parse_expression(PREFIX)?;
                let span = token.span.merge(&operand.span);
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::LParen => {
                self.stream.advance();
                let inner = self.parse_expression(LOWEST)?;
                self.stream.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Illegal => Err(ParseError::illegal(&token)),
            _ => Err(ParseError::unexpected_token(&token, "in expression")),
        }
    }

    /// Number with an optional unit that directly touches it: `100px`, `50%`.
    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let token = self.stream.advance();
        let value: f64 = token.literal.parse().map_err(|_| {
            ParseError::invalid_syntax(format!("invalid number '{}'", token.literal), token.span)
        })?;

        let next = self.stream.peek();
        let unit = if token.touches(next)
            && matches!(
                next.kind,
                TokenKind::Ident | TokenKind::Keyword(_) | TokenKind::Percent
            ) {
            Some(self.stream.advance())
        } else {
            None
        };

        let (unit, span) = match unit {
            Some(unit) => (unit.literal.to_string(), token.span.merge(&unit.span)),
            None => (String::new(), token.span),
        };
        Ok(Expr::new(ExprKind::Number { value, unit }, span))
    }

    /// Bare word, or `Template(Var)` when followed by a parenthesised name.
    fn parse_word(&mut self) -> Result<Expr, ParseError> {
        let token = self.stream.advance();
        let name = token.literal.to_string();

        if !self.stream.check(TokenKind::LParen) {
            return Ok(Expr::new(ExprKind::Ident(name), token.span));
        }

        self.stream.advance();
        let variable = self.stream.expect_word("variable name")?;
        let close = self.stream.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::VariableAccess {
                template: name,
                variable,
            },
            token.span.merge(&close.span),
        ))
    }

    /// `#fff`, `#3a3a3a`: the hash plus every touching word/number piece.
    fn parse_hash_literal(&mut self) -> Result<Expr, ParseError> {
        let hash = self.stream.advance();
        let mut text = String::from("#");
        let mut last = hash.clone();
        loop {
            let next = self.stream.peek();
            if !last.touches(next) || !matches!(next.kind, TokenKind::Ident | TokenKind::Number)
            {
                break;
            }
            last = self.stream.advance();
            text.push_str(&last.literal);
        }
        if text.len() == 1 {
            return Err(ParseError::expected("colour digits after '#'", self.stream.peek()));
        }
        Ok(Expr::new(ExprKind::Str(text), hash.span.merge(&last.span)))
    }
}
