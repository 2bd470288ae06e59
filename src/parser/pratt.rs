// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pratt parser for FHIRPath expressions
//!
//! Binary operators come from [`BinaryOperator::precedence`]; `is`/`as`
//! sit at [`TYPE_PRECEDENCE`] and prefix signs at [`UNARY_PRECEDENCE`].
//! Every binary operator is left-associative.

use super::span::{Spanned, error_at};
use super::tokenizer::Token;
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, TypeSpecifier, UnaryOperator};
use crate::error::SyntaxErrorDetail;

type ParseResult<T> = Result<T, SyntaxErrorDetail>;

/// Binding power of `is` and `as`
pub const TYPE_PRECEDENCE: u8 = 8;
/// Binding power of prefix `+` and `-`
pub const UNARY_PRECEDENCE: u8 = 11;
const LOWEST_PRECEDENCE: u8 = 1;

/// Calendar duration keywords accepted as quantity units
const CALENDAR_KEYWORDS: &[&str] = &[
    "year",
    "years",
    "month",
    "months",
    "week",
    "weeks",
    "day",
    "days",
    "hour",
    "hours",
    "minute",
    "minutes",
    "second",
    "seconds",
    "millisecond",
    "milliseconds",
];

fn binary_operator(token: &Token<'_>) -> Option<BinaryOperator> {
    Some(match token {
        Token::Plus => BinaryOperator::Add,
        Token::Minus => BinaryOperator::Subtract,
        Token::Multiply => BinaryOperator::Multiply,
        Token::Divide => BinaryOperator::Divide,
        Token::Div => BinaryOperator::Div,
        Token::Mod => BinaryOperator::Mod,
        Token::Ampersand => BinaryOperator::Concatenate,
        Token::Pipe => BinaryOperator::Union,
        Token::Equal => BinaryOperator::Equal,
        Token::NotEqual => BinaryOperator::NotEqual,
        Token::Equivalent => BinaryOperator::Equivalent,
        Token::NotEquivalent => BinaryOperator::NotEquivalent,
        Token::LessThan => BinaryOperator::LessThan,
        Token::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
        Token::GreaterThan => BinaryOperator::GreaterThan,
        Token::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
        Token::And => BinaryOperator::And,
        Token::Or => BinaryOperator::Or,
        Token::Xor => BinaryOperator::Xor,
        Token::Implies => BinaryOperator::Implies,
        Token::In => BinaryOperator::In,
        Token::Contains => BinaryOperator::Contains,
        _ => return None,
    })
}

/// Short human description of a token for error messages
fn describe(token: &Token<'_>) -> String {
    if let Some(keyword) = token.keyword_text() {
        return format!("'{keyword}'");
    }
    if let Some(op) = binary_operator(token) {
        return format!("'{}'", op.symbol());
    }
    match token {
        Token::Integer(text) | Token::Decimal(text) => format!("number {text}"),
        Token::String(text) => format!("string '{text}'"),
        Token::Date(text) | Token::DateTime(text) => format!("'@{text}'"),
        Token::Time(text) => format!("'@T{text}'"),
        Token::Identifier(name) => format!("identifier '{name}'"),
        Token::ExternalConstant(name) => format!("'%{name}'"),
        Token::Variable(name) => format!("'${name}'"),
        Token::LeftParen => "'('".into(),
        Token::RightParen => "')'".into(),
        Token::LeftBracket => "'['".into(),
        Token::RightBracket => "']'".into(),
        Token::LeftBrace => "'{'".into(),
        Token::RightBrace => "'}'".into(),
        Token::Dot => "'.'".into(),
        Token::Comma => "','".into(),
        _ => format!("{token:?}"),
    }
}

/// Recursive-descent parser with precedence climbing for binary operators
pub struct PrattParser<'input> {
    source: &'input str,
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
}

impl<'input> PrattParser<'input> {
    pub fn new(source: &'input str, tokens: Vec<Spanned<Token<'input>>>) -> Self {
        Self {
            source,
            tokens,
            position: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(mut self) -> ParseResult<ExpressionNode> {
        if self.tokens.is_empty() {
            return Err(error_at(self.source, 0, "empty expression"));
        }
        let expression = self.parse_expression(LOWEST_PRECEDENCE)?;
        if let Some(token) = self.tokens.get(self.position) {
            let message = format!("unexpected {} after end of expression", describe(&token.value));
            return Err(error_at(self.source, token.start, message));
        }
        Ok(expression)
    }

    fn current(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.position).map(|t| &t.value)
    }

    fn peek(&self, ahead: usize) -> Option<&Token<'input>> {
        self.tokens.get(self.position + ahead).map(|t| &t.value)
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxErrorDetail {
        let offset = self
            .tokens
            .get(self.position)
            .map(|t| t.start)
            .unwrap_or(self.source.len());
        error_at(self.source, offset, message)
    }

    fn unexpected(&self, expected: &str) -> SyntaxErrorDetail {
        match self.current() {
            Some(token) => self.error_here(format!("expected {expected}, found {}", describe(token))),
            None => self.error_here(format!("expected {expected}, found end of input")),
        }
    }

    fn expect(&mut self, expected: Token<'input>, what: &str) -> ParseResult<()> {
        if self.current() == Some(&expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn parse_expression(&mut self, min_precedence: u8) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_unary()?;

        loop {
            let Some(token) = self.current() else { break };

            if matches!(token, Token::Is | Token::As) {
                if TYPE_PRECEDENCE < min_precedence {
                    break;
                }
                let is_check = matches!(token, Token::Is);
                self.position += 1;
                let type_specifier = self.parse_type_specifier()?;
                left = if is_check {
                    ExpressionNode::type_check(left, type_specifier)
                } else {
                    ExpressionNode::type_cast(left, type_specifier)
                };
                continue;
            }

            let Some(op) = binary_operator(token) else { break };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.position += 1;
            let right = self.parse_expression(precedence + 1)?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<ExpressionNode> {
        let op = match self.current() {
            Some(Token::Minus) => UnaryOperator::Negate,
            Some(Token::Plus) => UnaryOperator::Positive,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        self.position += 1;
        let operand = self.parse_unary()?;
        Ok(ExpressionNode::unary_op(op, operand))
    }

    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let Some(token) = self.current().cloned() else {
            return Err(self.unexpected("an expression"));
        };

        let node = match token {
            Token::Integer(text) | Token::Decimal(text) => {
                self.position += 1;
                return Ok(self.parse_number(&token, text));
            }
            Token::String(text) => ExpressionNode::literal(LiteralValue::String(text.into_owned())),
            Token::Date(text) => ExpressionNode::literal(LiteralValue::Date(text.to_string())),
            Token::DateTime(text) => {
                ExpressionNode::literal(LiteralValue::DateTime(text.to_string()))
            }
            Token::Time(text) => ExpressionNode::literal(LiteralValue::Time(text.to_string())),
            Token::True => ExpressionNode::literal(LiteralValue::Boolean(true)),
            Token::False => ExpressionNode::literal(LiteralValue::Boolean(false)),
            Token::ExternalConstant(name) => ExpressionNode::ExternalConstant(name.into_owned()),
            Token::Variable(name) => ExpressionNode::Variable(name.to_string()),
            Token::LeftBrace => {
                self.position += 1;
                self.expect(Token::RightBrace, "'}' to close the empty collection")?;
                return Ok(ExpressionNode::literal(LiteralValue::Null));
            }
            Token::LeftParen => {
                self.position += 1;
                let inner = self.parse_expression(LOWEST_PRECEDENCE)?;
                self.expect(Token::RightParen, "')'")?;
                return Ok(inner);
            }
            Token::Identifier(name) => {
                self.position += 1;
                if self.current() == Some(&Token::LeftParen) {
                    let args = self.parse_arguments()?;
                    return Ok(ExpressionNode::function_call(name.into_owned(), args));
                }
                return Ok(ExpressionNode::identifier(name.into_owned()));
            }
            ref other => match other.keyword_text() {
                // `is(...)`, `as(...)`, `contains(...)` and friends at the root
                Some(name) if self.peek(1) == Some(&Token::LeftParen) => {
                    self.position += 1;
                    let args = self.parse_arguments()?;
                    return Ok(ExpressionNode::function_call(name, args));
                }
                _ => return Err(self.unexpected("an expression")),
            },
        };
        self.position += 1;
        Ok(node)
    }

    /// Number literal, or a quantity when followed by a unit
    fn parse_number(&mut self, token: &Token<'input>, text: &str) -> ExpressionNode {
        let unit = match self.current() {
            Some(Token::String(unit)) => Some(unit.to_string()),
            Some(Token::Identifier(word)) if CALENDAR_KEYWORDS.contains(&word.as_ref()) => {
                Some(word.to_string())
            }
            _ => None,
        };
        if let Some(unit) = unit {
            self.position += 1;
            return ExpressionNode::literal(LiteralValue::Quantity {
                value: text.to_string(),
                unit,
            });
        }
        match token {
            Token::Decimal(_) => ExpressionNode::literal(LiteralValue::Decimal(text.to_string())),
            _ => ExpressionNode::literal(LiteralValue::Integer(text.to_string())),
        }
    }

    fn parse_postfix(&mut self, mut base: ExpressionNode) -> ParseResult<ExpressionNode> {
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.position += 1;
                    let name = self.parse_member_name()?;
                    base = if self.current() == Some(&Token::LeftParen) {
                        let args = self.parse_arguments()?;
                        ExpressionNode::method_call(base, name, args)
                    } else {
                        ExpressionNode::path(base, name)
                    };
                }
                Some(Token::LeftBracket) => {
                    self.position += 1;
                    let index = self.parse_expression(LOWEST_PRECEDENCE)?;
                    self.expect(Token::RightBracket, "']'")?;
                    base = ExpressionNode::index(base, index);
                }
                _ => return Ok(base),
            }
        }
    }

    /// Identifier after `.`; keywords are valid member names here
    fn parse_member_name(&mut self) -> ParseResult<String> {
        let name = match self.current() {
            Some(Token::Identifier(name)) => name.to_string(),
            Some(token) => match token.keyword_text() {
                Some(keyword) => keyword.to_string(),
                None => return Err(self.unexpected("a member name after '.'")),
            },
            None => return Err(self.unexpected("a member name after '.'")),
        };
        self.position += 1;
        Ok(name)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<ExpressionNode>> {
        self.expect(Token::LeftParen, "'('")?;
        let mut args = Vec::new();
        if self.current() == Some(&Token::RightParen) {
            self.position += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression(LOWEST_PRECEDENCE)?);
            match self.current() {
                Some(Token::Comma) => self.position += 1,
                Some(Token::RightParen) => {
                    self.position += 1;
                    return Ok(args);
                }
                _ => return Err(self.unexpected("',' or ')' in argument list")),
            }
        }
    }

    /// Qualified type name after `is` / `as`
    fn parse_type_specifier(&mut self) -> ParseResult<TypeSpecifier> {
        let mut parts = Vec::new();
        loop {
            match self.current() {
                Some(Token::Identifier(name)) => parts.push(name.to_string()),
                _ => return Err(self.unexpected("a type name")),
            }
            self.position += 1;
            if self.current() == Some(&Token::Dot)
                && matches!(self.peek(1), Some(Token::Identifier(_)))
            {
                self.position += 1;
            } else {
                return Ok(TypeSpecifier::new(parts));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::Tokenizer;

    fn parse(input: &str) -> ParseResult<ExpressionNode> {
        let tokens = Tokenizer::new(input).tokenize().map_err(|mut e| e.remove(0))?;
        PrattParser::new(input, tokens).parse()
    }

    fn int(text: &str) -> ExpressionNode {
        ExpressionNode::literal(LiteralValue::Integer(text.into()))
    }

    #[test]
    fn test_multiplicative_binds_tighter() {
        let expected = ExpressionNode::binary_op(
            BinaryOperator::Add,
            int("1"),
            ExpressionNode::binary_op(BinaryOperator::Multiply, int("2"), int("3")),
        );
        assert_eq!(parse("1 + 2 * 3").unwrap(), expected);
    }

    #[test]
    fn test_left_associativity() {
        let expected = ExpressionNode::binary_op(
            BinaryOperator::Subtract,
            ExpressionNode::binary_op(BinaryOperator::Subtract, int("10"), int("4")),
            int("3"),
        );
        assert_eq!(parse("10 - 4 - 3").unwrap(), expected);
    }

    #[test]
    fn test_unary_minus_applies_after_invocation() {
        let expected = ExpressionNode::unary_op(
            UnaryOperator::Negate,
            ExpressionNode::method_call(int("5"), "abs", vec![]),
        );
        assert_eq!(parse("-5.abs()").unwrap(), expected);
    }

    #[test]
    fn test_path_index_and_method() {
        let expected = ExpressionNode::method_call(
            ExpressionNode::index(
                ExpressionNode::path(ExpressionNode::identifier("Patient"), "name"),
                int("0"),
            ),
            "where",
            vec![ExpressionNode::binary_op(
                BinaryOperator::Equal,
                ExpressionNode::identifier("use"),
                ExpressionNode::literal(LiteralValue::String("official".into())),
            )],
        );
        assert_eq!(parse("Patient.name[0].where(use = 'official')").unwrap(), expected);
    }

    #[test]
    fn test_type_operators_take_qualified_names() {
        let expected = ExpressionNode::type_check(
            ExpressionNode::identifier("value"),
            TypeSpecifier::new(vec!["System".into(), "Integer".into()]),
        );
        assert_eq!(parse("value is System.Integer").unwrap(), expected);
    }

    #[test]
    fn test_keywords_as_member_names() {
        let expected = ExpressionNode::method_call(
            ExpressionNode::identifier("name"),
            "contains",
            vec![ExpressionNode::literal(LiteralValue::String("a".into()))],
        );
        assert_eq!(parse("name.contains('a')").unwrap(), expected);
    }

    #[test]
    fn test_quantity_and_null_literals() {
        assert_eq!(
            parse("4 days").unwrap(),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "4".into(),
                unit: "days".into()
            })
        );
        assert_eq!(
            parse("1.5 'mg'").unwrap(),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "1.5".into(),
                unit: "mg".into()
            })
        );
        assert_eq!(parse("{}").unwrap(), ExpressionNode::literal(LiteralValue::Null));
    }

    #[test]
    fn test_errors_carry_positions() {
        let err = parse("Patient.name)").unwrap_err();
        assert_eq!((err.line, err.column), (1, 13));

        let err = parse("Patient.").unwrap_err();
        assert_eq!(err.message, "expected a member name after '.', found end of input");

        let err = parse("count(1,").unwrap_err();
        assert_eq!(err.column, 9);
    }
}
