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

//! Tokenizer for FHIRPath expressions
//!
//! Tokens borrow from the input where possible. Lexical errors do not stop
//! the scan: every bad character or unterminated literal is recorded and
//! reported together.

use std::borrow::Cow;

use super::span::{Spanned, error_at};
use crate::error::SyntaxErrorDetail;

/// Token with zero-copy slices into the input
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Integer digits
    Integer(&'input str),
    /// Decimal digits with a fraction
    Decimal(&'input str),
    /// String literal, escapes resolved
    String(Cow<'input, str>),
    /// Date literal text after `@`
    Date(&'input str),
    /// Date-time literal text after `@`
    DateTime(&'input str),
    /// Time literal text after `@T`
    Time(&'input str),
    /// Plain or backtick-delimited identifier
    Identifier(Cow<'input, str>),
    /// `%name` external constant
    ExternalConstant(Cow<'input, str>),
    /// `$this` or `$index`, without the `$`
    Variable(&'input str),

    True,
    False,
    And,
    Or,
    Xor,
    Implies,
    Is,
    As,
    In,
    Contains,
    Div,
    Mod,

    Plus,
    Minus,
    Multiply,
    Divide,
    Ampersand,
    Pipe,
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
}

impl Token<'_> {
    /// Source spelling of keyword tokens, usable as member names after `.`
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::True => "true",
            Token::False => "false",
            Token::And => "and",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::Implies => "implies",
            Token::Is => "is",
            Token::As => "as",
            Token::In => "in",
            Token::Contains => "contains",
            Token::Div => "div",
            Token::Mod => "mod",
            _ => return None,
        })
    }
}

fn keyword(word: &str) -> Option<Token<'static>> {
    Some(match word {
        "true" => Token::True,
        "false" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "xor" => Token::Xor,
        "implies" => Token::Implies,
        "is" => Token::Is,
        "as" => Token::As,
        "in" => Token::In,
        "contains" => Token::Contains,
        "div" => Token::Div,
        "mod" => Token::Mod,
        _ => return None,
    })
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Scanner over the input text
pub struct Tokenizer<'input> {
    input: &'input str,
    position: usize,
    errors: Vec<SyntaxErrorDetail>,
}

impl<'input> Tokenizer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            position: 0,
            errors: Vec::new(),
        }
    }

    /// Scan the whole input. Returns every lexical error when any occurred.
    pub fn tokenize(mut self) -> Result<Vec<Spanned<Token<'input>>>, Vec<SyntaxErrorDetail>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.position;
            let Some(c) = self.peek() else { break };
            if let Some(token) = self.next_token(c) {
                tokens.push(Spanned::new(token, start, self.position));
            }
        }
        if self.errors.is_empty() {
            Ok(tokens)
        } else {
            Err(self.errors)
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input[self.position..].chars().nth(ahead)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) -> &'input str {
        let start = self.position;
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
        &self.input[start..self.position]
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(error_at(self.input, offset, message));
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    self.eat_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    let start = self.position;
                    self.position += 2;
                    match self.input[self.position..].find("*/") {
                        Some(end) => self.position += end + 2,
                        None => {
                            self.position = self.input.len();
                            self.error(start, "unterminated comment");
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self, c: char) -> Option<Token<'input>> {
        let start = self.position;
        if c.is_ascii_digit() {
            return Some(self.number());
        }
        if is_identifier_start(c) {
            let word = self.eat_while(is_identifier_char);
            return Some(keyword(word).unwrap_or(Token::Identifier(Cow::Borrowed(word))));
        }

        self.bump();
        let token = match c {
            '\'' => Token::String(self.quoted('\'', start)?),
            '`' => Token::Identifier(self.quoted('`', start)?),
            '@' => return self.temporal(start),
            '%' => return self.external_constant(start),
            '$' => {
                let name = self.eat_while(is_identifier_char);
                match name {
                    "this" | "index" => Token::Variable(name),
                    _ => {
                        self.error(start, format!("unknown special variable '${name}'"));
                        return None;
                    }
                }
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Multiply,
            '/' => Token::Divide,
            '&' => Token::Ampersand,
            '|' => Token::Pipe,
            '=' => Token::Equal,
            '~' => Token::Equivalent,
            '!' if self.eat('=') => Token::NotEqual,
            '!' if self.eat('~') => Token::NotEquivalent,
            '<' if self.eat('=') => Token::LessThanOrEqual,
            '<' => Token::LessThan,
            '>' if self.eat('=') => Token::GreaterThanOrEqual,
            '>' => Token::GreaterThan,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '.' => Token::Dot,
            ',' => Token::Comma,
            other => {
                self.error(start, format!("unexpected character '{other}'"));
                return None;
            }
        };
        Some(token)
    }

    fn number(&mut self) -> Token<'input> {
        let start = self.position;
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
            Token::Decimal(&self.input[start..self.position])
        } else {
            Token::Integer(&self.input[start..self.position])
        }
    }

    /// Quoted string or delimited identifier; the opening quote is consumed
    fn quoted(&mut self, quote: char, start: usize) -> Option<Cow<'input, str>> {
        let body_start = self.position;
        let mut owned: Option<String> = None;
        loop {
            let Some(c) = self.bump() else {
                self.error(start, "unterminated string");
                return None;
            };
            if c == quote {
                let body = &self.input[body_start..self.position - 1];
                return Some(owned.map(Cow::Owned).unwrap_or(Cow::Borrowed(body)));
            }
            if c != '\\' {
                if let Some(text) = owned.as_mut() {
                    text.push(c);
                }
                continue;
            }

            let text = owned.get_or_insert_with(|| {
                self.input[body_start..self.position - 1].to_string()
            });
            let escape_start = self.position - 1;
            match self.bump() {
                Some('\'') => text.push('\''),
                Some('"') => text.push('"'),
                Some('`') => text.push('`'),
                Some('\\') => text.push('\\'),
                Some('/') => text.push('/'),
                Some('f') => text.push('\u{000C}'),
                Some('n') => text.push('\n'),
                Some('r') => text.push('\r'),
                Some('t') => text.push('\t'),
                Some('u') => {
                    let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => text.push(decoded),
                        None => {
                            let message = format!("invalid unicode escape '\\u{hex}'");
                            self.error(escape_start, message);
                        }
                    }
                }
                Some(other) => {
                    self.error(escape_start, format!("invalid escape sequence '\\{other}'"));
                }
                None => {
                    self.error(start, "unterminated string");
                    return None;
                }
            }
        }
    }

    fn temporal(&mut self, start: usize) -> Option<Token<'input>> {
        if self.eat('T') {
            let time = self.eat_while(|c| c.is_ascii_digit() || c == ':' || c == '.');
            if time.is_empty() {
                self.error(start, "empty time literal");
                return None;
            }
            return Some(Token::Time(time));
        }

        let body_start = self.position;
        self.eat_while(|c| c.is_ascii_digit() || c == '-');
        if !self.eat('T') {
            let date = &self.input[body_start..self.position];
            if date.is_empty() {
                self.error(start, "empty date literal");
                return None;
            }
            return Some(Token::Date(date));
        }

        self.eat_while(|c| c.is_ascii_digit() || c == ':' || c == '.');
        if !self.eat('Z') && matches!(self.peek(), Some('+' | '-'))
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit() || c == ':');
        }
        Some(Token::DateTime(&self.input[body_start..self.position]))
    }

    fn external_constant(&mut self, start: usize) -> Option<Token<'input>> {
        let name = match self.peek() {
            Some('\'') => {
                self.bump();
                self.quoted('\'', start)?
            }
            Some('`') => {
                self.bump();
                self.quoted('`', start)?
            }
            Some(c) if is_identifier_start(c) => Cow::Borrowed(self.eat_while(is_identifier_char)),
            _ => {
                self.error(start, "expected a constant name after '%'");
                return None;
            }
        };
        Some(Token::ExternalConstant(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_path_and_operators() {
        assert_eq!(
            tokens("Patient.name.given[0] != 'x'"),
            vec![
                Token::Identifier("Patient".into()),
                Token::Dot,
                Token::Identifier("name".into()),
                Token::Dot,
                Token::Identifier("given".into()),
                Token::LeftBracket,
                Token::Integer("0"),
                Token::RightBracket,
                Token::NotEqual,
                Token::String("x".into()),
            ]
        );
    }

    #[test]
    fn test_numbers_do_not_swallow_member_access() {
        assert_eq!(
            tokens("1.double() + 2.5"),
            vec![
                Token::Integer("1"),
                Token::Dot,
                Token::Identifier("double".into()),
                Token::LeftParen,
                Token::RightParen,
                Token::Plus,
                Token::Decimal("2.5"),
            ]
        );
    }

    #[test]
    fn test_temporal_literals() {
        assert_eq!(tokens("@2015-02-04"), vec![Token::Date("2015-02-04")]);
        assert_eq!(
            tokens("@2015-02-04T14:34:28+09:00"),
            vec![Token::DateTime("2015-02-04T14:34:28+09:00")]
        );
        assert_eq!(tokens("@2015T"), vec![Token::DateTime("2015T")]);
        assert_eq!(tokens("@T14:34"), vec![Token::Time("14:34")]);
        assert_eq!(
            tokens("@2015 - 1 year"),
            vec![
                Token::Date("2015"),
                Token::Minus,
                Token::Integer("1"),
                Token::Identifier("year".into()),
            ]
        );
    }

    #[test]
    fn test_escapes_constants_and_comments() {
        assert_eq!(
            tokens(r"'it\'s' // trailing"),
            vec![Token::String("it's".into())]
        );
        assert_eq!(
            tokens("%ucum /* note */ %`my var` $this"),
            vec![
                Token::ExternalConstant("ucum".into()),
                Token::ExternalConstant("my var".into()),
                Token::Variable("this"),
            ]
        );
    }

    #[test]
    fn test_all_lexical_errors_are_collected() {
        let errors = Tokenizer::new("a # b\n  ^ 'open").tokenize().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!((errors[0].line, errors[0].column), (1, 3));
        assert_eq!((errors[1].line, errors[1].column), (2, 3));
        assert_eq!(errors[2].message, "unterminated string");
    }
}
