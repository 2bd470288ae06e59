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

//! FHIRPath expression parser
//!
//! Turns expression text into an [`ExpressionNode`] tree. Lexical errors
//! are reported all at once; grammar errors stop at the first problem.

pub mod pratt;
pub mod span;
pub mod tokenizer;

pub use span::Spanned;

use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use pratt::PrattParser;
use tokenizer::Tokenizer;

/// Parse an expression string into a syntax tree
pub fn parse(input: &str) -> Result<ExpressionNode> {
    let tokens = Tokenizer::new(input)
        .tokenize()
        .map_err(FhirPathError::syntax)?;
    PrattParser::new(input, tokens)
        .parse()
        .map_err(|detail| FhirPathError::syntax(vec![detail]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_reports_every_lexical_error() {
        let err = parse("a # b ^ c").unwrap_err();
        assert!(err.is(ErrorKind::Syntax));
        match err {
            FhirPathError::Syntax { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_accepts_comments_and_whitespace() {
        let tree = parse("// lead\n  Patient /* inline */ .name\n").unwrap();
        assert_eq!(
            tree,
            ExpressionNode::path(ExpressionNode::identifier("Patient"), "name")
        );
    }
}
