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

//! Syntax tree node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use smallvec::SmallVec;

/// Syntax tree of a FHIRPath expression, as produced by the parser.
///
/// Literals keep their source text; the binder turns them into values so
/// that malformed literals surface as compile errors of their own kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionNode {
    /// Literal value (string, number, boolean, etc.)
    Literal(LiteralValue),

    /// Bare identifier at the start of a path
    Identifier(String),

    /// Member access (`base.path`)
    Path {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Member name
        path: String,
    },

    /// Binary operation (boxed for size)
    BinaryOp(Box<BinaryOpData>),

    /// Unary prefix operation
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Function call without a receiver (`name(args)`)
    FunctionCall(Box<FunctionCallData>),

    /// Function call on a receiver (`base.name(args)`)
    MethodCall(Box<MethodCallData>),

    /// Index access (`base[index]`)
    Index {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Type check (`expression is Type`)
    TypeCheck {
        /// Expression to check
        expression: Box<ExpressionNode>,
        /// Qualified type name
        type_specifier: TypeSpecifier,
    },

    /// Type cast (`expression as Type`)
    TypeCast {
        /// Expression to cast
        expression: Box<ExpressionNode>,
        /// Qualified type name
        type_specifier: TypeSpecifier,
    },

    /// Special variable (`$this`, `$index`, `$total`), stored without the `$`
    Variable(String),

    /// External constant (`%name`), stored without the `%`
    ExternalConstant(String),
}

/// Literal as written in source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    /// Null literal `{}`
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer digits
    Integer(String),
    /// Decimal digits
    Decimal(String),
    /// String literal with escapes resolved
    String(String),
    /// Date literal without the leading `@`
    Date(String),
    /// Date-time literal without the leading `@`
    DateTime(String),
    /// Time literal without the leading `@T`
    Time(String),
    /// Quantity literal: number text and unit (quoted UCUM code or calendar keyword)
    Quantity {
        /// Number text
        value: String,
        /// Unit text
        unit: String,
    },
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Receiver-less function call data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Arguments, most calls have at most a few
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Function call on a receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCallData {
    /// Receiver expression
    pub base: ExpressionNode,
    /// Function name
    pub method: String,
    /// Arguments
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Dotted type name such as `Patient`, `FHIR.Patient` or `System.String`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier {
    /// Name parts in order
    pub parts: Vec<String>,
}

impl TypeSpecifier {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// Read a type specifier out of a path expression (`FHIR.Patient`),
    /// as used by the `is`/`as`/`ofType` function forms
    pub fn from_expression(node: &ExpressionNode) -> Option<Self> {
        match node {
            ExpressionNode::Identifier(name) => Some(Self::new(vec![name.clone()])),
            ExpressionNode::Path { base, path } => {
                let mut spec = Self::from_expression(base)?;
                spec.parts.push(path.clone());
                Some(spec)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

impl ExpressionNode {
    /// Create a literal node
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create an identifier node
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Create a member access node
    pub fn path(base: ExpressionNode, path: impl Into<String>) -> Self {
        Self::Path {
            base: Box::new(base),
            path: path.into(),
        }
    }

    /// Create a binary operation node
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation node
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a receiver-less function call node
    pub fn function_call(name: impl Into<String>, args: Vec<ExpressionNode>) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a method call node
    pub fn method_call(
        base: ExpressionNode,
        method: impl Into<String>,
        args: Vec<ExpressionNode>,
    ) -> Self {
        Self::MethodCall(Box::new(MethodCallData {
            base,
            method: method.into(),
            args: args.into(),
        }))
    }

    /// Create an index access node
    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a type check node
    pub fn type_check(expression: ExpressionNode, type_specifier: TypeSpecifier) -> Self {
        Self::TypeCheck {
            expression: Box::new(expression),
            type_specifier,
        }
    }

    /// Create a type cast node
    pub fn type_cast(expression: ExpressionNode, type_specifier: TypeSpecifier) -> Self {
        Self::TypeCast {
            expression: Box::new(expression),
            type_specifier,
        }
    }
}
