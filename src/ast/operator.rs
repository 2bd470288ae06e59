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

//! Operators of the expression language

/// Binary operators as written in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Integer division (div)
    Div,
    /// Modulo (mod)
    Mod,
    /// String concatenation (&)
    Concatenate,
    /// Equality (=)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Equivalence (~)
    Equivalent,
    /// Non-equivalence (!~)
    NotEquivalent,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Logical AND (and)
    And,
    /// Logical OR (or)
    Or,
    /// Logical XOR (xor)
    Xor,
    /// Implication (implies)
    Implies,
    /// Collection union (|)
    Union,
    /// Collection membership (in)
    In,
    /// Collection containment (contains)
    Contains,
}

/// Arithmetic subset of [`BinaryOperator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Div,
    Mod,
}

/// Ordering comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Equality and equivalence, with their negations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqualityOperator {
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
}

/// Three-valued logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    And,
    Or,
    Xor,
    Implies,
}

/// Collection membership tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipOperator {
    In,
    Contains,
}

/// Operator family, used by the binder to pick an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic(ArithmeticOperator),
    Concatenate,
    Comparison(ComparisonOperator),
    Equality(EqualityOperator),
    Boolean(BooleanOperator),
    Membership(MembershipOperator),
    Union,
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Arithmetic negation (-)
    Negate,
    /// Positive sign (+)
    Positive,
}

impl BinaryOperator {
    /// Binding power, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            Self::Multiply | Self::Divide | Self::Div | Self::Mod => 10,
            Self::Add | Self::Subtract | Self::Concatenate => 9,
            // 8 is taken by `is` / `as`
            Self::Union => 7,
            Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => 6,
            Self::Equal | Self::NotEqual | Self::Equivalent | Self::NotEquivalent => 5,
            Self::In | Self::Contains => 4,
            Self::And => 3,
            Self::Xor | Self::Or => 2,
            Self::Implies => 1,
        }
    }

    pub fn class(self) -> OperatorClass {
        use OperatorClass as C;
        match self {
            Self::Add => C::Arithmetic(ArithmeticOperator::Add),
            Self::Subtract => C::Arithmetic(ArithmeticOperator::Subtract),
            Self::Multiply => C::Arithmetic(ArithmeticOperator::Multiply),
            Self::Divide => C::Arithmetic(ArithmeticOperator::Divide),
            Self::Div => C::Arithmetic(ArithmeticOperator::Div),
            Self::Mod => C::Arithmetic(ArithmeticOperator::Mod),
            Self::Concatenate => C::Concatenate,
            Self::Equal => C::Equality(EqualityOperator::Equal),
            Self::NotEqual => C::Equality(EqualityOperator::NotEqual),
            Self::Equivalent => C::Equality(EqualityOperator::Equivalent),
            Self::NotEquivalent => C::Equality(EqualityOperator::NotEquivalent),
            Self::LessThan => C::Comparison(ComparisonOperator::LessThan),
            Self::LessThanOrEqual => C::Comparison(ComparisonOperator::LessThanOrEqual),
            Self::GreaterThan => C::Comparison(ComparisonOperator::GreaterThan),
            Self::GreaterThanOrEqual => C::Comparison(ComparisonOperator::GreaterThanOrEqual),
            Self::And => C::Boolean(BooleanOperator::And),
            Self::Or => C::Boolean(BooleanOperator::Or),
            Self::Xor => C::Boolean(BooleanOperator::Xor),
            Self::Implies => C::Boolean(BooleanOperator::Implies),
            Self::In => C::Membership(MembershipOperator::In),
            Self::Contains => C::Membership(MembershipOperator::Contains),
            Self::Union => C::Union,
        }
    }

    /// Get the symbol representation of this operator
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Concatenate => "&",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Equivalent => "~",
            Self::NotEquivalent => "!~",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Union => "|",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }
}

impl ArithmeticOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}
