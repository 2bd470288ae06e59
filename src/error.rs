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

//! Error types for compiling and evaluating FHIRPath expressions

use std::fmt;
use thiserror::Error;

/// Result type alias for FHIRPath operations
pub type Result<T> = std::result::Result<T, FhirPathError>;

/// A single lexical or grammatical problem found in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorDetail {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    /// Human readable description
    pub message: String,
}

impl fmt::Display for SyntaxErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Coarse classification used by callers to test errors by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Source text could not be tokenized or parsed
    Syntax,
    /// Function name not present in the registry
    UnresolvedFunction,
    /// Function called with an argument count outside its bounds
    ArityMismatch,
    /// A custom function reused a bound name
    DuplicateFunctionRegistration,
    /// A custom function carried inconsistent metadata
    InvalidFunctionBinding,
    /// A second rewrite transform was installed
    DuplicateTransform,
    /// A literal could not be parsed
    InvalidLiteral,
    /// Field navigation failed on every input element
    InvalidField,
    /// Operand types are incompatible with the operation
    TypeMismatch,
    /// A singleton collection was required
    NotSingleton,
    /// A constant was bound to an unsupported host value
    UnsupportedConstantType,
    /// A constant name was bound twice
    ExistingConstant,
    /// An external constant was referenced but never bound
    UnknownConstant,
    /// Integer arithmetic or narrowing overflowed
    Overflow,
    /// A function body reported a failure
    Function,
}

/// Comprehensive error type for FHIRPath operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FhirPathError {
    /// One or more syntax errors, all reported together
    #[error("syntax error: {}", join_details(.errors))]
    Syntax {
        /// Every problem found, in source order
        errors: Vec<SyntaxErrorDetail>,
    },

    /// Unknown function name at compile time
    #[error("unresolved function '{name}'")]
    UnresolvedFunction {
        /// Function name as written
        name: String,
    },

    /// Invalid number of arguments
    #[error("function '{name}' expects {} arguments, got {actual}", arity_range(.min, .max))]
    ArityMismatch {
        /// Function name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments (None for unlimited)
        max: Option<usize>,
        /// Actual arguments provided
        actual: usize,
    },

    /// Registering a function under a name already bound
    #[error("function '{name}' is already registered")]
    DuplicateFunctionRegistration {
        /// Function name
        name: String,
    },

    /// Function metadata is inconsistent
    #[error("invalid binding for function '{name}': {message}")]
    InvalidFunctionBinding {
        /// Function name
        name: String,
        /// What is wrong with it
        message: String,
    },

    /// Installing a second rewrite transform
    #[error("a tree transform is already installed")]
    DuplicateTransform,

    /// Malformed literal text
    #[error("invalid {kind} literal '{text}': {message}")]
    InvalidLiteral {
        /// Literal kind, e.g. "date"
        kind: &'static str,
        /// Literal text as written
        text: String,
        /// Parse failure reason
        message: String,
    },

    /// Field navigation failed for every element in the input
    #[error("invalid field '{field}' on {type_name}")]
    InvalidField {
        /// Field name
        field: String,
        /// Runtime type(s) that were navigated
        type_name: String,
    },

    /// Incompatible operand types
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// Expected a single-element collection
    #[error("expected a singleton collection, got {size} elements")]
    NotSingleton {
        /// Actual size
        size: usize,
    },

    /// Constant value is not a System or Element value
    #[error("constant '%{name}' has unsupported type {type_name}")]
    UnsupportedConstantType {
        /// Constant name
        name: String,
        /// Host type name
        type_name: String,
    },

    /// Constant name already bound
    #[error("constant '%{name}' is already defined")]
    ExistingConstant {
        /// Constant name
        name: String,
    },

    /// Constant referenced but never bound
    #[error("unknown constant '%{name}'")]
    UnknownConstant {
        /// Constant name
        name: String,
    },

    /// Integer overflow
    #[error("arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Error reported by a function body
    #[error("function '{name}' failed: {message}")]
    Function {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },

    /// Independent sibling errors joined together
    #[error("{}", join_errors(.0))]
    Multiple(Vec<FhirPathError>),
}

fn join_details(errors: &[SyntaxErrorDetail]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_errors(errors: &[FhirPathError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn arity_range(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min}-{max}"),
        None => format!("at least {min}"),
    }
}

impl FhirPathError {
    /// Create a syntax error from collected details
    pub fn syntax(errors: Vec<SyntaxErrorDetail>) -> Self {
        Self::Syntax { errors }
    }

    /// Create an unresolved function error
    pub fn unresolved_function(name: impl Into<String>) -> Self {
        Self::UnresolvedFunction { name: name.into() }
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(
        name: impl Into<String>,
        min: usize,
        max: Option<usize>,
        actual: usize,
    ) -> Self {
        Self::ArityMismatch {
            name: name.into(),
            min,
            max,
            actual,
        }
    }

    /// Create a duplicate registration error
    pub fn duplicate_function(name: impl Into<String>) -> Self {
        Self::DuplicateFunctionRegistration { name: name.into() }
    }

    /// Create an invalid binding error
    pub fn invalid_binding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFunctionBinding {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid literal error
    pub fn invalid_literal(
        kind: &'static str,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidLiteral {
            kind,
            text: text.into(),
            message: message.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    /// Create a not-singleton error
    pub fn not_singleton(size: usize) -> Self {
        Self::NotSingleton { size }
    }

    /// Create an unsupported constant type error
    pub fn unsupported_constant(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnsupportedConstantType {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Create an existing constant error
    pub fn existing_constant(name: impl Into<String>) -> Self {
        Self::ExistingConstant { name: name.into() }
    }

    /// Create an unknown constant error
    pub fn unknown_constant(name: impl Into<String>) -> Self {
        Self::UnknownConstant { name: name.into() }
    }

    /// Create an overflow error
    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    /// Create a function failure
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Join sibling errors. A single error is returned unwrapped and
    /// nested joins are flattened.
    pub fn join(errors: Vec<FhirPathError>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                FhirPathError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            FhirPathError::Multiple(flat)
        }
    }

    /// Kind of this error. Joined errors report the kind of their first member.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnresolvedFunction { .. } => ErrorKind::UnresolvedFunction,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::DuplicateFunctionRegistration { .. } => ErrorKind::DuplicateFunctionRegistration,
            Self::InvalidFunctionBinding { .. } => ErrorKind::InvalidFunctionBinding,
            Self::DuplicateTransform => ErrorKind::DuplicateTransform,
            Self::InvalidLiteral { .. } => ErrorKind::InvalidLiteral,
            Self::InvalidField { .. } => ErrorKind::InvalidField,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::NotSingleton { .. } => ErrorKind::NotSingleton,
            Self::UnsupportedConstantType { .. } => ErrorKind::UnsupportedConstantType,
            Self::ExistingConstant { .. } => ErrorKind::ExistingConstant,
            Self::UnknownConstant { .. } => ErrorKind::UnknownConstant,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::Function { .. } => ErrorKind::Function,
            Self::Multiple(errors) => errors
                .first()
                .map(FhirPathError::kind)
                .unwrap_or(ErrorKind::Function),
        }
    }

    /// True when this error, or any error joined into it, has the given kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Multiple(errors) => errors.iter().any(|e| e.is(kind)),
            other => other.kind() == kind,
        }
    }
}
