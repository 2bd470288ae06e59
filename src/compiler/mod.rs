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

//! Binder from the syntax tree to the evaluable [`Expression`] tree
//!
//! One recursive pass resolves identifiers, literals, type specifiers and
//! function names against a [`FunctionRegistry`]. Errors inside one subtree
//! stop that subtree; errors in sibling function arguments are collected
//! and joined.

pub mod literal;

use std::fmt;
use std::sync::Arc;

use crate::ast::{
    EqualityOperator, ExpressionNode, LiteralValue, OperatorClass, TypeSpecifier, UnaryOperator,
};
use crate::error::{FhirPathError, Result};
use crate::evaluator::{Expression, LambdaKind, TypeRef};
use crate::model::{Value, schema};
use crate::registry::FunctionRegistry;

/// Rewrite applied to every node the binder produces
pub type Transform = Arc<dyn Fn(Expression) -> Expression + Send + Sync>;

/// Per-recursion binder state, copied into each child
#[derive(Debug, Clone, Copy, Default)]
pub struct BinderState {
    /// Set once a leading identifier can no longer name a resource type
    pub visited_root: bool,
}

impl BinderState {
    fn past_root(self) -> Self {
        Self { visited_root: true }
    }
}

/// Turns a parsed [`ExpressionNode`] into an [`Expression`]
pub struct Binder<'a> {
    registry: &'a FunctionRegistry,
    transform: Option<&'a Transform>,
    permissive: bool,
}

impl fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("functions", &self.registry.len())
            .field("transform", &self.transform.is_some())
            .field("permissive", &self.permissive)
            .finish()
    }
}

impl<'a> Binder<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            transform: None,
            permissive: false,
        }
    }

    pub fn with_transform(mut self, transform: Option<&'a Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Bind a whole tree from its root
    pub fn bind(&self, node: &ExpressionNode) -> Result<Expression> {
        self.bind_node(node, BinderState::default())
    }

    fn finish(&self, expression: Expression) -> Expression {
        match self.transform {
            Some(transform) => transform(expression),
            None => expression,
        }
    }

    fn bind_node(&self, node: &ExpressionNode, state: BinderState) -> Result<Expression> {
        let expression = match node {
            ExpressionNode::Literal(literal) => Expression::Literal(literal::parse_literal(literal)?),
            ExpressionNode::Identifier(name) => {
                if !state.visited_root && schema::is_resource_type(name) {
                    Expression::TypeExpression(name.clone())
                } else {
                    self.field(name)
                }
            }
            ExpressionNode::Path { base, path } => {
                let base = self.bind_node(base, state)?;
                let step = self.finish(self.field(path));
                chain(base, step)
            }
            ExpressionNode::Index { base, index } => {
                let base = self.bind_node(base, BinderState::default())?;
                let index = self.bind_node(index, BinderState::default())?;
                let step = self.finish(Expression::Index {
                    index: Box::new(index),
                });
                chain(base, step)
            }
            ExpressionNode::BinaryOp(data) => {
                let left = Box::new(self.bind_node(&data.left, BinderState::default())?);
                let right = Box::new(self.bind_node(&data.right, BinderState::default())?);
                match data.op.class() {
                    OperatorClass::Arithmetic(op) => Expression::Arithmetic { op, left, right },
                    OperatorClass::Concatenate => Expression::Concat { left, right },
                    OperatorClass::Comparison(op) => Expression::Comparison { op, left, right },
                    OperatorClass::Equality(op) => match op {
                        EqualityOperator::Equal | EqualityOperator::NotEqual => Expression::Equality {
                            negated: op == EqualityOperator::NotEqual,
                            left,
                            right,
                        },
                        EqualityOperator::Equivalent | EqualityOperator::NotEquivalent => {
                            Expression::Equivalence {
                                negated: op == EqualityOperator::NotEquivalent,
                                left,
                                right,
                            }
                        }
                    },
                    OperatorClass::Boolean(op) => Expression::Boolean { op, left, right },
                    OperatorClass::Membership(op) => Expression::Membership { op, left, right },
                    OperatorClass::Union => Expression::Union { left, right },
                }
            }
            ExpressionNode::UnaryOp { op, operand } => match (op, operand.as_ref()) {
                // `-2147483648` only fits once the sign is attached
                (UnaryOperator::Negate, ExpressionNode::Literal(LiteralValue::Integer(digits))) => {
                    let value = literal::parse_integer(&format!("-{digits}"))?;
                    Expression::Literal(Some(Value::Integer(value)))
                }
                (UnaryOperator::Negate, operand) => {
                    Expression::Negation(Box::new(self.bind_node(operand, state)?))
                }
                (UnaryOperator::Positive, operand) => return self.bind_node(operand, state),
            },
            ExpressionNode::FunctionCall(call) => return self.function(&call.name, &call.args),
            ExpressionNode::MethodCall(call) => {
                let base = self.bind_node(&call.base, state)?;
                let step = self.function(&call.method, &call.args)?;
                chain(base, step)
            }
            ExpressionNode::TypeCheck {
                expression,
                type_specifier,
            } => Expression::Is {
                operand: Box::new(self.bind_node(expression, state)?),
                type_ref: TypeRef::resolve(&type_specifier.parts)?,
            },
            ExpressionNode::TypeCast {
                expression,
                type_specifier,
            } => Expression::As {
                operand: Box::new(self.bind_node(expression, state)?),
                type_ref: TypeRef::resolve(&type_specifier.parts)?,
            },
            ExpressionNode::Variable(name) => match name.as_str() {
                "this" => Expression::Identity,
                "index" => Expression::IterationIndex,
                other => return Err(FhirPathError::unknown_constant(format!("${other}"))),
            },
            ExpressionNode::ExternalConstant(name) => Expression::ExternalConstant(name.clone()),
        };
        Ok(self.finish(expression))
    }

    fn field(&self, name: &str) -> Expression {
        Expression::Field {
            name: name.to_string(),
            permissive: self.permissive,
        }
    }

    /// Resolve a call: higher-order forms first, then the registry
    fn function(&self, name: &str, args: &[ExpressionNode]) -> Result<Expression> {
        let expression = match (name, args.len()) {
            ("exists", 0) => self.registered(name, args)?,
            ("where" | "select" | "all" | "exists" | "repeat", 1) => {
                let kind = LambdaKind::from_name(name).ok_or_else(|| FhirPathError::unresolved_function(name))?;
                Expression::Lambda {
                    kind,
                    criteria: Box::new(self.argument(&args[0])?),
                }
            }
            ("where" | "select" | "all" | "repeat", count) => {
                return Err(FhirPathError::arity_mismatch(name, 1, Some(1), count));
            }
            ("exists", count) => return Err(FhirPathError::arity_mismatch(name, 0, Some(1), count)),
            ("iif", 2 | 3) => {
                let mut bound = self.arguments(args)?.into_iter();
                let mut next = || bound.next().map(Box::new);
                let (Some(criterion), Some(then_branch)) = (next(), next()) else {
                    return Err(FhirPathError::arity_mismatch(name, 2, Some(3), args.len()));
                };
                Expression::Conditional {
                    criterion,
                    then_branch,
                    else_branch: next(),
                }
            }
            ("iif", count) => return Err(FhirPathError::arity_mismatch(name, 2, Some(3), count)),
            ("ofType" | "is" | "as", 1) => {
                let type_ref = type_argument(name, &args[0])?;
                match name {
                    "ofType" => Expression::OfType(type_ref),
                    "is" => Expression::Is {
                        operand: Box::new(Expression::Identity),
                        type_ref,
                    },
                    _ => Expression::As {
                        operand: Box::new(Expression::Identity),
                        type_ref,
                    },
                }
            }
            ("ofType" | "is" | "as", count) => {
                return Err(FhirPathError::arity_mismatch(name, 1, Some(1), count));
            }
            _ => self.registered(name, args)?,
        };
        Ok(self.finish(expression))
    }

    fn registered(&self, name: &str, args: &[ExpressionNode]) -> Result<Expression> {
        let binding = self
            .registry
            .get(name)
            .ok_or_else(|| FhirPathError::unresolved_function(name))?;
        if !binding.accepts(args.len()) {
            return Err(FhirPathError::arity_mismatch(
                name,
                binding.min_arity(),
                binding.max_arity(),
                args.len(),
            ));
        }
        Ok(Expression::Function {
            binding: binding.clone(),
            args: self.arguments(args)?,
        })
    }

    /// Arguments evaluate against the call's input, so a leading identifier
    /// is a field there, never a resource type
    fn argument(&self, node: &ExpressionNode) -> Result<Expression> {
        self.bind_node(node, BinderState::default().past_root())
    }

    fn arguments(&self, args: &[ExpressionNode]) -> Result<Vec<Expression>> {
        let mut bound = Vec::with_capacity(args.len());
        let mut errors = Vec::new();
        for arg in args {
            match self.argument(arg) {
                Ok(expression) => bound.push(expression),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(bound)
        } else {
            Err(FhirPathError::join(errors))
        }
    }
}

/// Append `step` to a path, flattening nested sequences
fn chain(base: Expression, step: Expression) -> Expression {
    match base {
        Expression::Sequence(mut steps) => {
            steps.push(step);
            Expression::Sequence(steps)
        }
        base => Expression::Sequence(vec![base, step]),
    }
}

fn type_argument(function: &str, arg: &ExpressionNode) -> Result<TypeRef> {
    let specifier = TypeSpecifier::from_expression(arg).ok_or_else(|| {
        FhirPathError::type_mismatch(format!("{function}() expects a type name"))
    })?;
    TypeRef::resolve(&specifier.parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::parse;

    fn bind(text: &str) -> Result<Expression> {
        let registry = FunctionRegistry::new();
        Binder::new(&registry).bind(&parse(text)?)
    }

    #[test]
    fn test_root_identifier_becomes_type_filter() {
        let Expression::Sequence(steps) = bind("Patient.name").unwrap() else {
            panic!("expected a sequence");
        };
        assert!(matches!(&steps[0], Expression::TypeExpression(name) if name == "Patient"));
        assert!(matches!(&steps[1], Expression::Field { name, .. } if name == "name"));
    }

    #[test]
    fn test_each_binary_operand_gets_its_own_root() {
        let Expression::Equality { left, right, .. } = bind("Observation.value = Patient.name").unwrap()
        else {
            panic!("expected equality");
        };
        for side in [left, right] {
            let Expression::Sequence(steps) = *side else {
                panic!("expected a sequence");
            };
            assert!(matches!(steps[0], Expression::TypeExpression(_)));
        }
    }

    #[test]
    fn test_identifier_inside_arguments_is_a_field() {
        let Expression::Sequence(steps) = bind("name.where(Patient.exists())").unwrap() else {
            panic!("expected a sequence");
        };
        let Expression::Lambda { criteria, .. } = &steps[1] else {
            panic!("expected a lambda");
        };
        let Expression::Sequence(inner) = criteria.as_ref() else {
            panic!("expected a sequence");
        };
        assert!(matches!(&inner[0], Expression::Field { name, .. } if name == "Patient"));
    }

    #[test]
    fn test_operands_inside_arguments_get_their_own_root() {
        let Expression::Sequence(steps) = bind("name.where(Patient.id = 'x')").unwrap() else {
            panic!("expected a sequence");
        };
        let Expression::Lambda { criteria, .. } = &steps[1] else {
            panic!("expected a lambda");
        };
        let Expression::Equality { left, .. } = criteria.as_ref() else {
            panic!("expected equality");
        };
        let Expression::Sequence(inner) = left.as_ref() else {
            panic!("expected a sequence");
        };
        assert!(matches!(&inner[0], Expression::TypeExpression(name) if name == "Patient"));
    }

    #[test]
    fn test_function_resolution_errors() {
        assert!(bind("1.double()").unwrap_err().is(ErrorKind::UnresolvedFunction));
        assert!(bind("'a'.substring()").unwrap_err().is(ErrorKind::ArityMismatch));
        assert!(bind("where()").unwrap_err().is(ErrorKind::ArityMismatch));
        assert!(bind("iif(true)").unwrap_err().is(ErrorKind::ArityMismatch));
    }

    #[test]
    fn test_sibling_argument_errors_are_joined() {
        let err = bind("'a'.replace(@2020-13-01, nope())").unwrap_err();
        assert!(err.is(ErrorKind::InvalidLiteral));
        assert!(err.is(ErrorKind::UnresolvedFunction));
    }

    #[test]
    fn test_type_specifier_errors() {
        assert!(bind("1 is FHIR.Patient.name").unwrap_err().is(ErrorKind::TypeMismatch));
        assert!(bind("ofType('Patient')").unwrap_err().is(ErrorKind::TypeMismatch));
    }

    #[test]
    fn test_min_integer_literal() {
        assert!(matches!(
            bind("-2147483648").unwrap(),
            Expression::Literal(Some(Value::Integer(i32::MIN)))
        ));
        assert!(bind("2147483648").unwrap_err().is(ErrorKind::InvalidLiteral));
    }

    #[test]
    fn test_transform_sees_every_node() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let transform: Transform = Arc::new(move |e: Expression| {
            counter.fetch_add(1, Ordering::Relaxed);
            e
        });
        let registry = FunctionRegistry::new();
        let tree = parse("name.given.first()").unwrap();
        Binder::new(&registry).with_transform(Some(&transform)).bind(&tree).unwrap();
        // name, given, first() and the two sequences built around them
        assert_eq!(seen.load(Ordering::Relaxed), 5);
    }
}
