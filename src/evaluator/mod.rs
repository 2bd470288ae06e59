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

//! FHIRPath expression tree and its tree-walking evaluator
//!
//! The binder produces an [`Expression`] once per compile. Evaluation is a
//! plain recursive walk: every node maps an input collection to an output
//! collection, and [`Expression::Sequence`] threads each step's output into
//! the next step. Nodes never mutate themselves, so one tree can be
//! evaluated from many threads, each with its own [`EvaluationContext`].

mod context;
pub mod lambda;
pub mod navigation;
pub mod operators;
pub mod types;

pub use context::{EvaluationContext, UCUM_URL};
pub use lambda::LambdaKind;
pub use types::TypeRef;

use log::trace;

use crate::ast::{ArithmeticOperator, BooleanOperator, ComparisonOperator, MembershipOperator};
use crate::error::Result;
use crate::model::{Collection, Value};
use crate::registry::FunctionBinding;

/// A bound, evaluable expression node
#[derive(Debug, Clone)]
pub enum Expression {
    /// Child navigation on every element of the input
    Field { name: String, permissive: bool },
    /// `[i]`; the index is evaluated against an empty input
    Index { index: Box<Expression> },
    /// Each step's output becomes the next step's input
    Sequence(Vec<Expression>),
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Comparison {
        op: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `=`, or `!=` when negated
    Equality {
        negated: bool,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `~`, or `!~` when negated
    Equivalence {
        negated: bool,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Boolean {
        op: BooleanOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary minus
    Negation(Box<Expression>),
    Is {
        operand: Box<Expression>,
        type_ref: TypeRef,
    },
    As {
        operand: Box<Expression>,
        type_ref: TypeRef,
    },
    OfType(TypeRef),
    /// A registry function with its argument expressions
    Function {
        binding: FunctionBinding,
        args: Vec<Expression>,
    },
    /// `$this`
    Identity,
    /// `$index`
    IterationIndex,
    /// `%name`, resolved at evaluation time
    ExternalConstant(String),
    /// `None` is the null literal `{}`
    Literal(Option<Value>),
    /// A resource type name at the root, filtering the input by type
    TypeExpression(String),
    Union {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Membership {
        op: MembershipOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `&`
    Concat {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Lambda {
        kind: LambdaKind,
        criteria: Box<Expression>,
    },
    /// `iif(criterion, then[, else])`
    Conditional {
        criterion: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Option<Box<Expression>>,
    },
    /// Records its result in the context's last/before-last slots
    Tracked(Box<Expression>),
}

impl Expression {
    /// Evaluate against `input`
    pub fn evaluate(&self, ctx: &mut EvaluationContext, input: &Collection) -> Result<Collection> {
        trace!("evaluating {} over {} items", self.label(), input.len());
        match self {
            Self::Field { name, permissive } => navigation::field(input, name, *permissive),
            Self::Index { index } => {
                let position = index.evaluate(ctx, &Collection::new())?;
                navigation::index(input, &position)
            }
            Self::Sequence(steps) => {
                let mut current = input.clone();
                for step in steps {
                    current = step.evaluate(ctx, &current)?;
                }
                Ok(current)
            }
            Self::Arithmetic { op, left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                operators::arithmetic(*op, &l, &r)
            }
            Self::Comparison { op, left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                operators::comparison(*op, &l, &r)
            }
            Self::Equality { negated, left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                Ok(operators::equality(*negated, &l, &r))
            }
            Self::Equivalence { negated, left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                Ok(operators::equivalence(*negated, &l, &r))
            }
            Self::Boolean { op, left, right } => {
                let l = left.evaluate(ctx, input)?.to_logical()?;
                let r = right.evaluate(ctx, input)?.to_logical()?;
                Ok(Collection::from_option(
                    operators::logical(*op, l, r).map(Value::Boolean),
                ))
            }
            Self::Negation(operand) => operators::negate(&operand.evaluate(ctx, input)?),
            Self::Is { operand, type_ref } => {
                let operand = operand.evaluate(ctx, input)?;
                Ok(Collection::from_option(
                    operators::type_operand("is", &operand)?
                        .map(|value| Value::Boolean(type_ref.matches(value))),
                ))
            }
            Self::As { operand, type_ref } => {
                let operand = operand.evaluate(ctx, input)?;
                Ok(Collection::from_option(
                    operators::type_operand("as", &operand)?
                        .filter(|value| type_ref.matches(value))
                        .cloned(),
                ))
            }
            Self::OfType(type_ref) => Ok(type_ref.filter(input)),
            Self::Function { binding, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(ctx, input))
                    .collect::<Result<Vec<_>>>()?;
                binding.invoke(ctx, input, &args)
            }
            Self::Identity => Ok(input.clone()),
            Self::IterationIndex => Ok(ctx.index()),
            Self::ExternalConstant(name) => ctx.constant(name),
            Self::Literal(value) => Ok(Collection::from_option(value.clone())),
            Self::TypeExpression(name) => Ok(navigation::type_filter(input, name)),
            Self::Union { left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                Ok(crate::registry::functions::combining::union(&l, &r))
            }
            Self::Membership { op, left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                operators::membership(*op, &l, &r)
            }
            Self::Concat { left, right } => {
                let (l, r) = Self::operands(ctx, input, left, right)?;
                operators::concat(&l, &r)
            }
            Self::Lambda { kind, criteria } => kind.apply(criteria, ctx, input),
            Self::Conditional {
                criterion,
                then_branch,
                else_branch,
            } => lambda::conditional(criterion, then_branch, else_branch.as_deref(), ctx, input),
            Self::Tracked(inner) => {
                let result = inner.evaluate(ctx, input)?;
                ctx.record_result(&result);
                Ok(result)
            }
        }
    }

    fn operands(
        ctx: &mut EvaluationContext,
        input: &Collection,
        left: &Expression,
        right: &Expression,
    ) -> Result<(Collection, Collection)> {
        Ok((left.evaluate(ctx, input)?, right.evaluate(ctx, input)?))
    }

    /// Short node name for logs
    fn label(&self) -> &'static str {
        match self {
            Self::Field { .. } => "field",
            Self::Index { .. } => "index",
            Self::Sequence(_) => "sequence",
            Self::Arithmetic { .. } => "arithmetic",
            Self::Comparison { .. } => "comparison",
            Self::Equality { .. } => "equality",
            Self::Equivalence { .. } => "equivalence",
            Self::Boolean { .. } => "boolean",
            Self::Negation(_) => "negation",
            Self::Is { .. } => "is",
            Self::As { .. } => "as",
            Self::OfType(_) => "ofType",
            Self::Function { .. } => "function",
            Self::Identity => "$this",
            Self::IterationIndex => "$index",
            Self::ExternalConstant(_) => "constant",
            Self::Literal(_) => "literal",
            Self::TypeExpression(_) => "type",
            Self::Union { .. } => "union",
            Self::Membership { .. } => "membership",
            Self::Concat { .. } => "concat",
            Self::Lambda { .. } => "lambda",
            Self::Conditional { .. } => "iif",
            Self::Tracked(_) => "tracked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::JsonElement;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn field(name: &str) -> Expression {
        Expression::Field {
            name: name.into(),
            permissive: false,
        }
    }

    fn literal(value: impl Into<Value>) -> Box<Expression> {
        Box::new(Expression::Literal(Some(value.into())))
    }

    fn patient() -> Collection {
        Collection::single(Value::element(JsonElement::from_resource(json!({
            "resourceType": "Patient",
            "name": [
                {"use": "official", "given": ["Jane", "Q"]},
                {"use": "nickname", "given": ["JJ"]}
            ]
        }))))
    }

    #[test]
    fn test_sequence_threads_results() {
        let expr = Expression::Sequence(vec![field("name"), field("given")]);
        let given = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap();
        assert_eq!(given, Collection::from_vec(vec!["Jane".into(), "Q".into(), "JJ".into()]));
    }

    #[test]
    fn test_where_and_index() {
        let criteria = Expression::Equality {
            negated: false,
            left: Box::new(field("use")),
            right: literal("nickname"),
        };
        let expr = Expression::Sequence(vec![
            field("name"),
            Expression::Lambda {
                kind: LambdaKind::Where,
                criteria: Box::new(criteria),
            },
            field("given"),
            Expression::Index {
                index: literal(0),
            },
        ]);
        let result = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap();
        assert_eq!(result, Collection::single("JJ"));
    }

    #[test]
    fn test_select_sees_iteration_index() {
        let expr = Expression::Sequence(vec![
            field("name"),
            Expression::Lambda {
                kind: LambdaKind::Select,
                criteria: Box::new(Expression::IterationIndex),
            },
        ]);
        let result = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap();
        assert_eq!(result, Collection::from_vec(vec![0.into(), 1.into()]));
    }

    #[test]
    fn test_iif_skips_unchosen_branch() {
        let failing = Expression::Field {
            name: "nonsense".into(),
            permissive: false,
        };
        let expr = Expression::Conditional {
            criterion: literal(true),
            then_branch: literal("yes"),
            else_branch: Some(Box::new(failing)),
        };
        let result = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap();
        assert_eq!(result, Collection::single("yes"));
    }

    #[test]
    fn test_as_rejects_many_items() {
        let expr = Expression::As {
            operand: Box::new(Expression::Sequence(vec![field("name"), field("given")])),
            type_ref: TypeRef::Unqualified("string".into()),
        };
        let err = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap_err();
        assert!(err.is(ErrorKind::TypeMismatch));
    }

    #[test]
    fn test_tracked_records_results() {
        let mut ctx = EvaluationContext::new();
        let expr = Expression::Sequence(vec![
            Expression::Tracked(Box::new(field("name"))),
            Expression::Tracked(Box::new(field("given"))),
        ]);
        expr.evaluate(&mut ctx, &patient()).unwrap();
        assert_eq!(ctx.last_result().map(Collection::len), Some(3));
        assert_eq!(ctx.before_last_result().map(Collection::len), Some(2));
    }

    #[test]
    fn test_type_expression_filters_root() {
        let expr = Expression::TypeExpression("Observation".into());
        let result = expr.evaluate(&mut EvaluationContext::new(), &patient()).unwrap();
        assert!(result.is_empty());
    }
}
