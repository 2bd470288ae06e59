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

//! Operator semantics over evaluated operand collections

use std::cmp::Ordering;

use crate::ast::{ArithmeticOperator, BooleanOperator, ComparisonOperator, MembershipOperator};
use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Value, arithmetic, compare};

pub fn arithmetic(op: ArithmeticOperator, left: &Collection, right: &Collection) -> Result<Collection> {
    let (Some(l), Some(r)) = (left.to_optional_singleton()?, right.to_optional_singleton()?) else {
        return Ok(Collection::new());
    };
    Ok(Collection::from_option(arithmetic::apply(op, l, r)?))
}

pub fn comparison(op: ComparisonOperator, left: &Collection, right: &Collection) -> Result<Collection> {
    let (Some(l), Some(r)) = (left.to_optional_singleton()?, right.to_optional_singleton()?) else {
        return Ok(Collection::new());
    };
    let Some(ordering) = compare::compare(l, r)? else {
        return Ok(Collection::new());
    };
    let result = match op {
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
    };
    Ok(Collection::single(result))
}

pub fn equality(negated: bool, left: &Collection, right: &Collection) -> Collection {
    Collection::from_option(
        compare::collections_equal(left, right).map(|equal| Value::Boolean(equal != negated)),
    )
}

pub fn equivalence(negated: bool, left: &Collection, right: &Collection) -> Collection {
    Collection::single(compare::collections_equivalent(left, right) != negated)
}

/// Three-valued connective over already-coerced operands
pub fn logical(op: BooleanOperator, left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match op {
        BooleanOperator::And => match (left, right) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BooleanOperator::Or => match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BooleanOperator::Xor => match (left, right) {
            (Some(l), Some(r)) => Some(l != r),
            _ => None,
        },
        BooleanOperator::Implies => match (left, right) {
            (Some(false), _) | (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        },
    }
}

pub fn membership(op: MembershipOperator, left: &Collection, right: &Collection) -> Result<Collection> {
    let (item, collection) = match op {
        MembershipOperator::In => (left, right),
        MembershipOperator::Contains => (right, left),
    };
    let Some(item) = item.to_optional_singleton()? else {
        return Ok(Collection::new());
    };
    Ok(Collection::single(collection.contains(item)))
}

/// `&`: empty operands count as the empty string
pub fn concat(left: &Collection, right: &Collection) -> Result<Collection> {
    let text = |operand: &Collection| -> Result<String> {
        if operand.is_empty() {
            Ok(String::new())
        } else {
            operand.to_string_value()
        }
    };
    Ok(Collection::single(format!("{}{}", text(left)?, text(right)?)))
}

pub fn negate(operand: &Collection) -> Result<Collection> {
    match operand.to_optional_singleton()? {
        None => Ok(Collection::new()),
        Some(value) => Ok(Collection::single(arithmetic::negate(value)?)),
    }
}

/// Singleton operand for `is` / `as`; more than one item is an error
pub fn type_operand<'a>(operator: &str, operand: &'a Collection) -> Result<Option<&'a Value>> {
    operand.to_optional_singleton().map_err(|_| {
        FhirPathError::type_mismatch(format!(
            "'{operator}' needs a single item, got {}",
            operand.len()
        ))
    })
}
