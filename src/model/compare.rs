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

//! Equality, equivalence and ordering between values
//!
//! `None` results mean "undecidable": temporal values that agree up to a
//! shared precision but differ in detail, or quantities whose units cannot
//! be converted. Callers turn that into an empty collection.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::collection::Collection;
use super::quantity::Quantity;
use super::temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime};
use super::value::Value;
use crate::error::{FhirPathError, Result};

enum Numeric<'a> {
    Number(Decimal),
    Quantity(&'a Quantity),
}

fn numeric(value: &Value) -> Option<Numeric<'_>> {
    match value {
        Value::Integer(i) => Some(Numeric::Number(Decimal::from(*i))),
        Value::Decimal(d) => Some(Numeric::Number(*d)),
        Value::Quantity(q) => Some(Numeric::Quantity(q)),
        _ => None,
    }
}

fn compare_numeric(left: &Numeric<'_>, right: &Numeric<'_>) -> Option<Ordering> {
    match (left, right) {
        (Numeric::Number(l), Numeric::Number(r)) => Some(l.cmp(r)),
        (Numeric::Quantity(l), Numeric::Quantity(r)) => l.partial_compare(r),
        (Numeric::Number(l), Numeric::Quantity(r)) => Some(l.cmp(&r.value)),
        (Numeric::Quantity(l), Numeric::Number(r)) => Some(l.value.cmp(r)),
    }
}

/// Ordering of two temporal values of compatible kinds; a string on either
/// side is parsed as the other side's kind
fn compare_temporal(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    let parsed;
    let (left, right) = match (left, right) {
        (Value::String(s), other @ (Value::Date(_) | Value::DateTime(_) | Value::Time(_))) => {
            parsed = parse_as(s, other)?;
            (&parsed, other)
        }
        (other @ (Value::Date(_) | Value::DateTime(_) | Value::Time(_)), Value::String(s)) => {
            parsed = parse_as(s, other)?;
            (other, &parsed)
        }
        pair => pair,
    };

    Some(match (left, right) {
        (Value::Date(l), Value::Date(r)) => l.partial_compare(r),
        (Value::DateTime(l), Value::DateTime(r)) => l.partial_compare(r),
        (Value::Date(l), Value::DateTime(r)) => l.to_date_time().partial_compare(r),
        (Value::DateTime(l), Value::Date(r)) => l.partial_compare(&r.to_date_time()),
        (Value::Time(l), Value::Time(r)) => l.partial_compare(r),
        _ => return None,
    })
}

fn parse_as(text: &str, like: &Value) -> Option<Value> {
    match like {
        Value::Date(_) => PrecisionDate::parse(text)
            .map(Value::Date)
            .or_else(|| PrecisionDateTime::parse(text).map(Value::DateTime)),
        Value::DateTime(_) => PrecisionDateTime::parse(text).map(Value::DateTime),
        Value::Time(_) => PrecisionTime::parse(text).map(Value::Time),
        _ => None,
    }
}

/// Language-level `=` on two single values
pub fn equal(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Element(l), Value::Element(r)) => Some(l.structurally_equals(r.as_ref())),
        (Value::Element(e), other) | (other, Value::Element(e)) => match e.to_system_value() {
            Some(system) => equal(&system, other),
            None => Some(false),
        },
        (Value::Boolean(l), Value::Boolean(r)) => Some(l == r),
        (Value::String(l), Value::String(r)) => Some(l == r),
        _ => {
            if let (Some(l), Some(r)) = (numeric(left), numeric(right)) {
                return compare_numeric(&l, &r).map(|o| o == Ordering::Equal);
            }
            match compare_temporal(left, right) {
                Some(ordering) => ordering.map(|o| o == Ordering::Equal),
                None => Some(false),
            }
        }
    }
}

/// Ordering for `< <= > >=`. Values of unrelated kinds are a type error;
/// precision or unit incompatibility is `Ok(None)`.
pub fn compare(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    let left = left.to_system().ok_or_else(|| not_ordered(left, right))?;
    let right = right.to_system().ok_or_else(|| not_ordered(&left, right))?;

    if let (Some(l), Some(r)) = (numeric(&left), numeric(&right)) {
        return Ok(compare_numeric(&l, &r));
    }
    if let (Value::String(l), Value::String(r)) = (&left, &right) {
        return Ok(Some(l.cmp(r)));
    }
    match compare_temporal(&left, &right) {
        Some(ordering) => Ok(ordering),
        None => Err(not_ordered(&left, &right)),
    }
}

fn not_ordered(left: &Value, right: &Value) -> FhirPathError {
    FhirPathError::type_mismatch(format!(
        "cannot compare {} with {}",
        left.type_name(),
        right.type_name()
    ))
}

/// Language-level `~` on two single values. Never undecidable.
pub fn equivalent(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(l), Value::String(r)) => normalize_text(l) == normalize_text(r),
        (Value::Decimal(l), Value::Decimal(r)) => {
            let scale = l.scale().min(r.scale());
            l.round_dp(scale) == r.round_dp(scale)
        }
        (Value::Integer(i), Value::Decimal(d)) | (Value::Decimal(d), Value::Integer(i)) => {
            d.round_dp(0) == Decimal::from(*i)
        }
        (Value::Date(l), Value::Date(r)) => {
            l.precision == r.precision && l.partial_compare(r) == Some(Ordering::Equal)
        }
        (Value::DateTime(l), Value::DateTime(r)) => {
            l.precision == r.precision && l.partial_compare(r) == Some(Ordering::Equal)
        }
        (Value::Time(l), Value::Time(r)) => {
            l.precision == r.precision && l.partial_compare(r) == Some(Ordering::Equal)
        }
        (Value::Element(e), other) | (other, Value::Element(e)) if other.is_primitive() => {
            e.to_system_value()
                .is_some_and(|system| equivalent(&system, other))
        }
        _ => equal(left, right) == Some(true),
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `=` over collections: empty on either side is unknown, otherwise
/// element-wise in order
pub fn collections_equal(left: &Collection, right: &Collection) -> Option<bool> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    if left.len() != right.len() {
        return Some(false);
    }
    let mut result = Some(true);
    for (l, r) in left.iter().zip(right.iter()) {
        match equal(l, r) {
            Some(true) => {}
            Some(false) => return Some(false),
            None => result = None,
        }
    }
    result
}

/// `~` over collections: order-independent, empty ~ empty is true
pub fn collections_equivalent(left: &Collection, right: &Collection) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = right.iter().collect();
    for l in left.iter() {
        match unmatched.iter().position(|r| equivalent(l, r)) {
            Some(index) => {
                unmatched.swap_remove(index);
            }
            None => return false,
        }
    }
    true
}
