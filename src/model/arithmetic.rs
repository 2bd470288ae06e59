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

//! Arithmetic primitives on single values

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::quantity::Quantity;
use super::temporal::CalendarUnit;
use super::value::Value;
use crate::ast::ArithmeticOperator;
use crate::error::{FhirPathError, Result};

/// Apply a binary arithmetic operator.
///
/// `Ok(None)` is an empty result (division by zero); incompatible operand
/// kinds are a `TypeMismatch`.
pub fn apply(op: ArithmeticOperator, left: &Value, right: &Value) -> Result<Option<Value>> {
    let left = left.to_system().unwrap_or_else(|| left.clone());
    let right = right.to_system().unwrap_or_else(|| right.clone());

    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => integer_op(op, *l, *r),
        (Value::Integer(_) | Value::Decimal(_), Value::Integer(_) | Value::Decimal(_)) => {
            decimal_op(op, to_decimal(&left), to_decimal(&right)).map(|d| d.map(Value::Decimal))
        }
        (Value::String(l), Value::String(r)) if op == ArithmeticOperator::Add => {
            Ok(Some(Value::String(format!("{l}{r}"))))
        }
        (Value::Quantity(q), Value::Integer(_) | Value::Decimal(_)) => {
            scale_quantity(op, q, to_decimal(&right), false)
        }
        (Value::Integer(_) | Value::Decimal(_), Value::Quantity(q)) => {
            scale_quantity(op, q, to_decimal(&left), true)
        }
        (Value::Quantity(l), Value::Quantity(r)) => quantity_op(op, l, r),
        (Value::Date(_) | Value::DateTime(_) | Value::Time(_), Value::Quantity(q)) => {
            temporal_op(op, &left, q)
        }
        _ => Err(mismatch(op, &left, &right)),
    }
}

/// Unary minus on a numeric value
pub fn negate(value: &Value) -> Result<Value> {
    match value.to_system() {
        Some(Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| FhirPathError::overflow("negation")),
        Some(Value::Decimal(d)) => Ok(Value::Decimal(-d)),
        Some(Value::Quantity(q)) => Ok(Value::Quantity(Quantity::new(-q.value, q.unit))),
        _ => Err(FhirPathError::type_mismatch(format!(
            "cannot negate {}",
            value.type_name()
        ))),
    }
}

fn mismatch(op: ArithmeticOperator, left: &Value, right: &Value) -> FhirPathError {
    FhirPathError::type_mismatch(format!(
        "operator '{}' cannot be applied to {} and {}",
        op.as_str(),
        left.type_name(),
        right.type_name()
    ))
}

fn to_decimal(value: &Value) -> Decimal {
    match value {
        Value::Integer(i) => Decimal::from(*i),
        Value::Decimal(d) => *d,
        _ => Decimal::ZERO,
    }
}

fn integer_op(op: ArithmeticOperator, l: i32, r: i32) -> Result<Option<Value>> {
    let overflow = || FhirPathError::overflow(format!("{l} {} {r}", op.as_str()));
    let result = match op {
        ArithmeticOperator::Add => l.checked_add(r).ok_or_else(overflow)?,
        ArithmeticOperator::Subtract => l.checked_sub(r).ok_or_else(overflow)?,
        ArithmeticOperator::Multiply => l.checked_mul(r).ok_or_else(overflow)?,
        ArithmeticOperator::Divide => {
            return decimal_op(op, Decimal::from(l), Decimal::from(r))
                .map(|d| d.map(Value::Decimal));
        }
        ArithmeticOperator::Div if r == 0 => return Ok(None),
        ArithmeticOperator::Mod if r == 0 => return Ok(None),
        ArithmeticOperator::Div => floor_div(l, r).ok_or_else(overflow)?,
        ArithmeticOperator::Mod => floor_div(l, r)
            .and_then(|q| q.checked_mul(r))
            .and_then(|product| l.checked_sub(product))
            .ok_or_else(overflow)?,
    };
    Ok(Some(Value::Integer(result)))
}

fn floor_div(l: i32, r: i32) -> Option<i32> {
    let quotient = l.checked_div(r)?;
    if (l % r != 0) && ((l < 0) != (r < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn decimal_op(op: ArithmeticOperator, l: Decimal, r: Decimal) -> Result<Option<Decimal>> {
    let overflow = || FhirPathError::overflow(format!("{l} {} {r}", op.as_str()));
    let result = match op {
        ArithmeticOperator::Add => l.checked_add(r).ok_or_else(overflow)?,
        ArithmeticOperator::Subtract => l.checked_sub(r).ok_or_else(overflow)?,
        ArithmeticOperator::Multiply => l.checked_mul(r).ok_or_else(overflow)?,
        _ if r.is_zero() => return Ok(None),
        ArithmeticOperator::Divide => l.checked_div(r).ok_or_else(overflow)?.normalize(),
        ArithmeticOperator::Div => l.checked_div(r).ok_or_else(overflow)?.floor(),
        ArithmeticOperator::Mod => {
            let quotient = l.checked_div(r).ok_or_else(overflow)?.floor();
            l.checked_sub(quotient.checked_mul(r).ok_or_else(overflow)?)
                .ok_or_else(overflow)?
        }
    };
    Ok(Some(result))
}

fn scale_quantity(
    op: ArithmeticOperator,
    quantity: &Quantity,
    number: Decimal,
    number_on_left: bool,
) -> Result<Option<Value>> {
    let value = match (op, number_on_left) {
        (ArithmeticOperator::Divide | ArithmeticOperator::Div | ArithmeticOperator::Mod, true) => {
            return Err(FhirPathError::type_mismatch(format!(
                "cannot divide a number by quantity {quantity}"
            )));
        }
        (ArithmeticOperator::Subtract, true) => decimal_op(op, number, quantity.value)?,
        _ => decimal_op(op, quantity.value, number)?,
    };
    Ok(value.map(|v| Value::Quantity(Quantity::new(v, quantity.unit.clone()))))
}

fn quantity_op(op: ArithmeticOperator, l: &Quantity, r: &Quantity) -> Result<Option<Value>> {
    match op {
        ArithmeticOperator::Add | ArithmeticOperator::Subtract => {
            let incompatible =
                || FhirPathError::type_mismatch(format!("incompatible units in {l} {} {r}", op.as_str()));
            if !l.is_comparable(r) {
                return Err(incompatible());
            }
            let converted = r.convert_to(&l.unit).ok_or_else(incompatible)?;
            let value = decimal_op(op, l.value, converted.value)?;
            Ok(value.map(|v| Value::Quantity(Quantity::new(v, l.unit.clone()))))
        }
        ArithmeticOperator::Multiply => {
            let value = decimal_op(op, l.value, r.value)?;
            let unit = match (l.canonical_unit(), r.canonical_unit()) {
                ("1", other) | (other, "1") => other.to_string(),
                (lu, ru) => format!("{lu}.{ru}"),
            };
            Ok(value.map(|v| Value::Quantity(Quantity::new(v, unit))))
        }
        ArithmeticOperator::Divide => {
            let (right_value, unit) = match r.convert_to(&l.unit) {
                Some(converted) => (converted.value, "1".to_string()),
                None if r.canonical_unit() == "1" => (r.value, l.unit.clone()),
                None => (r.value, format!("{}/{}", l.canonical_unit(), r.canonical_unit())),
            };
            let value = decimal_op(op, l.value, right_value)?;
            Ok(value.map(|v| Value::Quantity(Quantity::new(v, unit))))
        }
        ArithmeticOperator::Div | ArithmeticOperator::Mod => Err(mismatch(
            op,
            &Value::Quantity(l.clone()),
            &Value::Quantity(r.clone()),
        )),
    }
}

fn temporal_op(op: ArithmeticOperator, temporal: &Value, quantity: &Quantity) -> Result<Option<Value>> {
    let sign = match op {
        ArithmeticOperator::Add => 1,
        ArithmeticOperator::Subtract => -1,
        _ => return Err(mismatch(op, temporal, &Value::Quantity(quantity.clone()))),
    };
    let unit = quantity.calendar_unit().ok_or_else(|| {
        FhirPathError::type_mismatch(format!("{quantity} is not a time-valued quantity"))
    })?;

    // Fractions of a second are kept by working in milliseconds
    let (amount, unit) = if unit == CalendarUnit::Second && !quantity.value.fract().is_zero() {
        (quantity.value * Decimal::from(1000), CalendarUnit::Millisecond)
    } else {
        (quantity.value, unit)
    };
    let amount = amount
        .trunc()
        .to_i64()
        .and_then(|a| a.checked_mul(sign))
        .ok_or_else(|| FhirPathError::overflow(format!("{temporal} {} {quantity}", op.as_str())))?;

    let result = match temporal {
        Value::Date(d) => d.add(amount, unit).map(Value::Date),
        Value::DateTime(dt) => dt.add(amount, unit).map(Value::DateTime),
        Value::Time(t) => match t.add(amount, unit) {
            Some(time) => Some(Value::Time(time)),
            None => return Err(mismatch(op, temporal, &Value::Quantity(quantity.clone()))),
        },
        _ => None,
    };
    result
        .map(Some)
        .ok_or_else(|| FhirPathError::overflow(format!("{temporal} {} {quantity}", op.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::temporal::PrecisionDate;
    use std::str::FromStr;

    fn dec(text: &str) -> Value {
        Value::Decimal(Decimal::from_str(text).unwrap())
    }

    fn run(op: ArithmeticOperator, l: impl Into<Value>, r: impl Into<Value>) -> Result<Option<Value>> {
        apply(op, &l.into(), &r.into())
    }

    #[test]
    fn test_integer_division_floors() {
        use ArithmeticOperator::*;
        assert_eq!(run(Div, -7, 2).unwrap(), Some(Value::Integer(-4)));
        assert_eq!(run(Mod, -7, 2).unwrap(), Some(Value::Integer(1)));
        assert_eq!(run(Mod, 7, -2).unwrap(), Some(Value::Integer(-1)));
        assert_eq!(run(Div, 7, 0).unwrap(), None);
        assert_eq!(run(Divide, 7, 2).unwrap(), Some(dec("3.5")));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = run(ArithmeticOperator::Add, i32::MAX, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        let err = negate(&Value::Integer(i32::MIN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn test_decimal_promotion() {
        assert_eq!(run(ArithmeticOperator::Add, 1, dec("0.5")).unwrap(), Some(dec("1.5")));
    }

    #[test]
    fn test_type_mismatch() {
        let err = run(ArithmeticOperator::Add, 1, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let err = negate(&Value::from("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let q = |v: &str, u: &str| Value::Quantity(Quantity::new(Decimal::from_str(v).unwrap(), u));
        assert_eq!(
            run(ArithmeticOperator::Multiply, q("3", "mg"), 2).unwrap(),
            Some(q("6", "mg"))
        );
        assert_eq!(
            run(ArithmeticOperator::Add, q("1", "g"), q("500", "mg")).unwrap(),
            Some(q("1.5", "g"))
        );
        assert!(run(ArithmeticOperator::Add, q("1", "g"), q("1", "m")).is_err());
    }

    #[test]
    fn test_date_plus_calendar_quantity() {
        let date = Value::Date(PrecisionDate::parse("2020-01-31").unwrap());
        let month = Value::Quantity(Quantity::new(Decimal::ONE, "month"));
        let result = apply(ArithmeticOperator::Add, &date, &month).unwrap().unwrap();
        assert_eq!(result.to_string(), "2020-02-29");

        let grams = Value::Quantity(Quantity::new(Decimal::ONE, "g"));
        assert!(apply(ArithmeticOperator::Add, &date, &grams).is_err());
    }
}
