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

//! Literal text to runtime values

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::LiteralValue;
use crate::error::{FhirPathError, Result};
use crate::model::{CalendarUnit, PrecisionDate, PrecisionDateTime, PrecisionTime, Quantity, Value};

/// Convert a literal; `None` is the null literal
pub fn parse_literal(literal: &LiteralValue) -> Result<Option<Value>> {
    let value = match literal {
        LiteralValue::Null => return Ok(None),
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Integer(text) => Value::Integer(parse_integer(text)?),
        LiteralValue::Decimal(text) => Value::Decimal(parse_decimal(text)?),
        LiteralValue::Date(text) => PrecisionDate::parse(text)
            .map(Value::Date)
            .ok_or_else(|| FhirPathError::invalid_literal("Date", format!("@{text}"), "not a valid date"))?,
        LiteralValue::DateTime(text) => PrecisionDateTime::parse(text)
            .map(Value::DateTime)
            .ok_or_else(|| {
                FhirPathError::invalid_literal("DateTime", format!("@{text}"), "not a valid date-time")
            })?,
        LiteralValue::Time(text) => PrecisionTime::parse(text)
            .map(Value::Time)
            .ok_or_else(|| FhirPathError::invalid_literal("Time", format!("@T{text}"), "not a valid time"))?,
        LiteralValue::Quantity { value, unit } => Value::Quantity(parse_quantity(value, unit)?),
    };
    Ok(Some(value))
}

/// Parse integer digits, optionally signed
pub fn parse_integer(text: &str) -> Result<i32> {
    text.parse::<i32>()
        .map_err(|e| FhirPathError::invalid_literal("Integer", text, e.to_string()))
}

fn parse_decimal(text: &str) -> Result<Decimal> {
    Decimal::from_str(text).map_err(|e| FhirPathError::invalid_literal("Decimal", text, e.to_string()))
}

fn parse_quantity(value: &str, unit: &str) -> Result<Quantity> {
    let literal = || format!("{value} '{unit}'");
    let amount = Decimal::from_str(value)
        .map_err(|e| FhirPathError::invalid_literal("Quantity", literal(), e.to_string()))?;
    if unit.trim().is_empty() {
        return Err(FhirPathError::invalid_literal("Quantity", literal(), "unit is empty"));
    }
    if unit.chars().any(char::is_whitespace) && CalendarUnit::from_unit(unit).is_none() {
        return Err(FhirPathError::invalid_literal(
            "Quantity",
            literal(),
            "unit must not contain whitespace",
        ));
    }
    Ok(Quantity::new(amount, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case(LiteralValue::Integer("2147483648".into()))]
    #[case(LiteralValue::Date("2020-13-01".into()))]
    #[case(LiteralValue::DateTime("2020-01-01T25:00".into()))]
    #[case(LiteralValue::Time("24:61".into()))]
    #[case(LiteralValue::Quantity { value: "1".into(), unit: " ".into() })]
    fn test_malformed_literals(#[case] literal: LiteralValue) {
        let err = parse_literal(&literal).unwrap_err();
        assert!(err.is(ErrorKind::InvalidLiteral));
    }

    #[test]
    fn test_literal_values() {
        assert_eq!(parse_literal(&LiteralValue::Null).unwrap(), None);
        assert_eq!(
            parse_literal(&LiteralValue::Integer("42".into())).unwrap(),
            Some(Value::Integer(42))
        );
        let quantity = LiteralValue::Quantity {
            value: "4.5".into(),
            unit: "mg".into(),
        };
        assert_eq!(
            parse_literal(&quantity).unwrap().unwrap().to_string(),
            "4.5 'mg'"
        );
        assert_eq!(parse_integer("-2147483648").unwrap(), i32::MIN);
    }
}
