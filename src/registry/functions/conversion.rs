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

//! Type conversion functions (`toX()` and `convertsToX()`)
//!
//! A conversion that does not apply gives an empty result; only a
//! non-singleton input is an error.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::{string_arg, system_value};
use crate::error::Result;
use crate::model::{
    CalendarUnit, Collection, PrecisionDate, PrecisionDateTime, PrecisionTime, Quantity,
    TemporalPrecision, Value,
};
use crate::registry::{FunctionBinding, FunctionRegistry};

type Converter = fn(&Value) -> Option<Value>;

const CONVERSIONS: &[(&str, &str, Converter)] = &[
    ("toBoolean", "convertsToBoolean", to_boolean),
    ("toInteger", "convertsToInteger", to_integer),
    ("toDecimal", "convertsToDecimal", to_decimal),
    ("toString", "convertsToString", to_string),
    ("toDate", "convertsToDate", to_date),
    ("toDateTime", "convertsToDateTime", to_date_time),
    ("toTime", "convertsToTime", to_time),
];

static INTEGER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("static pattern"));
static DECIMAL_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("static pattern"));
static QUANTITY_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)\s*(?:'([^']+)'|([A-Za-z]+))?\s*$").expect("static pattern")
});

pub fn register_conversion_functions(registry: &mut FunctionRegistry) {
    for &(to, converts_to, convert) in CONVERSIONS {
        registry.define(FunctionBinding::new(to, 0, Some(0), move |input, _| {
            Ok(Collection::from_option(
                system_value(input)?.and_then(|value| convert(&value)),
            ))
        }));
        registry.define(FunctionBinding::new(converts_to, 0, Some(0), move |input, _| {
            convertible(input, |value| convert(value))
        }));
    }

    registry.define(FunctionBinding::new("toQuantity", 0, Some(1), |input, args| {
        let Some(value) = system_value(input)? else {
            return Ok(Collection::new());
        };
        let quantity = to_quantity(&value);
        let converted = match args.first() {
            Some(unit) => match string_arg("toQuantity", unit)? {
                Some(unit) => quantity.and_then(|q| q.convert_to(&unit)),
                None => None,
            },
            None => quantity,
        };
        Ok(Collection::from_option(converted.map(Value::Quantity)))
    }));
    registry.define(FunctionBinding::new("convertsToQuantity", 0, Some(1), |input, args| {
        let unit = match args.first() {
            Some(unit) => string_arg("convertsToQuantity", unit)?,
            None => None,
        };
        convertible(input, |value| {
            let quantity = to_quantity(value)?;
            match &unit {
                Some(unit) => quantity.convert_to(unit).map(Value::Quantity),
                None => Some(Value::Quantity(quantity)),
            }
        })
    }));
}

fn convertible(input: &Collection, convert: impl Fn(&Value) -> Option<Value>) -> Result<Collection> {
    let Some(item) = input.to_optional_singleton()? else {
        return Ok(Collection::new());
    };
    let converts = item
        .to_system()
        .filter(Value::is_primitive)
        .and_then(|value| convert(&value))
        .is_some();
    Ok(Collection::single(converts))
}

fn to_boolean(value: &Value) -> Option<Value> {
    let result = match value {
        Value::Boolean(b) => *b,
        Value::Integer(1) => true,
        Value::Integer(0) => false,
        Value::Decimal(d) if *d == Decimal::ONE => true,
        Value::Decimal(d) if d.is_zero() => false,
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => true,
            "false" | "f" | "no" | "n" | "0" | "0.0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Boolean(result))
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(i) => Some(Value::Integer(*i)),
        Value::Boolean(b) => Some(Value::Integer(i32::from(*b))),
        Value::String(s) if INTEGER_TEXT.is_match(s) => s.parse().ok().map(Value::Integer),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Value> {
    match value {
        Value::Decimal(d) => Some(Value::Decimal(*d)),
        Value::Integer(i) => Some(Value::Decimal(Decimal::from(*i))),
        Value::Boolean(b) => Some(Value::Decimal(if *b { Decimal::ONE } else { Decimal::ZERO })),
        Value::String(s) if DECIMAL_TEXT.is_match(s) => {
            Decimal::from_str(s).ok().map(Value::Decimal)
        }
        _ => None,
    }
}

fn to_string(value: &Value) -> Option<Value> {
    match value {
        Value::Element(_) => None,
        other => Some(Value::String(other.to_string())),
    }
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(d) => Some(Value::Date(*d)),
        Value::DateTime(dt) => Some(Value::Date(PrecisionDate::new(
            dt.datetime.naive_local().date(),
            dt.precision.min(TemporalPrecision::Day),
        ))),
        Value::String(s) => PrecisionDate::parse(s)
            .map(Value::Date)
            .or_else(|| PrecisionDateTime::parse(s).and_then(|dt| to_date(&Value::DateTime(dt)))),
        _ => None,
    }
}

fn to_date_time(value: &Value) -> Option<Value> {
    match value {
        Value::DateTime(dt) => Some(Value::DateTime(*dt)),
        Value::Date(d) => Some(Value::DateTime(d.to_date_time())),
        Value::String(s) => PrecisionDateTime::parse(s)
            .or_else(|| PrecisionDate::parse(s).map(|d| d.to_date_time()))
            .map(Value::DateTime),
        _ => None,
    }
}

fn to_time(value: &Value) -> Option<Value> {
    match value {
        Value::Time(t) => Some(Value::Time(*t)),
        Value::String(s) => PrecisionTime::parse(s.strip_prefix('T').unwrap_or(s)).map(Value::Time),
        _ => None,
    }
}

fn to_quantity(value: &Value) -> Option<Quantity> {
    match value {
        Value::Quantity(q) => Some(q.clone()),
        Value::Integer(i) => Some(Quantity::new(Decimal::from(*i), "1")),
        Value::Decimal(d) => Some(Quantity::new(*d, "1")),
        Value::Boolean(b) => Some(Quantity::new(
            if *b { Decimal::ONE } else { Decimal::ZERO },
            "1",
        )),
        Value::String(s) => {
            let captures = QUANTITY_TEXT.captures(s)?;
            let amount = Decimal::from_str(captures.get(1)?.as_str()).ok()?;
            let unit = match (captures.get(2), captures.get(3)) {
                (Some(code), _) => code.as_str().to_string(),
                (None, Some(word)) => {
                    CalendarUnit::from_unit(word.as_str())?;
                    word.as_str().to_string()
                }
                (None, None) => "1".to_string(),
            };
            Some(Quantity::new(amount, unit))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationContext;
    use rstest::rstest;

    fn call(name: &str, input: impl Into<Value>, args: &[Collection]) -> Collection {
        let registry = FunctionRegistry::new();
        let binding = registry.get(name).unwrap();
        binding
            .invoke(&mut EvaluationContext::new(), &Collection::single(input), args)
            .unwrap()
    }

    #[rstest]
    #[case("yes", Some(true))]
    #[case("F", Some(false))]
    #[case("1.0", Some(true))]
    #[case("maybe", None)]
    fn test_string_to_boolean(#[case] text: &str, #[case] expected: Option<bool>) {
        let expected = Collection::from_option(expected.map(Value::Boolean));
        assert_eq!(call("toBoolean", text, &[]), expected);
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(call("toInteger", "-42", &[]), Collection::single(-42));
        assert!(call("toInteger", "4.2", &[]).is_empty());
        assert!(call("toInteger", "99999999999", &[]).is_empty());
        assert_eq!(
            call("toDecimal", 3, &[]),
            Collection::single(Decimal::from(3))
        );
        assert_eq!(call("convertsToDecimal", "x1", &[]), Collection::single(false));
    }

    #[test]
    fn test_temporal_conversions_keep_precision() {
        assert_eq!(call("toDate", "2015-02", &[]).first().unwrap().to_string(), "2015-02");
        assert_eq!(
            call("toDate", "2015-02-04T14:34:28Z", &[]).first().unwrap().to_string(),
            "2015-02-04"
        );
        assert_eq!(
            call("toDateTime", "2015-02-04", &[]).first().unwrap().to_string(),
            "2015-02-04"
        );
        assert_eq!(call("toTime", "T10:30", &[]).first().unwrap().to_string(), "10:30");
        assert_eq!(call("convertsToTime", "25:00", &[]), Collection::single(false));
    }

    #[test]
    fn test_quantity_conversions() {
        let q = call("toQuantity", "4 'mg'", &[]);
        assert_eq!(q.first().unwrap().to_string(), "4 'mg'");
        let days = call("toQuantity", "3 days", &[]);
        assert_eq!(days.first().unwrap().to_string(), "3 days");
        let grams = call("toQuantity", "1500 'mg'", &[Collection::single("g")]);
        assert_eq!(
            grams,
            Collection::single(Quantity::new(Decimal::from_str("1.5").unwrap(), "g"))
        );
        assert_eq!(
            call("convertsToQuantity", "4 'mg'", &[Collection::single("m")]),
            Collection::single(false)
        );
    }

    #[test]
    fn test_to_string_formats_values() {
        assert_eq!(call("toString", true, &[]), Collection::single("true"));
        assert_eq!(
            call("toString", Decimal::from_str("1.50").unwrap(), &[]),
            Collection::single("1.50")
        );
    }
}
