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

//! Math functions

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;

use super::{expected, integer_arg, system_value};
use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Quantity, Value};
use crate::registry::{FunctionBinding, FunctionRegistry};

pub fn register_math_functions(registry: &mut FunctionRegistry) {
    registry.define(FunctionBinding::new("abs", 0, Some(0), |input, _| {
        let Some(value) = system_value(input)? else {
            return Ok(Collection::new());
        };
        let result = match value {
            Value::Integer(i) => Value::Integer(
                i.checked_abs()
                    .ok_or_else(|| FhirPathError::overflow(format!("abs({i})")))?,
            ),
            Value::Decimal(d) => Value::Decimal(d.abs()),
            Value::Quantity(q) => Value::Quantity(Quantity::new(q.value.abs(), q.unit)),
            other => return Err(expected("abs", "a number or Quantity", &other)),
        };
        Ok(Collection::single(result))
    }));

    for (name, op) in [
        ("ceiling", Decimal::ceil as fn(&Decimal) -> Decimal),
        ("floor", Decimal::floor),
        ("truncate", Decimal::trunc),
    ] {
        registry.define(FunctionBinding::new(name, 0, Some(0), move |input, _| {
            let Some(value) = system_value(input)? else {
                return Ok(Collection::new());
            };
            match value {
                Value::Integer(i) => Ok(Collection::single(i)),
                Value::Decimal(d) => Ok(Collection::single(to_integer(name, op(&d))?)),
                other => Err(expected(name, "a number", &other)),
            }
        }));
    }

    registry.define(FunctionBinding::new("round", 0, Some(1), |input, args| {
        let Some(value) = system_value(input)? else {
            return Ok(Collection::new());
        };
        let precision = match args.first() {
            Some(arg) => integer_arg("round", arg)?.unwrap_or(0),
            None => 0,
        };
        let precision = u32::try_from(precision).map_err(|_| {
            FhirPathError::function("round", format!("precision must not be negative, got {precision}"))
        })?;
        let decimal = match value {
            Value::Integer(i) => Decimal::from(i),
            Value::Decimal(d) => d,
            other => return Err(expected("round", "a number", &other)),
        };
        Ok(Collection::single(
            decimal.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero),
        ))
    }));
}

fn to_integer(function: &str, value: Decimal) -> Result<i32> {
    value
        .to_i32()
        .ok_or_else(|| FhirPathError::overflow(format!("{function}() result {value} as Integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::evaluator::EvaluationContext;
    use std::str::FromStr;

    fn dec(text: &str) -> Value {
        Value::Decimal(Decimal::from_str(text).unwrap())
    }

    fn call(name: &str, input: Value, args: &[Collection]) -> Result<Collection> {
        FunctionRegistry::new().get(name).unwrap().invoke(
            &mut EvaluationContext::new(),
            &Collection::single(input),
            args,
        )
    }

    #[test]
    fn test_rounding_family() {
        assert_eq!(call("ceiling", dec("1.1"), &[]).unwrap(), Collection::single(2));
        assert_eq!(call("floor", dec("-1.1"), &[]).unwrap(), Collection::single(-2));
        assert_eq!(call("truncate", dec("-1.9"), &[]).unwrap(), Collection::single(-1));
        assert_eq!(
            call("round", dec("3.14159"), &[Collection::single(2)]).unwrap(),
            Collection::single(dec("3.14"))
        );
        assert_eq!(call("round", Value::Integer(3), &[]).unwrap(), Collection::single(dec("3")));
        assert_eq!(call("round", dec("2.5"), &[]).unwrap(), Collection::single(dec("3")));
        assert_eq!(call("round", dec("0.5"), &[]).unwrap(), Collection::single(dec("1")));
        assert_eq!(call("round", dec("-2.5"), &[]).unwrap(), Collection::single(dec("-3")));
        assert_eq!(
            call("round", dec("1.125"), &[Collection::single(2)]).unwrap(),
            Collection::single(dec("1.13"))
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(call("abs", Value::Integer(-5), &[]).unwrap(), Collection::single(5));
        assert!(call("abs", Value::Integer(i32::MIN), &[]).unwrap_err().is(ErrorKind::Overflow));
        assert!(call("abs", Value::from("x"), &[]).unwrap_err().is(ErrorKind::TypeMismatch));
    }
}
