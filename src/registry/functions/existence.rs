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

//! Existence functions and `not()`

use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Value};
use crate::registry::{FunctionBinding, FunctionRegistry};

pub fn register_existence_functions(registry: &mut FunctionRegistry) {
    registry.define(FunctionBinding::new("empty", 0, Some(0), |input, _| {
        Ok(Collection::single(input.is_empty()))
    }));
    // exists(criteria) is compiled to a lambda node
    registry.define(FunctionBinding::new("exists", 0, Some(0), |input, _| {
        Ok(Collection::single(!input.is_empty()))
    }));
    registry.define(FunctionBinding::new("count", 0, Some(0), count));
    registry.define(FunctionBinding::new("distinct", 0, Some(0), |input, _| {
        Ok(input.distinct())
    }));
    registry.define(FunctionBinding::new("isDistinct", 0, Some(0), |input, _| {
        Ok(Collection::single(input.distinct().len() == input.len()))
    }));
    registry.define(FunctionBinding::new("allTrue", 0, Some(0), |input, _| {
        Ok(Collection::single(booleans("allTrue", input)?.iter().all(|b| *b)))
    }));
    registry.define(FunctionBinding::new("anyTrue", 0, Some(0), |input, _| {
        Ok(Collection::single(booleans("anyTrue", input)?.iter().any(|b| *b)))
    }));
    registry.define(FunctionBinding::new("allFalse", 0, Some(0), |input, _| {
        Ok(Collection::single(booleans("allFalse", input)?.iter().all(|b| !*b)))
    }));
    registry.define(FunctionBinding::new("anyFalse", 0, Some(0), |input, _| {
        Ok(Collection::single(booleans("anyFalse", input)?.iter().any(|b| !*b)))
    }));
    registry.define(FunctionBinding::new("subsetOf", 1, Some(1), |input, args| {
        Ok(Collection::single(is_subset(input, &args[0])))
    }));
    registry.define(FunctionBinding::new("supersetOf", 1, Some(1), |input, args| {
        Ok(Collection::single(is_subset(&args[0], input)))
    }));
    registry.define(FunctionBinding::new("hasValue", 0, Some(0), |input, _| {
        let has_value = matches!(input.as_slice(), [value] if value.to_system().is_some_and(|v| v.is_primitive()));
        Ok(Collection::single(has_value))
    }));
    registry.define(FunctionBinding::new("not", 0, Some(0), |input, _| {
        Ok(Collection::from_option(
            input.to_logical()?.map(|b| Value::Boolean(!b)),
        ))
    }));
}

fn count(input: &Collection, _args: &[Collection]) -> Result<Collection> {
    let count = i32::try_from(input.len()).map_err(|_| FhirPathError::overflow("count()"))?;
    Ok(Collection::single(count))
}

fn booleans(function: &str, input: &Collection) -> Result<Vec<bool>> {
    input
        .iter()
        .map(|value| {
            value
                .as_bool()
                .ok_or_else(|| super::expected(function, "Boolean items", value))
        })
        .collect()
}

fn is_subset(subset: &Collection, superset: &Collection) -> bool {
    subset.iter().all(|value| superset.contains(value))
}
