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

//! Subsetting functions

use super::integer_arg;
use crate::error::Result;
use crate::model::Collection;
use crate::registry::{FunctionBinding, FunctionRegistry};

pub fn register_subsetting_functions(registry: &mut FunctionRegistry) {
    registry.define(FunctionBinding::new("first", 0, Some(0), |input, _| {
        Ok(Collection::from_option(input.first().cloned()))
    }));
    registry.define(FunctionBinding::new("last", 0, Some(0), |input, _| {
        Ok(Collection::from_option(input.last().cloned()))
    }));
    registry.define(FunctionBinding::new("tail", 0, Some(0), |input, _| {
        Ok(input.iter().skip(1).cloned().collect())
    }));
    registry.define(FunctionBinding::new("single", 0, Some(0), |input, _| {
        Ok(Collection::from_option(input.to_optional_singleton()?.cloned()))
    }));
    registry.define(FunctionBinding::new("skip", 1, Some(1), skip));
    registry.define(FunctionBinding::new("take", 1, Some(1), take));
    registry.define(FunctionBinding::new("intersect", 1, Some(1), |input, args| {
        let mut result = Collection::new();
        for value in input {
            if args[0].contains(value) && !result.contains(value) {
                result.push(value.clone());
            }
        }
        Ok(result)
    }));
    registry.define(FunctionBinding::new("exclude", 1, Some(1), |input, args| {
        Ok(input
            .iter()
            .filter(|value| !args[0].contains(value))
            .cloned()
            .collect())
    }));
}

fn skip(input: &Collection, args: &[Collection]) -> Result<Collection> {
    let Some(count) = integer_arg("skip", &args[0])? else {
        return Ok(Collection::new());
    };
    let count = usize::try_from(count).unwrap_or(0);
    Ok(input.iter().skip(count).cloned().collect())
}

fn take(input: &Collection, args: &[Collection]) -> Result<Collection> {
    let Some(count) = integer_arg("take", &args[0])? else {
        return Ok(Collection::new());
    };
    let count = usize::try_from(count).unwrap_or(0);
    Ok(input.iter().take(count).cloned().collect())
}
