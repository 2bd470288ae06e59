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

//! Utility functions that read or write the evaluation context

use log::info;

use super::string_arg;
use crate::model::{Collection, Value};
use crate::registry::{FunctionBinding, FunctionRegistry};

pub fn register_utility_functions(registry: &mut FunctionRegistry) {
    // trace(name[, projection]) logs and records, then passes its input through
    registry.define(FunctionBinding::contextual("trace", 1, Some(2), |ctx, input, args| {
        let label = string_arg("trace", &args[0])?.unwrap_or_default();
        let shown = args.get(1).unwrap_or(input);
        match serde_json::to_string(shown) {
            Ok(json) => info!("trace {label}: {json}"),
            Err(err) => info!("trace {label}: <unserialisable: {err}>"),
        }
        ctx.record_trace(label, shown.clone());
        Ok(input.clone())
    }));
    registry.define(FunctionBinding::contextual("now", 0, Some(0), |ctx, _, _| {
        Ok(Collection::single(Value::DateTime(ctx.now())))
    }));
    registry.define(FunctionBinding::contextual("today", 0, Some(0), |ctx, _, _| {
        Ok(Collection::single(Value::Date(ctx.today())))
    }));
    registry.define(FunctionBinding::contextual("timeOfDay", 0, Some(0), |ctx, _, _| {
        Ok(Collection::single(Value::Time(ctx.time_of_day())))
    }));
}
