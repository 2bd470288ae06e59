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

//! Combining functions

use crate::model::Collection;
use crate::registry::{FunctionBinding, FunctionRegistry};

/// Merge two collections, dropping duplicates; shared with the `|` operator
pub fn union(left: &Collection, right: &Collection) -> Collection {
    let mut merged = left.clone();
    merged.extend(right.clone());
    merged.distinct()
}

pub fn register_combining_functions(registry: &mut FunctionRegistry) {
    registry.define(FunctionBinding::new("union", 1, Some(1), |input, args| {
        Ok(union(input, &args[0]))
    }));
    registry.define(FunctionBinding::new("combine", 1, Some(1), |input, args| {
        let mut combined = input.clone();
        combined.extend(args[0].clone());
        Ok(combined)
    }));
}
