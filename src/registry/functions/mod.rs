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

//! Built-in function library
//!
//! `where`, `select`, `all`, `exists(criteria)`, `repeat`, `iif`, `ofType`,
//! `is` and `as` take unevaluated arguments and are bound by the compiler
//! as dedicated expression nodes, so they do not appear here.

pub mod combining;
pub mod conversion;
pub mod existence;
pub mod math;
pub mod string;
pub mod subsetting;
pub mod tree;
pub mod utility;

use super::FunctionRegistry;
use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Value};

/// Register the whole library
pub fn register_builtin_functions(registry: &mut FunctionRegistry) {
    existence::register_existence_functions(registry);
    subsetting::register_subsetting_functions(registry);
    combining::register_combining_functions(registry);
    conversion::register_conversion_functions(registry);
    string::register_string_functions(registry);
    math::register_math_functions(registry);
    tree::register_tree_functions(registry);
    utility::register_utility_functions(registry);
}

/// Singleton reduced to its System value. Empty input, and elements
/// without a System counterpart, give `None`.
pub(crate) fn system_value(collection: &Collection) -> Result<Option<Value>> {
    Ok(collection
        .to_optional_singleton()?
        .and_then(Value::to_system)
        .filter(Value::is_primitive))
}

pub(crate) fn string_arg(function: &str, collection: &Collection) -> Result<Option<String>> {
    match system_value(collection)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(expected(function, "String", &other)),
    }
}

pub(crate) fn integer_arg(function: &str, collection: &Collection) -> Result<Option<i32>> {
    match system_value(collection)? {
        None => Ok(None),
        Some(Value::Integer(i)) => Ok(Some(i)),
        Some(other) => Err(expected(function, "Integer", &other)),
    }
}

pub(crate) fn expected(function: &str, kind: &str, actual: &Value) -> FhirPathError {
    FhirPathError::type_mismatch(format!(
        "{function}() expects {kind}, got {}",
        actual.type_name()
    ))
}
