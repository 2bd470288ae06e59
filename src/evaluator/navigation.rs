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

//! Member access, indexing and root type filtering

use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Element, Value};

/// Navigate `name` on every element of `input`, flattening repeats.
///
/// Resolution tries the exact field, then a choice field by suffix, then
/// (permissive only) a legacy spelling that ignores `_` and letter case.
/// A name that resolves on none of the input values is an error.
pub fn field(input: &Collection, name: &str, permissive: bool) -> Result<Collection> {
    let mut result = Collection::new();
    let mut unresolved: Option<&Value> = None;
    let mut resolved_any = false;

    for value in input {
        let found = match value {
            Value::Element(element) => resolve(element.as_ref(), name, permissive),
            _ => None,
        };
        match found {
            Some(children) => {
                resolved_any = true;
                result.extend(children);
            }
            None => {
                unresolved.get_or_insert(value);
            }
        }
    }

    match unresolved {
        Some(value) if !resolved_any => Err(FhirPathError::invalid_field(name, value.type_name())),
        _ => Ok(result),
    }
}

fn resolve(element: &dyn Element, name: &str, permissive: bool) -> Option<Collection> {
    if let Some(children) = element.field(name) {
        return Some(children);
    }
    if let Some(children) = element.choice_field(name) {
        return Some(children);
    }
    if !permissive {
        return None;
    }
    let wanted = legacy_key(name);
    element
        .field_names()
        .into_iter()
        .find(|candidate| legacy_key(candidate) == wanted)
        .and_then(|candidate| element.field(&candidate))
}

fn legacy_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick the item at `index`; out of range is empty
pub fn index(input: &Collection, index: &Collection) -> Result<Collection> {
    let Some(position) = index.to_optional_singleton()? else {
        return Ok(Collection::new());
    };
    let position = match position.to_system() {
        Some(Value::Integer(i)) => i,
        _ => {
            return Err(FhirPathError::type_mismatch(format!(
                "index must be an Integer, got {}",
                position.type_name()
            )));
        }
    };
    let item = usize::try_from(position).ok().and_then(|i| input.get(i));
    Ok(Collection::from_option(item.cloned()))
}

/// Keep the elements that are instances of the resource type `name`
pub fn type_filter(input: &Collection, name: &str) -> Collection {
    input
        .iter()
        .filter(|value| value.as_element().is_some_and(|e| e.is_type(name)))
        .cloned()
        .collect()
}
