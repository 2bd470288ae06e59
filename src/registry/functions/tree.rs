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

//! Tree navigation functions

use super::string_arg;
use crate::model::{Collection, Value};
use crate::registry::{FunctionBinding, FunctionRegistry};

/// Direct children of every element in `input`
pub fn children(input: &Collection) -> Collection {
    input
        .iter()
        .filter_map(Value::as_element)
        .flat_map(|element| element.children())
        .collect()
}

pub fn register_tree_functions(registry: &mut FunctionRegistry) {
    registry.define(FunctionBinding::new("children", 0, Some(0), |input, _| {
        Ok(children(input))
    }));
    registry.define(FunctionBinding::new("descendants", 0, Some(0), |input, _| {
        let mut result = Collection::new();
        let mut level = children(input);
        while !level.is_empty() {
            let next = children(&level);
            result.extend(level);
            level = next;
        }
        Ok(result)
    }));
    registry.define(FunctionBinding::new("extension", 1, Some(1), |input, args| {
        let Some(url) = string_arg("extension", &args[0])? else {
            return Ok(Collection::new());
        };
        Ok(input
            .iter()
            .filter_map(Value::as_element)
            .filter_map(|element| element.field("extension"))
            .flatten()
            .filter(|extension| {
                extension
                    .as_element()
                    .and_then(|e| e.field("url"))
                    .and_then(|urls| urls.first().and_then(Value::as_str).map(|u| u == url))
                    .unwrap_or(false)
            })
            .collect())
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationContext;
    use crate::model::JsonElement;
    use serde_json::json;

    fn patient() -> Collection {
        Collection::single(Value::element(JsonElement::from_resource(json!({
            "resourceType": "Patient",
            "active": true,
            "name": [{"family": "Doe", "given": ["Jane"]}],
            "extension": [
                {"url": "http://example.org/a", "valueString": "first"},
                {"url": "http://example.org/b", "valueBoolean": false}
            ]
        }))))
    }

    fn call(name: &str, input: &Collection, args: &[Collection]) -> Collection {
        FunctionRegistry::new()
            .get(name)
            .unwrap()
            .invoke(&mut EvaluationContext::new(), input, args)
            .unwrap()
    }

    #[test]
    fn test_children_and_descendants() {
        let input = patient();
        assert_eq!(call("children", &input, &[]).len(), 4);
        let descendants = call("descendants", &input, &[]);
        assert!(descendants.contains(&Value::from("Jane")));
        assert!(descendants.contains(&Value::from("http://example.org/b")));
    }

    #[test]
    fn test_extension_by_url() {
        let found = call("extension", &patient(), &[Collection::single("http://example.org/b")]);
        assert_eq!(found.len(), 1);
        assert!(call("extension", &patient(), &[Collection::single("urn:none")]).is_empty());
    }
}
