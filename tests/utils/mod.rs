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

//! Shared fixtures for the integration tests

#![allow(dead_code)]

use octofhir_fhirpath_expr::{Collection, EvaluateOptions, JsonElement, Result, Value, compile};
use serde_json::{Value as JsonValue, json};

pub fn resource(json: JsonValue) -> Collection {
    Collection::single(Value::element(JsonElement::from_resource(json)))
}

/// Patient with a single name, `given = ["Lord"]`
pub fn lord() -> Collection {
    resource(json!({
        "resourceType": "Patient",
        "name": [{"given": ["Lord"]}]
    }))
}

pub fn patient() -> Collection {
    resource(json!({
        "resourceType": "Patient",
        "id": "example",
        "active": true,
        "birthDate": "1980-05-10",
        "name": [
            {"use": "official", "family": "Grantham", "given": ["Lord"]},
            {"use": "nickname", "given": ["Robert", "Bob"]}
        ]
    }))
}

pub fn observation() -> Collection {
    resource(json!({
        "resourceType": "Observation",
        "status": "final",
        "code": {"coding": [{"system": "http://loinc.org", "code": "29463-7"}]},
        "valueQuantity": {"value": 185, "unit": "lbs"}
    }))
}

/// Compile and evaluate with default options
pub fn eval(text: &str, resources: &Collection) -> Result<Collection> {
    compile(text)?.evaluate(resources, EvaluateOptions::new())
}
