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

//! [`Element`] implementation over FHIR JSON

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;

use super::collection::Collection;
use super::element::Element;
use super::quantity::Quantity;
use super::schema::{self, FieldInfo};
use super::temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime};
use super::value::Value;

/// A FHIR resource or data type backed by parsed JSON.
///
/// Types described in [`schema`] expose exactly their declared fields;
/// anything else is open and exposes every JSON key.
#[derive(Debug, Clone)]
pub struct JsonElement {
    type_name: String,
    json: Arc<JsonValue>,
    open: bool,
}

impl JsonElement {
    /// Wrap a resource, taking its type from `resourceType`
    pub fn from_resource(json: JsonValue) -> Self {
        let type_name = json
            .get("resourceType")
            .and_then(JsonValue::as_str)
            .unwrap_or("Resource")
            .to_string();
        Self::with_type(type_name, json)
    }

    /// Wrap JSON as an instance of the given type
    pub fn with_type(type_name: impl Into<String>, json: JsonValue) -> Self {
        let type_name = type_name.into();
        let open = schema::type_info(&type_name).is_none();
        Self {
            type_name,
            json: Arc::new(json),
            open,
        }
    }

    /// Parse resource JSON text
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        Ok(Self::from_resource(serde_json::from_str(text)?))
    }

    fn untyped(json: JsonValue) -> Self {
        Self {
            type_name: "Element".to_string(),
            json: Arc::new(json),
            open: true,
        }
    }

    fn object(&self) -> Option<&serde_json::Map<String, JsonValue>> {
        self.json.as_object()
    }

    /// Declared schema type of a JSON key, resolving choice suffixes
    fn declared_type(&self, key: &str) -> Option<String> {
        if self.open {
            return None;
        }
        if let Some(field) = schema::find_field(&self.type_name, key) {
            return (!field.is_choice()).then(|| field.type_name.to_string());
        }
        schema::field_names(&self.type_name)
            .into_iter()
            .filter_map(|base| schema::find_field(&self.type_name, base))
            .filter(FieldInfo::is_choice)
            .find_map(|field| choice_suffix(key, field.base_name(), field.choices))
            .map(|suffix| schema::choice_suffix_type(suffix))
    }
}

fn choice_suffix<'k>(key: &'k str, base: &str, allowed: &[&str]) -> Option<&'k str> {
    let suffix = key.strip_prefix(base)?;
    let starts_upper = suffix.chars().next().is_some_and(char::is_uppercase);
    (starts_upper && (allowed.is_empty() || allowed.contains(&suffix))).then_some(suffix)
}

/// Convert a JSON node into collection values using an optional schema type
fn convert(json: &JsonValue, declared: Option<&str>) -> Collection {
    match json {
        JsonValue::Null => Collection::new(),
        JsonValue::Array(items) => items
            .iter()
            .flat_map(|item| convert(item, declared))
            .collect(),
        JsonValue::Object(map) => {
            let element = match (map.get("resourceType").and_then(JsonValue::as_str), declared) {
                (Some(resource_type), _) => JsonElement::with_type(resource_type, json.clone()),
                (None, Some(t)) if !schema::is_primitive_type(t) => {
                    JsonElement::with_type(t, json.clone())
                }
                _ => JsonElement::untyped(json.clone()),
            };
            Collection::single(Value::element(element))
        }
        primitive => Collection::from_option(convert_primitive(primitive, declared)),
    }
}

fn convert_primitive(json: &JsonValue, declared: Option<&str>) -> Option<Value> {
    if let (JsonValue::String(text), Some(t)) = (json, declared) {
        let temporal = match t {
            "date" => PrecisionDate::parse(text)
                .map(Value::Date)
                .or_else(|| PrecisionDateTime::parse(text).map(Value::DateTime)),
            "dateTime" | "instant" => PrecisionDateTime::parse(text).map(Value::DateTime),
            "time" => PrecisionTime::parse(text).map(Value::Time),
            _ => None,
        };
        if temporal.is_some() {
            return temporal;
        }
    }

    match json {
        JsonValue::Bool(b) => Some(Value::Boolean(*b)),
        JsonValue::Number(n) => {
            let as_integer = n.as_i64().and_then(|i| i32::try_from(i).ok());
            match (as_integer, declared) {
                (Some(i), Some(t)) if t != "decimal" => Some(Value::Integer(i)),
                (Some(i), None) => Some(Value::Integer(i)),
                _ => json_decimal(n).map(Value::Decimal),
            }
        }
        JsonValue::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

fn json_decimal(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| number.as_f64().and_then(Decimal::from_f64))
}

impl Element for JsonElement {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_type(&self, name: &str) -> bool {
        schema::is_subtype_of(&self.type_name, name)
    }

    fn field(&self, name: &str) -> Option<Collection> {
        let object = self.object()?;
        if self.open {
            return Some(
                object
                    .get(name)
                    .map(|json| convert(json, None))
                    .unwrap_or_default(),
            );
        }
        let field = schema::find_field(&self.type_name, name)?;
        if field.is_choice() {
            return self.choice_field(name);
        }
        Some(
            object
                .get(name)
                .map(|json| convert(json, Some(field.type_name)))
                .unwrap_or_default(),
        )
    }

    fn choice_field(&self, base: &str) -> Option<Collection> {
        let object = self.object()?;
        let allowed = if self.open {
            &[][..]
        } else {
            let field = schema::find_field(&self.type_name, base).filter(FieldInfo::is_choice)?;
            field.choices
        };
        let found = object.iter().find_map(|(key, json)| {
            choice_suffix(key, base, allowed).map(|suffix| (suffix, json))
        });
        match found {
            Some((suffix, json)) => Some(convert(json, Some(&schema::choice_suffix_type(suffix)))),
            None if self.open => None,
            None => Some(Collection::new()),
        }
    }

    fn field_names(&self) -> Vec<String> {
        if !self.open {
            return schema::field_names(&self.type_name)
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        self.object()
            .map(|object| {
                object
                    .keys()
                    .filter(|key| *key != "resourceType" && !key.starts_with('_'))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn children(&self) -> Collection {
        let Some(object) = self.object() else {
            return Collection::new();
        };
        object
            .iter()
            .filter(|(key, _)| *key != "resourceType" && !key.starts_with('_'))
            .flat_map(|(key, json)| convert(json, self.declared_type(key).as_deref()))
            .collect()
    }

    fn to_system_value(&self) -> Option<Value> {
        if !self.is_type("Quantity") {
            return None;
        }
        let object = self.object()?;
        let value = match object.get("value")? {
            JsonValue::Number(n) => json_decimal(n)?,
            _ => return None,
        };
        let unit = object
            .get("code")
            .or_else(|| object.get("unit"))
            .and_then(JsonValue::as_str)
            .unwrap_or("1");
        Some(Value::Quantity(Quantity::new(value, unit)))
    }

    fn structurally_equals(&self, other: &dyn Element) -> bool {
        other
            .as_any()
            .downcast_ref::<JsonElement>()
            .is_some_and(|other| self.json == other.json)
    }

    fn to_json(&self) -> JsonValue {
        (*self.json).clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
