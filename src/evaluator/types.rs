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

//! Runtime type tests for `is`, `as` and `ofType`

use std::fmt;

use crate::error::{FhirPathError, Result};
use crate::model::{Collection, SystemType, Value, schema};

/// A resolved type specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `System.X`
    System(SystemType),
    /// `FHIR.X`
    Fhir(String),
    /// A bare name, matched against both namespaces
    Unqualified(String),
}

impl TypeRef {
    /// Resolve dotted name parts. One part is unqualified, two parts name
    /// a namespace, anything longer is rejected.
    pub fn resolve(parts: &[String]) -> Result<Self> {
        match parts {
            [name] => Ok(Self::Unqualified(name.clone())),
            [namespace, name] => match namespace.as_str() {
                "System" => SystemType::from_name(name).map(Self::System).ok_or_else(|| {
                    FhirPathError::type_mismatch(format!("unknown System type '{name}'"))
                }),
                "FHIR" => Ok(Self::Fhir(name.clone())),
                other => Err(FhirPathError::type_mismatch(format!(
                    "unknown type namespace '{other}'"
                ))),
            },
            _ => Err(FhirPathError::type_mismatch(format!(
                "type specifier '{}' has too many qualifiers",
                parts.join(".")
            ))),
        }
    }

    /// True when `value` is an instance of this type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::System(expected), value) => value.system_type() == Some(*expected),
            (Self::Fhir(name) | Self::Unqualified(name), Value::Element(element)) => {
                element.is_type(name)
            }
            (Self::Fhir(name), value) => fhir_primitive_system_type(name)
                .is_some_and(|t| value.system_type() == Some(t)),
            (Self::Unqualified(name), value) => {
                let system = SystemType::from_name(name).or_else(|| fhir_primitive_system_type(name));
                system.is_some_and(|t| value.system_type() == Some(t))
            }
        }
    }

    /// Keep the values that are instances of this type
    pub fn filter(&self, input: &Collection) -> Collection {
        input.iter().filter(|v| self.matches(v)).cloned().collect()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System(t) => write!(f, "System.{}", t.name()),
            Self::Fhir(name) => write!(f, "FHIR.{name}"),
            Self::Unqualified(name) => f.write_str(name),
        }
    }
}

/// System type a FHIR primitive is represented by once loaded
fn fhir_primitive_system_type(name: &str) -> Option<SystemType> {
    if !schema::is_primitive_type(name) {
        return None;
    }
    Some(match name {
        "boolean" => SystemType::Boolean,
        "integer" | "positiveInt" | "unsignedInt" | "integer64" => SystemType::Integer,
        "decimal" => SystemType::Decimal,
        "date" => SystemType::Date,
        "dateTime" | "instant" => SystemType::DateTime,
        "time" => SystemType::Time,
        _ => SystemType::String,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::JsonElement;
    use serde_json::json;

    fn parts(text: &str) -> Vec<String> {
        text.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_resolution_by_part_count() {
        assert_eq!(
            TypeRef::resolve(&parts("System.Integer")).unwrap(),
            TypeRef::System(SystemType::Integer)
        );
        assert_eq!(
            TypeRef::resolve(&parts("Patient")).unwrap(),
            TypeRef::Unqualified("Patient".into())
        );
        let err = TypeRef::resolve(&parts("FHIR.Patient.name")).unwrap_err();
        assert!(err.is(ErrorKind::TypeMismatch));
        assert!(TypeRef::resolve(&parts("System.Patient")).is_err());
    }

    #[test]
    fn test_matching() {
        let patient = Value::element(JsonElement::from_resource(json!({"resourceType": "Patient"})));
        assert!(TypeRef::Unqualified("Patient".into()).matches(&patient));
        assert!(TypeRef::Fhir("DomainResource".into()).matches(&patient));
        assert!(!TypeRef::System(SystemType::String).matches(&patient));

        assert!(TypeRef::Unqualified("Integer".into()).matches(&Value::Integer(1)));
        assert!(TypeRef::Fhir("boolean".into()).matches(&Value::Boolean(true)));
        assert!(TypeRef::Unqualified("code".into()).matches(&Value::from("final")));
        assert!(!TypeRef::Fhir("Integer".into()).matches(&Value::Integer(1)));
    }
}
