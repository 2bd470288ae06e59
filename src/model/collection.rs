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

//! Ordered collections and singleton coercion

use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

use super::value::Value;
use crate::error::{FhirPathError, Result};

/// Ordered, possibly empty sequence of values.
///
/// Absence is always represented by an empty collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection(Vec<Value>);

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a one-element collection
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Empty for `None`, singleton for `Some`
    pub fn from_option(value: Option<Value>) -> Self {
        Self(value.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn extend(&mut self, other: Collection) {
        self.0.extend(other.0);
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    /// The only element, or `NotSingleton` for any other size
    pub fn to_singleton(&self) -> Result<&Value> {
        match self.0.as_slice() {
            [value] => Ok(value),
            values => Err(FhirPathError::not_singleton(values.len())),
        }
    }

    /// `None` when empty, the element when singleton, `NotSingleton` otherwise
    pub fn to_optional_singleton(&self) -> Result<Option<&Value>> {
        match self.0.as_slice() {
            [] => Ok(None),
            [value] => Ok(Some(value)),
            values => Err(FhirPathError::not_singleton(values.len())),
        }
    }

    /// Boolean coercion: empty is false, a single boolean is itself,
    /// anything else is an error
    pub fn to_bool(&self) -> Result<bool> {
        Ok(self.to_logical()?.unwrap_or(false))
    }

    /// Three-valued boolean coercion used by logical operators: empty is unknown
    pub fn to_logical(&self) -> Result<Option<bool>> {
        match self.to_optional_singleton()? {
            None => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| {
                FhirPathError::type_mismatch(format!(
                    "expected Boolean, got {}",
                    value.type_name()
                ))
            }),
        }
    }

    /// String coercion of a singleton scalar
    pub fn to_string_value(&self) -> Result<String> {
        let value = self.to_singleton()?;
        match value.to_system() {
            Some(Value::Element(_)) | None => Err(FhirPathError::type_mismatch(format!(
                "{} is not convertible to String",
                value.type_name()
            ))),
            Some(system) => Ok(system.to_string()),
        }
    }

    /// 32-bit integer coercion of a singleton; narrowing never truncates
    pub fn to_i32(&self) -> Result<i32> {
        let value = self.to_singleton()?;
        match value.to_system() {
            Some(Value::Integer(i)) => Ok(i),
            Some(Value::Decimal(d)) if d.fract().is_zero() => d
                .to_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| FhirPathError::overflow(format!("narrowing {d} to Integer"))),
            _ => Err(FhirPathError::type_mismatch(format!(
                "{} is not convertible to Integer",
                value.type_name()
            ))),
        }
    }

    /// Keep the first occurrence of each value
    pub fn distinct(&self) -> Collection {
        let mut result: Vec<Value> = Vec::with_capacity(self.0.len());
        for value in &self.0 {
            if !result.iter().any(|seen| super::compare::equal(seen, value) == Some(true)) {
                result.push(value.clone());
            }
        }
        Self(result)
    }

    /// True when some element equals `value`
    pub fn contains(&self, value: &Value) -> bool {
        self.0
            .iter()
            .any(|item| super::compare::equal(item, value) == Some(true))
    }
}

impl From<Vec<Value>> for Collection {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal::Decimal;

    #[test]
    fn test_to_bool_law() {
        assert!(!Collection::new().to_bool().unwrap());
        assert!(Collection::single(true).to_bool().unwrap());
        assert!(!Collection::single(false).to_bool().unwrap());

        let many = Collection::from_vec(vec![Value::Boolean(true), Value::Boolean(true)]);
        assert_eq!(many.to_bool().unwrap_err().kind(), ErrorKind::NotSingleton);

        let text = Collection::single("true");
        assert_eq!(text.to_bool().unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_to_i32_never_truncates() {
        assert_eq!(Collection::single(7).to_i32().unwrap(), 7);
        assert_eq!(
            Collection::single(Decimal::new(4200, 2)).to_i32().unwrap(),
            42
        );
        assert_eq!(
            Collection::single(Decimal::new(425, 1)).to_i32().unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            Collection::single(Decimal::new(5_000_000_000, 0))
                .to_i32()
                .unwrap_err()
                .kind(),
            ErrorKind::Overflow
        );
        assert_eq!(
            Collection::new().to_i32().unwrap_err().kind(),
            ErrorKind::NotSingleton
        );
    }

    #[test]
    fn test_to_string_value() {
        assert_eq!(Collection::single(12).to_string_value().unwrap(), "12");
        assert_eq!(Collection::single("x").to_string_value().unwrap(), "x");
    }

    #[test]
    fn test_distinct_uses_language_equality() {
        let values = Collection::from_vec(vec![
            Value::Integer(1),
            Value::Decimal(Decimal::new(100, 2)),
            Value::Integer(2),
        ]);
        assert_eq!(values.distinct().len(), 2);
    }
}
