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

//! Runtime values produced and consumed by FHIRPath expressions

use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use super::element::{Element, ElementRef};
use super::quantity::Quantity;
use super::temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime};

/// The built-in scalar kinds, independent of any resource schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemType {
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
}

impl SystemType {
    /// Resolve a System type name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Boolean" => Self::Boolean,
            "Integer" => Self::Integer,
            "Decimal" => Self::Decimal,
            "String" => Self::String,
            "Date" => Self::Date,
            "DateTime" => Self::DateTime,
            "Time" => Self::Time,
            "Quantity" => Self::Quantity,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Quantity => "Quantity",
        }
    }
}

/// A single item of a [`Collection`](super::Collection)
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Decimal(Decimal),
    String(String),
    Date(PrecisionDate),
    DateTime(PrecisionDateTime),
    Time(PrecisionTime),
    Quantity(Quantity),
    /// Handle into a structured resource tree
    Element(ElementRef),
}

impl Value {
    /// Wrap an element implementation
    pub fn element(element: impl Element + 'static) -> Self {
        Value::Element(Arc::new(element))
    }

    /// System kind of this value, `None` for elements
    pub fn system_type(&self) -> Option<SystemType> {
        Some(match self {
            Value::Boolean(_) => SystemType::Boolean,
            Value::Integer(_) => SystemType::Integer,
            Value::Decimal(_) => SystemType::Decimal,
            Value::String(_) => SystemType::String,
            Value::Date(_) => SystemType::Date,
            Value::DateTime(_) => SystemType::DateTime,
            Value::Time(_) => SystemType::Time,
            Value::Quantity(_) => SystemType::Quantity,
            Value::Element(_) => return None,
        })
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Element(e) => e.type_name().to_string(),
            other => other
                .system_type()
                .map(|t| format!("System.{}", t.name()))
                .unwrap_or_default(),
        }
    }

    /// Element values resolve to the System value they stand for,
    /// everything else is returned as is
    pub fn to_system(&self) -> Option<Value> {
        match self {
            Value::Element(e) => e.to_system_value(),
            other => Some(other.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Element(e) => e.to_system_value().and_then(|v| v.as_bool()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            Value::Element(e) => Some(e),
            _ => None,
        }
    }

    /// True for scalar (non-element) values
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Element(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Quantity(q) => write!(f, "{q}"),
            Value::Element(e) => write!(f, "{}", e.to_json()),
        }
    }
}

/// Strict equality: same kind and same content. Language-level `=`
/// semantics live in [`compare`](super::compare).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Quantity(a), Value::Quantity(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a.structurally_equals(b.as_ref()),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i32(*i),
            Value::Decimal(d) => Serialize::serialize(d, serializer),
            Value::Element(e) => e.to_json().serialize(serializer),
            other => serializer.collect_str(other),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Quantity> for Value {
    fn from(value: Quantity) -> Self {
        Value::Quantity(value)
    }
}

impl From<PrecisionDate> for Value {
    fn from(value: PrecisionDate) -> Self {
        Value::Date(value)
    }
}

impl From<PrecisionDateTime> for Value {
    fn from(value: PrecisionDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<PrecisionTime> for Value {
    fn from(value: PrecisionTime) -> Self {
        Value::Time(value)
    }
}

impl From<ElementRef> for Value {
    fn from(value: ElementRef) -> Self {
        Value::Element(value)
    }
}
