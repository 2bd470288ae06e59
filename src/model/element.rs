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

//! Reflective capability over externally owned resource trees
//!
//! The evaluator never looks inside a resource directly. Everything it needs
//! (type tests, child navigation, structural equality) goes through this trait,
//! so any resource representation can be plugged in.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::collection::Collection;
use super::value::Value;

/// Shared handle to a structured element or resource
pub type ElementRef = Arc<dyn Element>;

/// A node of a structured resource tree
pub trait Element: fmt::Debug + Send + Sync {
    /// Runtime type name, e.g. `Patient` or `HumanName`
    fn type_name(&self) -> &str;

    /// True when this element is an instance of `name` or one of its subtypes
    fn is_type(&self, name: &str) -> bool;

    /// Values of the named child field, flattening repeats.
    ///
    /// Returns `None` when the field is not defined for this element's type
    /// and `Some` (possibly empty) when it is.
    fn field(&self, name: &str) -> Option<Collection>;

    /// Values of a choice field addressed by its base name (`value` for
    /// `valueQuantity`). `None` when the element has no such choice field.
    fn choice_field(&self, _base: &str) -> Option<Collection> {
        None
    }

    /// Names of the fields this element's type defines
    fn field_names(&self) -> Vec<String>;

    /// All direct child values, in field order
    fn children(&self) -> Collection;

    /// System value this element stands for, if any (a FHIR `Quantity`
    /// element compares as a System quantity)
    fn to_system_value(&self) -> Option<Value> {
        None
    }

    /// Deep structural equality
    fn structurally_equals(&self, other: &dyn Element) -> bool;

    /// Serialise back to JSON for output
    fn to_json(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;
}
