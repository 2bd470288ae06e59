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

//! Runtime value model: scalars, quantities, temporal precision, collections
//! and the element capability used to reach into resources

pub mod arithmetic;
pub mod collection;
pub mod compare;
pub mod element;
pub mod json;
pub mod quantity;
pub mod schema;
pub mod temporal;
pub mod value;

pub use collection::Collection;
pub use element::{Element, ElementRef};
pub use json::JsonElement;
pub use quantity::Quantity;
pub use temporal::{CalendarUnit, PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision};
pub use value::{SystemType, Value};
