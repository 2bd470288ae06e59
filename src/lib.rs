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

//! FHIRPath expression compiler and evaluator
//!
//! Text is parsed into a syntax tree, bound against a function registry into
//! an immutable [`evaluator::Expression`] tree, and evaluated against a
//! [`Collection`] of resources.
//!
//! ```
//! use octofhir_fhirpath_expr::{Collection, EvaluateOptions, JsonElement, Value, compile};
//! use serde_json::json;
//!
//! let patient = JsonElement::from_resource(json!({
//!     "resourceType": "Patient",
//!     "name": [{"given": ["Lord"]}]
//! }));
//! let resources = Collection::single(Value::element(patient));
//! let given = compile("Patient.name.given")?
//!     .evaluate(&resources, EvaluateOptions::new())?;
//! assert_eq!(given, Collection::single("Lord"));
//! # Ok::<(), octofhir_fhirpath_expr::FhirPathError>(())
//! ```

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

pub use engine::{
    CompileOptions, CompiledExpression, EvaluateOptions, compile, compile_with, must_compile,
    tracking_transform,
};
pub use error::{ErrorKind, FhirPathError, Result};
pub use evaluator::EvaluationContext;
pub use model::{Collection, Element, ElementRef, JsonElement, Quantity, Value};
pub use registry::{FunctionBinding, FunctionRegistry};
