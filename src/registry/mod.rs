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

//! Function registry for FHIRPath
//!
//! Maps names to arity-checked callables. A fresh registry carries the
//! built-in library; compilation works on a clone so custom functions
//! registered for one compile never reach another.

pub mod functions;

use std::fmt;
use std::sync::{Arc, LazyLock};

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{FhirPathError, Result};
use crate::evaluator::EvaluationContext;
use crate::model::Collection;

/// Callable over the input collection and the evaluated arguments
pub type PureFunction = dyn Fn(&Collection, &[Collection]) -> Result<Collection> + Send + Sync;

/// Callable that also reads or writes the per-call context
pub type ContextFunction =
    dyn Fn(&mut EvaluationContext, &Collection, &[Collection]) -> Result<Collection> + Send + Sync;

/// The two shapes a bound function can take
#[derive(Clone)]
pub enum Callable {
    Pure(Arc<PureFunction>),
    Contextual(Arc<ContextFunction>),
}

/// A named callable with its inclusive arity range
#[derive(Clone)]
pub struct FunctionBinding {
    name: String,
    callable: Callable,
    min_arity: usize,
    /// `None` for no upper bound
    max_arity: Option<usize>,
}

impl FunctionBinding {
    /// Bind a pure function
    pub fn new<F>(name: impl Into<String>, min_arity: usize, max_arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&Collection, &[Collection]) -> Result<Collection> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callable: Callable::Pure(Arc::new(f)),
            min_arity,
            max_arity,
        }
    }

    /// Bind a function that needs the evaluation context
    pub fn contextual<F>(
        name: impl Into<String>,
        min_arity: usize,
        max_arity: Option<usize>,
        f: F,
    ) -> Self
    where
        F: Fn(&mut EvaluationContext, &Collection, &[Collection]) -> Result<Collection>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            callable: Callable::Contextual(Arc::new(f)),
            min_arity,
            max_arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_arity(&self) -> usize {
        self.min_arity
    }

    pub fn max_arity(&self) -> Option<usize> {
        self.max_arity
    }

    /// True when `count` arguments fall inside the arity range
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_arity && self.max_arity.is_none_or(|max| count <= max)
    }

    /// Reject bindings that can never be called
    pub fn validate(&self) -> Result<()> {
        let valid_name = self
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(FhirPathError::invalid_binding(
                &self.name,
                "name must be a plain identifier",
            ));
        }
        if let Some(max) = self.max_arity
            && max < self.min_arity
        {
            return Err(FhirPathError::invalid_binding(
                &self.name,
                format!("minimum arity {} exceeds maximum {max}", self.min_arity),
            ));
        }
        Ok(())
    }

    /// Run the callable
    pub fn invoke(
        &self,
        context: &mut EvaluationContext,
        input: &Collection,
        args: &[Collection],
    ) -> Result<Collection> {
        match &self.callable {
            Callable::Pure(f) => f(input, args),
            Callable::Contextual(f) => f(context, input, args),
        }
    }
}

impl fmt::Debug for FunctionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.callable {
            Callable::Pure(_) => "pure",
            Callable::Contextual(_) => "contextual",
        };
        f.debug_struct("FunctionBinding")
            .field("name", &self.name)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .field("callable", &kind)
            .finish()
    }
}

/// Name to binding map
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, FunctionBinding>,
}

static STANDARD: LazyLock<FunctionRegistry> = LazyLock::new(|| {
    let mut registry = FunctionRegistry::empty();
    functions::register_builtin_functions(&mut registry);
    registry
});

impl FunctionRegistry {
    /// Registry with the built-in library
    pub fn new() -> Self {
        STANDARD.clone()
    }

    /// Registry without any functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a binding; names can only be bound once
    pub fn register(&mut self, binding: FunctionBinding) -> Result<()> {
        binding.validate()?;
        if self.contains(binding.name()) {
            return Err(FhirPathError::duplicate_function(binding.name()));
        }
        debug!(
            "registered function '{}' ({}..{:?} args)",
            binding.name(),
            binding.min_arity(),
            binding.max_arity()
        );
        self.functions.insert(binding.name.clone(), binding);
        Ok(())
    }

    /// Built-in registration; the library itself has no duplicates
    pub(crate) fn define(&mut self, binding: FunctionBinding) {
        self.functions.insert(binding.name.clone(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionBinding> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Sorted function names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("function_count", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn identity(name: &str, min: usize, max: Option<usize>) -> FunctionBinding {
        FunctionBinding::new(name, min, max, |input, _| Ok(input.clone()))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register(identity("count", 0, Some(0))).unwrap_err();
        assert!(err.is(ErrorKind::DuplicateFunctionRegistration));

        registry.register(identity("double", 0, Some(0))).unwrap();
        let err = registry.register(identity("double", 0, Some(0))).unwrap_err();
        assert!(err.is(ErrorKind::DuplicateFunctionRegistration));
    }

    #[test]
    fn test_invalid_bindings_are_rejected() {
        let mut registry = FunctionRegistry::empty();
        let err = registry.register(identity("f", 2, Some(1))).unwrap_err();
        assert!(err.is(ErrorKind::InvalidFunctionBinding));
        let err = registry.register(identity("bad name", 0, None)).unwrap_err();
        assert!(err.is(ErrorKind::InvalidFunctionBinding));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_do_not_share_registrations() {
        let base = FunctionRegistry::new();
        let mut extended = base.clone();
        extended.register(identity("double", 0, Some(0))).unwrap();
        assert!(extended.contains("double"));
        assert!(!base.contains("double"));
        assert!(!FunctionRegistry::new().contains("double"));
    }

    #[test]
    fn test_arity_range() {
        let binding = identity("substring", 1, Some(2));
        assert!(!binding.accepts(0));
        assert!(binding.accepts(2));
        assert!(!binding.accepts(3));
        assert!(identity("trace", 1, None).accepts(7));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = FunctionRegistry::empty();
        registry.register(identity("zeta", 0, Some(0))).unwrap();
        registry.register(identity("alpha", 0, Some(0))).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);

        let builtin = FunctionRegistry::new();
        assert_eq!(builtin.names().len(), builtin.len());
        assert!(builtin.names().contains(&"count"));
    }
}
