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

//! Compile and evaluate entry points

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use log::debug;
use rust_decimal::Decimal;

use crate::compiler::{Binder, Transform};
use crate::error::{FhirPathError, Result};
use crate::evaluator::{EvaluationContext, Expression};
use crate::model::{
    Collection, ElementRef, JsonElement, PrecisionDate, PrecisionDateTime, PrecisionTime, Quantity,
    Value,
};
use crate::parser;
use crate::registry::{FunctionBinding, FunctionRegistry};

/// A parsed and bound expression, ready to evaluate any number of times.
///
/// The tree is immutable, so one compiled expression can be shared across
/// threads; each evaluation builds its own [`EvaluationContext`].
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    tree: Arc<Expression>,
}

impl CompiledExpression {
    /// Source text the expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The bound expression tree
    pub fn tree(&self) -> &Expression {
        &self.tree
    }

    /// Evaluate against `resources` with a fresh context
    pub fn evaluate(&self, resources: &Collection, options: EvaluateOptions) -> Result<Collection> {
        let mut ctx = EvaluationContext::new().with_resources(resources);
        options.apply(&mut ctx)?;
        self.evaluate_with_context(&mut ctx, resources)
    }

    /// Evaluate with a caller-prepared context, leaving its result slots
    /// and traces readable afterwards
    pub fn evaluate_with_context(
        &self,
        ctx: &mut EvaluationContext,
        resources: &Collection,
    ) -> Result<Collection> {
        self.tree.evaluate(ctx, resources)
    }

    /// Evaluate and coerce the result to a single string
    pub fn evaluate_as_string(&self, resources: &Collection, options: EvaluateOptions) -> Result<String> {
        self.evaluate(resources, options)?.to_string_value()
    }

    /// Evaluate and coerce the result to a boolean; empty is `false`
    pub fn evaluate_as_bool(&self, resources: &Collection, options: EvaluateOptions) -> Result<bool> {
        self.evaluate(resources, options)?.to_bool()
    }

    /// Evaluate and coerce the result to a 32-bit integer
    pub fn evaluate_as_i32(&self, resources: &Collection, options: EvaluateOptions) -> Result<i32> {
        self.evaluate(resources, options)?.to_i32()
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile with default options
pub fn compile(text: &str) -> Result<CompiledExpression> {
    compile_with(text, CompileOptions::default())
}

/// Compile, applying `options` in order first
pub fn compile_with(text: &str, options: CompileOptions) -> Result<CompiledExpression> {
    let mut registry = FunctionRegistry::new();
    let mut transform: Option<Transform> = None;
    let mut permissive = false;
    for step in options.steps {
        match step {
            CompileStep::Function(binding) => registry.register(binding)?,
            CompileStep::Transform(t) => {
                if transform.is_some() {
                    return Err(FhirPathError::DuplicateTransform);
                }
                transform = Some(t);
            }
            CompileStep::Permissive => permissive = true,
        }
    }

    let syntax = parser::parse(text)?;
    let tree = Binder::new(&registry)
        .with_transform(transform.as_ref())
        .permissive(permissive)
        .bind(&syntax)?;
    debug!("compiled expression '{text}'");
    Ok(CompiledExpression {
        source: text.to_string(),
        tree: Arc::new(tree),
    })
}

/// Compile or panic; for expressions fixed at build time
pub fn must_compile(text: &str) -> CompiledExpression {
    match compile(text) {
        Ok(expression) => expression,
        Err(err) => panic!("failed to compile '{text}': {err}"),
    }
}

/// Transform that wraps field and index steps so each records its result
/// in the context's last and before-last slots
pub fn tracking_transform() -> Transform {
    Arc::new(|expression: Expression| match expression {
        Expression::Field { .. } | Expression::Index { .. } => {
            Expression::Tracked(Box::new(expression))
        }
        other => other,
    })
}

enum CompileStep {
    Function(FunctionBinding),
    Transform(Transform),
    Permissive,
}

impl fmt::Debug for CompileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(binding) => f.debug_tuple("Function").field(binding).finish(),
            Self::Transform(_) => f.write_str("Transform"),
            Self::Permissive => f.write_str("Permissive"),
        }
    }
}

/// Compile-time configuration, applied in the order given
#[derive(Debug, Default)]
pub struct CompileOptions {
    steps: Vec<CompileStep>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom function taking `(input, args)`
    pub fn with_function<F>(
        mut self,
        name: impl Into<String>,
        min_arity: usize,
        max_arity: Option<usize>,
        f: F,
    ) -> Self
    where
        F: Fn(&Collection, &[Collection]) -> Result<Collection> + Send + Sync + 'static,
    {
        let binding = FunctionBinding::new(name, min_arity, max_arity, f);
        debug!("custom function {}/{min_arity}", binding.name());
        self.steps.push(CompileStep::Function(binding));
        self
    }

    /// Register a custom function that also receives the evaluation context
    pub fn with_context_function<F>(
        mut self,
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
        let binding = FunctionBinding::contextual(name, min_arity, max_arity, f);
        debug!("custom context function {}/{min_arity}", binding.name());
        self.steps.push(CompileStep::Function(binding));
        self
    }

    /// Install a rewrite applied to every bound node; only one is allowed
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.steps.push(CompileStep::Transform(transform));
        self
    }

    /// Also resolve legacy field spellings
    pub fn permissive(mut self) -> Self {
        self.steps.push(CompileStep::Permissive);
        self
    }
}

/// Evaluation-time configuration
#[derive(Debug, Default)]
pub struct EvaluateOptions {
    now: Option<DateTime<FixedOffset>>,
    constants: Vec<(String, Result<Collection>)>,
}

impl EvaluateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze `now()`, `today()` and `timeOfDay()` at `now`
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    /// Bind `%name`. The value must be a [`Value`], a [`Collection`], an
    /// element, or one of the system scalar types; anything else fails the
    /// evaluation with `UnsupportedConstantType`.
    pub fn with_constant<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        let converted = constant_collection(&name, Box::new(value), std::any::type_name::<T>());
        self.constants.push((name, converted));
        self
    }

    fn apply(self, ctx: &mut EvaluationContext) -> Result<()> {
        if let Some(now) = self.now {
            ctx.set_now(now);
        }
        for (name, value) in self.constants {
            ctx.bind_constant(name, value?)?;
        }
        Ok(())
    }
}

fn constant_collection(
    name: &str,
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
) -> Result<Collection> {
    let value = match value.downcast::<Collection>() {
        Ok(collection) => return Ok(*collection),
        Err(other) => other,
    };
    let value = match value.downcast::<JsonElement>() {
        Ok(element) => return Ok(Collection::single(Value::element(*element))),
        Err(other) => other,
    };

    // Anything with a `Value` conversion becomes a singleton
    macro_rules! singleton {
        ($value:ident: $($ty:ty),+) => {
            $(
                let $value = match $value.downcast::<$ty>() {
                    Ok(inner) => return Ok(Collection::single(*inner)),
                    Err(other) => other,
                };
            )+
        };
    }
    singleton!(value: Value, ElementRef, bool, i32, String, &'static str, Decimal, Quantity);
    singleton!(value: PrecisionDate, PrecisionDateTime, PrecisionTime);

    Err(FhirPathError::unsupported_constant(name, type_name))
}
