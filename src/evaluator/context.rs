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

//! Evaluation context for FHIRPath expressions

use chrono::{DateTime, FixedOffset, Utc};
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{FhirPathError, Result};
use crate::model::{
    Collection, PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision, Value,
};

/// Code system URL bound to `%ucum`
pub const UCUM_URL: &str = "http://unitsofmeasure.org";

/// Mutable state of one evaluation call.
///
/// Holds the external constants, the time anchor read by `now()`,
/// `today()` and `timeOfDay()`, and the two most recent results recorded
/// by tracked nodes. One context serves one call; it is never shared.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// `%name` bindings, stored without the `%`
    constants: FxHashMap<String, Collection>,

    /// Frozen for the whole evaluation pass
    now: DateTime<FixedOffset>,

    /// Most recent tracked result
    last_result: Option<Collection>,

    /// Tracked result before [`Self::last_result`]
    before_last_result: Option<Collection>,

    /// `$index` values of the enclosing iterations, innermost last
    iteration: Vec<usize>,

    /// Labelled collections written by `trace()`, in call order
    traces: Vec<(String, Collection)>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    /// Create a context anchored at the current instant, with `%ucum` bound
    pub fn new() -> Self {
        let mut constants = FxHashMap::default();
        constants.insert("ucum".to_string(), Collection::single(UCUM_URL));
        Self {
            constants,
            now: Utc::now().fixed_offset(),
            last_result: None,
            before_last_result: None,
            iteration: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// Bind the resource-level constants (`%context`, `%resource`,
    /// `%rootResource`) to the initial input
    pub fn with_resources(mut self, resources: &Collection) -> Self {
        for name in ["context", "resource", "rootResource"] {
            self.constants.insert(name.to_string(), resources.clone());
        }
        self
    }

    /// Replace the time anchor
    pub fn set_now(&mut self, now: DateTime<FixedOffset>) {
        self.now = now;
    }

    /// The anchor as a millisecond-precision date-time
    pub fn now(&self) -> PrecisionDateTime {
        PrecisionDateTime::new(self.now, TemporalPrecision::Millisecond)
    }

    /// The anchor's calendar date in its own offset
    pub fn today(&self) -> PrecisionDate {
        PrecisionDate::new(self.now.date_naive(), TemporalPrecision::Day)
    }

    /// The anchor's wall-clock time in its own offset
    pub fn time_of_day(&self) -> PrecisionTime {
        PrecisionTime::new(self.now.time(), TemporalPrecision::Millisecond)
    }

    /// Bind `%name`; a name can be bound once
    pub fn bind_constant(&mut self, name: impl Into<String>, value: Collection) -> Result<()> {
        let name = name.into();
        if self.has_constant(&name) {
            return Err(FhirPathError::existing_constant(name));
        }
        debug!("binding constant %{name} ({} items)", value.len());
        self.constants.insert(name, value);
        Ok(())
    }

    /// Look up `%name`
    pub fn constant(&self, name: &str) -> Result<Collection> {
        self.constants
            .get(name)
            .cloned()
            .ok_or_else(|| FhirPathError::unknown_constant(name))
    }

    pub fn has_constant(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    /// Shift the previous result into the before-last slot and record `result`
    pub fn record_result(&mut self, result: &Collection) {
        self.before_last_result = self.last_result.replace(result.clone());
    }

    pub fn last_result(&self) -> Option<&Collection> {
        self.last_result.as_ref()
    }

    pub fn before_last_result(&self) -> Option<&Collection> {
        self.before_last_result.as_ref()
    }

    pub fn record_trace(&mut self, label: impl Into<String>, values: Collection) {
        self.traces.push((label.into(), values));
    }

    /// Everything `trace()` saw during this call
    pub fn traces(&self) -> &[(String, Collection)] {
        &self.traces
    }

    /// Run `body` with `$index` bound to `index`
    pub fn with_index<T>(&mut self, index: usize, body: impl FnOnce(&mut Self) -> T) -> T {
        self.iteration.push(index);
        let result = body(self);
        self.iteration.pop();
        result
    }

    /// Current `$index`, empty outside an iteration
    pub fn index(&self) -> Collection {
        self.iteration
            .last()
            .and_then(|i| i32::try_from(*i).ok())
            .map(|i| Collection::single(Value::Integer(i)))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    #[test]
    fn test_constants_bind_once() {
        let mut ctx = EvaluationContext::new();
        ctx.bind_constant("var", Collection::single("a")).unwrap();
        let err = ctx.bind_constant("var", Collection::new()).unwrap_err();
        assert!(err.is(ErrorKind::ExistingConstant));
        assert!(ctx.bind_constant("ucum", Collection::new()).is_err());
        assert_eq!(ctx.constant("var").unwrap(), Collection::single("a"));
        assert!(ctx.constant("missing").unwrap_err().is(ErrorKind::UnknownConstant));
    }

    #[test]
    fn test_result_slots_shift() {
        let mut ctx = EvaluationContext::new();
        ctx.record_result(&Collection::single(1));
        ctx.record_result(&Collection::single(2));
        assert_eq!(ctx.last_result(), Some(&Collection::single(2)));
        assert_eq!(ctx.before_last_result(), Some(&Collection::single(1)));
    }

    #[test]
    fn test_time_anchor() {
        let mut ctx = EvaluationContext::new();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        ctx.set_now(offset.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap());
        assert_eq!(ctx.today().to_string(), "2024-03-01");
        assert_eq!(ctx.time_of_day().to_string(), "23:30:00.000");
    }

    #[test]
    fn test_index_scoping() {
        let mut ctx = EvaluationContext::new();
        assert!(ctx.index().is_empty());
        let inner = ctx.with_index(3, |ctx| ctx.index());
        assert_eq!(inner, Collection::single(3));
        assert!(ctx.index().is_empty());
    }
}
