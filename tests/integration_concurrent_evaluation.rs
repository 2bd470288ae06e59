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

//! One compiled expression evaluated from many threads at once

use std::sync::Arc;
use std::thread;

use octofhir_fhirpath_expr::{
    Collection, CompileOptions, CompiledExpression, EvaluateOptions, EvaluationContext, compile,
    compile_with, tracking_transform,
};
use serde_json::json;

mod utils;
use utils::resource;

fn numbered_patient(id: usize) -> Collection {
    resource(json!({
        "resourceType": "Patient",
        "id": format!("concurrent-{id:04}"),
        "name": [{"family": format!("Family{id}"), "given": ["Concurrent", "User"]}]
    }))
}

#[test]
fn test_compiled_expression_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CompiledExpression>();
}

#[test]
fn test_shared_expression_across_threads() {
    let expr = Arc::new(compile("Patient.name.family & ':' & Patient.name.given.count().toString()").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let expr = Arc::clone(&expr);
            thread::spawn(move || {
                let resources = numbered_patient(id);
                (0..50)
                    .map(|_| expr.evaluate_as_string(&resources, EvaluateOptions::new()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|results| (id, results))
            })
        })
        .collect();

    for handle in handles {
        let (id, results) = handle.join().expect("worker panicked").unwrap();
        assert!(results.iter().all(|r| *r == format!("Family{id}:2")));
    }
}

#[test]
fn test_each_call_keeps_its_own_result_slots() {
    let options = CompileOptions::new().with_transform(tracking_transform());
    let expr = Arc::new(compile_with("Patient.name.family", options).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|id| {
            let expr = Arc::clone(&expr);
            thread::spawn(move || {
                let resources = numbered_patient(id);
                let mut ctx = EvaluationContext::new().with_resources(&resources);
                expr.evaluate_with_context(&mut ctx, &resources).unwrap();
                (id, ctx.last_result().cloned())
            })
        })
        .collect();

    for handle in handles {
        let (id, last) = handle.join().expect("worker panicked");
        assert_eq!(last, Some(Collection::single(format!("Family{id}"))));
    }
}
