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

//! End-to-end evaluation of expressions against JSON resources

use chrono::{FixedOffset, TimeZone};
use octofhir_fhirpath_expr::{
    Collection, CompileOptions, ErrorKind, EvaluateOptions, EvaluationContext, Value, compile,
    compile_with,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod utils;
use serde_json::json;
use utils::{eval, lord, observation, patient, resource};

fn strings(items: &[&str]) -> Collection {
    items.iter().map(|s| Value::from(*s)).collect()
}

#[test]
fn test_given_names() {
    assert_eq!(eval("Patient.name.given", &lord()).unwrap(), Collection::single("Lord"));
}

#[test]
fn test_out_of_range_index_is_empty() {
    assert!(eval("Patient.name.given[5]", &lord()).unwrap().is_empty());
}

#[test]
fn test_adding_boolean_to_integer_fails() {
    let err = eval("1 + true", &lord()).unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
}

#[test]
fn test_unregistered_function_fails_to_compile() {
    assert!(compile("1.double()").unwrap_err().is(ErrorKind::UnresolvedFunction));
}

#[test]
fn test_or_with_empty_operand() {
    assert_eq!(eval("true or {}", &lord()).unwrap(), Collection::single(true));
    assert!(eval("false or {}", &lord()).unwrap().is_empty());
}

#[test]
fn test_host_value_constant_is_rejected() {
    struct HostValue {
        _id: u32,
    }
    let expr = compile("%var").unwrap();
    let options = EvaluateOptions::new().with_constant("var", HostValue { _id: 7 });
    let err = expr.evaluate(&lord(), options).unwrap_err();
    assert!(err.is(ErrorKind::UnsupportedConstantType));
}

#[test]
fn test_date_precision_law() {
    assert!(eval("@2000-01 = @2000-01-03", &lord()).unwrap().is_empty());
    assert_eq!(eval("@2000-02 = @2000-01-03", &lord()).unwrap(), Collection::single(false));
}

#[rstest]
#[case("{}")]
#[case("{}.given")]
#[case("Patient.name.where(false)")]
fn test_empty_results(#[case] text: &str) {
    assert!(eval(text, &patient()).unwrap().is_empty());
}

#[test]
fn test_boolean_coercion() {
    let expr = |text: &str| compile(text).unwrap();
    let options = EvaluateOptions::new;
    assert!(!expr("{}").evaluate_as_bool(&patient(), options()).unwrap());
    assert!(expr("Patient.active").evaluate_as_bool(&patient(), options()).unwrap());
    let err = expr("Patient.name.given").evaluate_as_bool(&patient(), options()).unwrap_err();
    assert!(err.is(ErrorKind::NotSingleton));
    let err = expr("'yes'").evaluate_as_bool(&patient(), options()).unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
}

#[rstest]
#[case("(7 + 0) = 7")]
#[case("(-2147483648 + 0) = -2147483648")]
#[case("(1.5 + 2.25) - 2.25 = 1.5")]
#[case("(5 'mg' + 2 'mg') - 2 'mg' = 5 'mg'")]
fn test_arithmetic_identity(#[case] text: &str) {
    assert_eq!(eval(text, &lord()).unwrap(), Collection::single(true));
}

#[rstest]
#[case("7 div 2", Value::Integer(3))]
#[case("-7 div 2", Value::Integer(-4))]
#[case("-7 mod 2", Value::Integer(1))]
#[case("'a' & {} & 'b'", Value::from("ab"))]
#[case("2 + 3 * 4", Value::Integer(14))]
fn test_operator_results(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval(text, &lord()).unwrap(), Collection::single(expected));
}

#[rstest]
#[case("1 'mg/dL' = 10 'mg/L'")]
#[case("1 'kg/m2' = 1000 'g/m2'")]
#[case("2 'kg' < 5 '[lb_av]'")]
#[case("(1 'g' + 500 'mg') = 1.5 'g'")]
#[case("2.5.round() = 3")]
#[case("(-2.5).round() = -3")]
#[case("1.125.round(2) = 1.13")]
fn test_units_and_rounding(#[case] text: &str) {
    assert_eq!(eval(text, &lord()).unwrap(), Collection::single(true));
}

#[test]
fn test_incompatible_units() {
    assert!(eval("1 'mg' = 1 'cm'", &lord()).unwrap().is_empty());
    assert!(eval("1 'mg' + 1 'cm'", &lord()).unwrap_err().is(ErrorKind::TypeMismatch));
}

#[test]
fn test_division_by_zero_is_empty() {
    assert!(eval("5 / 0", &lord()).unwrap().is_empty());
    assert!(eval("5 div 0", &lord()).unwrap().is_empty());
}

#[test]
fn test_integer_overflow() {
    let err = eval("2147483647 + 1", &lord()).unwrap_err();
    assert!(err.is(ErrorKind::Overflow));
}

#[rstest]
#[case("Patient.name.given")]
#[case("name.where(use = 'official').given.first()")]
#[case("Observation.value.unit = 'lbs' and  status != 'draft'")]
#[case("%resource.name.given[0] | {}")]
#[case("iif(active, 'yes', 'no') // trailing comment")]
fn test_display_returns_source(#[case] text: &str) {
    assert_eq!(compile(text).unwrap().to_string(), text);
}

#[test]
fn test_filtering_and_projection() {
    let p = patient();
    assert_eq!(
        eval("Patient.name.where(use = 'official').given", &p).unwrap(),
        Collection::single("Lord")
    );
    assert_eq!(
        eval("Patient.name.select(given.first())", &p).unwrap(),
        strings(&["Lord", "Robert"])
    );
    assert_eq!(
        eval("Patient.name.exists(given = 'Lord')", &p).unwrap(),
        Collection::single(true)
    );
    assert_eq!(
        eval("Patient.name.all(given.exists())", &p).unwrap(),
        Collection::single(true)
    );
    assert_eq!(
        eval("Patient.name.given.select($index)", &p).unwrap(),
        Collection::from_vec(vec![0.into(), 1.into(), 2.into()])
    );
}

#[test]
fn test_functions_over_resources() {
    let p = patient();
    assert_eq!(eval("Patient.name.given.count()", &p).unwrap(), Collection::single(3));
    assert_eq!(
        eval("Patient.name.given.last().upper()", &p).unwrap(),
        Collection::single("BOB")
    );
    assert_eq!(
        eval("iif(active, 'yes', 'no')", &p).unwrap(),
        Collection::single("yes")
    );
    assert_eq!(
        eval("Patient.name.given.first() is String", &p).unwrap(),
        Collection::single(true)
    );
    assert_eq!(eval("ofType(Patient).count()", &p).unwrap(), Collection::single(1));
    assert!(eval("Observation.status", &p).unwrap().is_empty());
}

#[test]
fn test_choice_fields() {
    let o = observation();
    assert_eq!(eval("Observation.value.unit", &o).unwrap(), Collection::single("lbs"));
    assert_eq!(eval("Observation.value.value > 100", &o).unwrap(), Collection::single(true));
    assert_eq!(
        eval("Observation.code.coding.code", &o).unwrap(),
        Collection::single("29463-7")
    );
}

#[test]
fn test_elements_compare_structurally() {
    let p = patient();
    assert_eq!(eval("Patient.name[0] = Patient.name[0]", &p).unwrap(), Collection::single(true));
    assert_eq!(eval("Patient.name[0] = Patient.name[1]", &p).unwrap(), Collection::single(false));
    assert_eq!(eval("Patient.name[0] != Patient.name[1]", &p).unwrap(), Collection::single(true));

    let twins = resource(json!({
        "resourceType": "Patient",
        "name": [{"family": "Doe", "given": ["A"]}, {"family": "Doe", "given": ["A"]}]
    }));
    assert_eq!(eval("name[0] = name[1]", &twins).unwrap(), Collection::single(true));
}

#[test]
fn test_resource_type_inside_argument_operand() {
    let p = patient();
    assert!(eval("Patient.name.where(Patient.id = 'x')", &p).unwrap().is_empty());
    assert_eq!(
        eval("Patient.name.where(use = 'official').family", &p).unwrap(),
        Collection::single("Grantham")
    );
}

#[test]
fn test_unknown_field_fails_at_evaluation() {
    let expr = compile("Patient.nickname").unwrap();
    let err = expr.evaluate(&patient(), EvaluateOptions::new()).unwrap_err();
    assert!(err.is(ErrorKind::InvalidField));
}

#[test]
fn test_permissive_field_names() {
    assert!(eval("Patient.Name.given", &lord()).unwrap_err().is(ErrorKind::InvalidField));
    let expr = compile_with("Patient.Name.given", CompileOptions::new().permissive()).unwrap();
    assert_eq!(
        expr.evaluate(&lord(), EvaluateOptions::new()).unwrap(),
        Collection::single("Lord")
    );
}

#[test]
fn test_reserved_constants() {
    let p = patient();
    assert_eq!(
        eval("%resource.name.given.first()", &p).unwrap(),
        Collection::single("Lord")
    );
    assert_eq!(
        eval("%ucum", &p).unwrap(),
        Collection::single("http://unitsofmeasure.org")
    );
    assert!(eval("%missing", &p).unwrap_err().is(ErrorKind::UnknownConstant));
}

#[test]
fn test_frozen_now() {
    let anchor = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 2, 29, 12, 0, 0)
        .unwrap();
    let expr = compile("today() = @2024-02-29 and Patient.birthDate < today()").unwrap();
    let result = expr
        .evaluate(&patient(), EvaluateOptions::new().with_now(anchor))
        .unwrap();
    assert_eq!(result, Collection::single(true));
}

#[test]
fn test_trace_is_recorded() {
    let resources = patient();
    let expr = compile("Patient.name.given.trace('given').count()").unwrap();
    let mut ctx = EvaluationContext::new().with_resources(&resources);
    let count = expr.evaluate_with_context(&mut ctx, &resources).unwrap();
    assert_eq!(count, Collection::single(3));
    assert_eq!(ctx.traces().len(), 1);
    assert_eq!(ctx.traces()[0].0, "given");
    assert_eq!(ctx.traces()[0].1, strings(&["Lord", "Robert", "Bob"]));
}
