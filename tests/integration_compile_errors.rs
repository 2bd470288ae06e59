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

//! Errors surfaced by `compile` before any evaluation

use octofhir_fhirpath_expr::{
    Collection, CompileOptions, ErrorKind, FhirPathError, compile, compile_with, tracking_transform,
};
use rstest::rstest;

#[rstest]
#[case("1 +", ErrorKind::Syntax)]
#[case("name.", ErrorKind::Syntax)]
#[case("'unterminated", ErrorKind::Syntax)]
#[case("1.double()", ErrorKind::UnresolvedFunction)]
#[case("name.substring()", ErrorKind::ArityMismatch)]
#[case("name.where()", ErrorKind::ArityMismatch)]
#[case("@2020-02-30", ErrorKind::InvalidLiteral)]
#[case("@T25:00", ErrorKind::InvalidLiteral)]
#[case("99999999999", ErrorKind::InvalidLiteral)]
#[case("1 is System.Patient", ErrorKind::TypeMismatch)]
#[case("1 as FHIR.Patient.name", ErrorKind::TypeMismatch)]
fn test_compile_error_kinds(#[case] text: &str, #[case] kind: ErrorKind) {
    let err = compile(text).unwrap_err();
    assert!(err.is(kind), "{text}: expected {kind:?}, got {err}");
}

#[test]
fn test_lexical_errors_are_collected() {
    let err = compile("name = 'open\n  | #").unwrap_err();
    let FhirPathError::Syntax { errors } = err else {
        panic!("expected a syntax error, got {err}");
    };
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.line >= 1 && e.column >= 1));
}

#[test]
fn test_sibling_argument_errors_are_joined() {
    let err = compile("'abc'.replace(@2020-13-01, @T99:00)").unwrap_err();
    let FhirPathError::Multiple(errors) = &err else {
        panic!("expected joined errors, got {err}");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.is(ErrorKind::InvalidLiteral)));
}

#[test]
fn test_option_errors() {
    let noop = |input: &Collection, _: &[Collection]| Ok(input.clone());
    let err = compile_with(
        "name",
        CompileOptions::new()
            .with_function("twice", 0, Some(0), noop)
            .with_function("twice", 0, Some(0), noop),
    )
    .unwrap_err();
    assert!(err.is(ErrorKind::DuplicateFunctionRegistration));

    let err = compile_with("name", CompileOptions::new().with_function("bad name", 0, None, noop))
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidFunctionBinding));

    let err = compile_with("name", CompileOptions::new().with_function("range", 2, Some(1), noop))
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidFunctionBinding));

    let err = compile_with(
        "name",
        CompileOptions::new()
            .with_transform(tracking_transform())
            .with_transform(tracking_transform()),
    )
    .unwrap_err();
    assert!(err.is(ErrorKind::DuplicateTransform));
}

#[test]
fn test_custom_registrations_do_not_leak() {
    let options = CompileOptions::new().with_function("shout", 0, Some(0), |input, _| Ok(input.clone()));
    assert!(compile_with("name.shout()", options).is_ok());
    assert!(compile("name.shout()").unwrap_err().is(ErrorKind::UnresolvedFunction));
}
