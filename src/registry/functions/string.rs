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

//! String manipulation functions
//!
//! Positions and lengths count characters, not bytes. An empty input or
//! an empty argument gives an empty result.

use regex::Regex;

use super::{integer_arg, string_arg};
use crate::error::{FhirPathError, Result};
use crate::model::{Collection, Value};
use crate::registry::{FunctionBinding, FunctionRegistry};

/// Bind a function of the input string and one string argument
fn with_pattern<F>(registry: &mut FunctionRegistry, name: &'static str, f: F)
where
    F: Fn(&str, &str) -> Result<Value> + Send + Sync + 'static,
{
    registry.define(FunctionBinding::new(name, 1, Some(1), move |input, args| {
        let (Some(text), Some(pattern)) = (string_arg(name, input)?, string_arg(name, &args[0])?)
        else {
            return Ok(Collection::new());
        };
        Ok(Collection::single(f(&text, &pattern)?))
    }));
}

/// Bind a function of the input string alone
fn unary<F>(registry: &mut FunctionRegistry, name: &'static str, f: F)
where
    F: Fn(&str) -> Collection + Send + Sync + 'static,
{
    registry.define(FunctionBinding::new(name, 0, Some(0), move |input, _| {
        Ok(string_arg(name, input)?
            .map(|text| f(&text))
            .unwrap_or_default())
    }));
}

fn compile_regex(function: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| FhirPathError::function(function, format!("invalid regex '{pattern}': {err}")))
}

pub fn register_string_functions(registry: &mut FunctionRegistry) {
    with_pattern(registry, "indexOf", |text, pattern| {
        let index = text
            .find(pattern)
            .map(|byte| text[..byte].chars().count())
            .map(|chars| i32::try_from(chars).unwrap_or(i32::MAX))
            .unwrap_or(-1);
        Ok(Value::Integer(index))
    });
    with_pattern(registry, "startsWith", |text, prefix| {
        Ok(Value::Boolean(text.starts_with(prefix)))
    });
    with_pattern(registry, "endsWith", |text, suffix| {
        Ok(Value::Boolean(text.ends_with(suffix)))
    });
    with_pattern(registry, "contains", |text, needle| {
        Ok(Value::Boolean(text.contains(needle)))
    });
    with_pattern(registry, "matches", |text, pattern| {
        Ok(Value::Boolean(compile_regex("matches", pattern)?.is_match(text)))
    });

    registry.define(FunctionBinding::new("substring", 1, Some(2), substring));
    registry.define(FunctionBinding::new("replace", 2, Some(2), |input, args| {
        let (Some(text), Some(pattern), Some(substitution)) = (
            string_arg("replace", input)?,
            string_arg("replace", &args[0])?,
            string_arg("replace", &args[1])?,
        ) else {
            return Ok(Collection::new());
        };
        Ok(Collection::single(replace(&text, &pattern, &substitution)))
    }));
    registry.define(FunctionBinding::new("replaceMatches", 2, Some(2), |input, args| {
        let (Some(text), Some(pattern), Some(substitution)) = (
            string_arg("replaceMatches", input)?,
            string_arg("replaceMatches", &args[0])?,
            string_arg("replaceMatches", &args[1])?,
        ) else {
            return Ok(Collection::new());
        };
        let regex = compile_regex("replaceMatches", &pattern)?;
        Ok(Collection::single(
            regex.replace_all(&text, substitution.as_str()).into_owned(),
        ))
    }));

    unary(registry, "upper", |text| Collection::single(text.to_uppercase()));
    unary(registry, "lower", |text| Collection::single(text.to_lowercase()));
    unary(registry, "trim", |text| Collection::single(text.trim()));
    unary(registry, "length", |text| {
        Collection::single(i32::try_from(text.chars().count()).unwrap_or(i32::MAX))
    });
    unary(registry, "toChars", |text| {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    });

    registry.define(FunctionBinding::new("split", 1, Some(1), |input, args| {
        let (Some(text), Some(separator)) =
            (string_arg("split", input)?, string_arg("split", &args[0])?)
        else {
            return Ok(Collection::new());
        };
        if separator.is_empty() {
            return Ok(text.chars().map(|c| Value::String(c.to_string())).collect());
        }
        Ok(text.split(separator.as_str()).map(Value::from).collect())
    }));
    registry.define(FunctionBinding::new("join", 0, Some(1), |input, args| {
        let separator = match args.first() {
            Some(arg) => string_arg("join", arg)?.unwrap_or_default(),
            None => String::new(),
        };
        let parts = input
            .iter()
            .map(|value| match value.to_system() {
                Some(Value::String(s)) => Ok(s),
                _ => Err(super::expected("join", "String items", value)),
            })
            .collect::<Result<Vec<_>>>()?;
        if parts.is_empty() {
            return Ok(Collection::new());
        }
        Ok(Collection::single(parts.join(&separator)))
    }));
}

fn substring(input: &Collection, args: &[Collection]) -> Result<Collection> {
    let Some(text) = string_arg("substring", input)? else {
        return Ok(Collection::new());
    };
    let Some(start) = integer_arg("substring", &args[0])? else {
        return Ok(Collection::new());
    };
    let length = match args.get(1) {
        Some(arg) => integer_arg("substring", arg)?,
        None => None,
    };

    let char_count = text.chars().count();
    let Ok(start) = usize::try_from(start) else {
        return Ok(Collection::new());
    };
    if start >= char_count {
        return Ok(Collection::new());
    }
    let taken = match length {
        Some(length) => usize::try_from(length).unwrap_or(0),
        None => char_count,
    };
    Ok(Collection::single(
        text.chars().skip(start).take(taken).collect::<String>(),
    ))
}

/// Plain replacement; an empty pattern inserts the substitution around
/// every character
fn replace(text: &str, pattern: &str, substitution: &str) -> String {
    if !pattern.is_empty() {
        return text.replace(pattern, substitution);
    }
    let mut result = String::with_capacity(text.len() * (substitution.len() + 1));
    result.push_str(substitution);
    for c in text.chars() {
        result.push(c);
        result.push_str(substitution);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::evaluator::EvaluationContext;
    use rstest::rstest;

    fn call(name: &str, input: &str, args: &[&str]) -> Result<Collection> {
        let registry = FunctionRegistry::new();
        let args: Vec<Collection> = args.iter().map(|a| Collection::single(*a)).collect();
        registry.get(name).unwrap().invoke(
            &mut EvaluationContext::new(),
            &Collection::single(input),
            &args,
        )
    }

    #[rstest]
    #[case("indexOf", "abcdefg", &["bc"], Value::Integer(1))]
    #[case("indexOf", "abcdefg", &["x"], Value::Integer(-1))]
    #[case("indexOf", "ébc", &["c"], Value::Integer(2))]
    #[case("startsWith", "abcdefg", &["abc"], Value::Boolean(true))]
    #[case("endsWith", "abcdefg", &["abc"], Value::Boolean(false))]
    #[case("contains", "abcdefg", &["cde"], Value::Boolean(true))]
    #[case("matches", "N8000123123", &["^N[0-9]{8}"], Value::Boolean(true))]
    #[case("replace", "abc", &["", "x"], Value::from("xaxbxcx"))]
    #[case("replaceMatches", "11/30/1972", &[r"(\d+)/(\d+)/(\d+)", "$3-$1-$2"], Value::from("1972-11-30"))]
    #[case("upper", "abc", &[], Value::from("ABC"))]
    #[case("length", "héllo", &[], Value::Integer(5))]
    #[case("trim", "  a b ", &[], Value::from("a b"))]
    fn test_string_functions(
        #[case] name: &str,
        #[case] input: &str,
        #[case] args: &[&str],
        #[case] expected: Value,
    ) {
        assert_eq!(call(name, input, args).unwrap(), Collection::single(expected));
    }

    #[test]
    fn test_substring_bounds() {
        let registry = FunctionRegistry::new();
        let substring = registry.get("substring").unwrap();
        let mut ctx = EvaluationContext::new();
        let input = Collection::single("abcdefg");
        let run = |ctx: &mut EvaluationContext, args: &[Collection]| {
            substring.invoke(ctx, &input, args).unwrap()
        };
        assert_eq!(run(&mut ctx, &[Collection::single(3)]), Collection::single("defg"));
        assert_eq!(
            run(&mut ctx, &[Collection::single(1), Collection::single(2)]),
            Collection::single("bc")
        );
        assert!(run(&mut ctx, &[Collection::single(7)]).is_empty());
        assert!(run(&mut ctx, &[Collection::single(-1)]).is_empty());
    }

    #[test]
    fn test_split_join_and_chars() {
        let parts = call("split", "a,b,,c", &[","]).unwrap();
        assert_eq!(parts.len(), 4);
        let registry = FunctionRegistry::new();
        let joined = registry
            .get("join")
            .unwrap()
            .invoke(&mut EvaluationContext::new(), &parts, &[Collection::single("|")])
            .unwrap();
        assert_eq!(joined, Collection::single("a|b||c"));
        assert_eq!(call("toChars", "ab", &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_regex_and_non_string_input() {
        let err = call("matches", "abc", &["("]).unwrap_err();
        assert!(err.is(ErrorKind::Function));

        let registry = FunctionRegistry::new();
        let err = registry
            .get("upper")
            .unwrap()
            .invoke(&mut EvaluationContext::new(), &Collection::single(1), &[])
            .unwrap_err();
        assert!(err.is(ErrorKind::TypeMismatch));
    }
}
