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

//! Command-line front end: evaluate, parse or validate an expression, or list
//! the built-in functions

use std::fs;
use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use octofhir_fhirpath_expr::parser::parse;
use octofhir_fhirpath_expr::{
    Collection, CompileOptions, EvaluateOptions, FunctionRegistry, JsonElement, Value, compile_with,
};

#[derive(Parser)]
#[command(name = "octofhir-fhirpath")]
#[command(about = "Evaluate FHIRPath expressions against FHIR resources")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a FHIR resource
    Evaluate {
        /// Expression to evaluate
        expression: String,
        /// JSON file with the resource (stdin when omitted)
        #[arg(short, long)]
        file: Option<String>,
        /// Bind an external constant, as `name=<json>`
        #[arg(long = "var", value_name = "NAME=JSON")]
        vars: Vec<String>,
        /// Freeze now() at an RFC 3339 instant
        #[arg(long)]
        now: Option<String>,
        /// Accept legacy field spellings
        #[arg(long)]
        permissive: bool,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Parse an expression and print its syntax tree
    Parse {
        /// Expression to parse
        expression: String,
    },
    /// Check that an expression parses and binds
    Validate {
        /// Expression to validate
        expression: String,
        /// Accept legacy field spellings
        #[arg(long)]
        permissive: bool,
    },
    /// List the built-in functions with their arity
    Functions,
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Evaluate {
            expression,
            file,
            vars,
            now,
            permissive,
            pretty,
        } => handle_evaluate(&expression, file.as_deref(), &vars, now.as_deref(), permissive, pretty),
        Commands::Parse { expression } => handle_parse(&expression),
        Commands::Validate {
            expression,
            permissive,
        } => handle_validate(&expression, permissive),
        Commands::Functions => handle_functions(),
    };

    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn compile_options(permissive: bool) -> CompileOptions {
    if permissive {
        CompileOptions::new().permissive()
    } else {
        CompileOptions::new()
    }
}

fn handle_evaluate(
    expression: &str,
    file: Option<&str>,
    vars: &[String],
    now: Option<&str>,
    permissive: bool,
    pretty: bool,
) -> Result<()> {
    let resource_text = match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading '{path}'"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading resource from stdin")?;
            buffer
        }
    };
    let resource = JsonElement::parse(&resource_text).context("parsing resource JSON")?;

    let mut options = EvaluateOptions::new();
    if let Some(now) = now {
        let instant = DateTime::parse_from_rfc3339(now).with_context(|| format!("parsing --now '{now}'"))?;
        options = options.with_now(instant);
    }
    for var in vars {
        let (name, json) = var
            .split_once('=')
            .ok_or_else(|| anyhow!("--var expects name=<json>, got '{var}'"))?;
        let json: JsonValue =
            serde_json::from_str(json).with_context(|| format!("parsing value of --var {name}"))?;
        options = options.with_constant(name, json_constant(json)?);
    }

    let compiled = compile_with(expression, compile_options(permissive))?;
    let result = compiled.evaluate(&Collection::single(Value::element(resource)), options)?;

    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");
    Ok(())
}

/// Map a JSON value given on the command line onto a constant
fn json_constant(json: JsonValue) -> Result<Collection> {
    Ok(match json {
        JsonValue::Null => Collection::new(),
        JsonValue::Bool(b) => Collection::single(b),
        JsonValue::String(s) => Collection::single(s),
        JsonValue::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => Collection::single(i),
            None => {
                let decimal: Decimal = n
                    .to_string()
                    .parse()
                    .map_err(|e| anyhow!("number {n} is not a decimal: {e}"))?;
                Collection::single(decimal)
            }
        },
        JsonValue::Array(items) => {
            let mut collection = Collection::new();
            for item in items {
                collection.extend(json_constant(item)?);
            }
            collection
        }
        object @ JsonValue::Object(_) => {
            if object.get("resourceType").is_none() {
                bail!("object constants must be FHIR resources with a resourceType");
            }
            Collection::single(Value::element(JsonElement::from_resource(object)))
        }
    })
}

fn handle_parse(expression: &str) -> Result<()> {
    let tree = parse(expression)?;
    println!("{tree:#?}");
    Ok(())
}

fn handle_validate(expression: &str, permissive: bool) -> Result<()> {
    compile_with(expression, compile_options(permissive))?;
    println!("valid: {expression}");
    Ok(())
}

fn handle_functions() -> Result<()> {
    let registry = FunctionRegistry::new();
    for name in registry.names() {
        let Some(binding) = registry.get(name) else {
            continue;
        };
        match binding.max_arity() {
            Some(max) if max == binding.min_arity() => println!("{name}/{max}"),
            Some(max) => println!("{name}/{}..{max}", binding.min_arity()),
            None => println!("{name}/{}..", binding.min_arity()),
        }
    }
    Ok(())
}
