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

//! Functions whose argument is re-evaluated once per input item

use std::fmt;

use super::{EvaluationContext, Expression};
use crate::error::Result;
use crate::model::Collection;

/// Higher-order function kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    Where,
    Select,
    All,
    Exists,
    Repeat,
}

impl LambdaKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "where" => Self::Where,
            "select" => Self::Select,
            "all" => Self::All,
            "exists" => Self::Exists,
            "repeat" => Self::Repeat,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Select => "select",
            Self::All => "all",
            Self::Exists => "exists",
            Self::Repeat => "repeat",
        }
    }

    pub fn apply(
        self,
        criteria: &Expression,
        ctx: &mut EvaluationContext,
        input: &Collection,
    ) -> Result<Collection> {
        match self {
            Self::Where => filter(criteria, ctx, input),
            Self::Exists => Ok(Collection::single(!filter(criteria, ctx, input)?.is_empty())),
            Self::Select => {
                let mut result = Collection::new();
                for (i, item) in input.iter().enumerate() {
                    let item = Collection::single(item.clone());
                    result.extend(ctx.with_index(i, |ctx| criteria.evaluate(ctx, &item))?);
                }
                Ok(result)
            }
            Self::All => {
                for (i, item) in input.iter().enumerate() {
                    let item = Collection::single(item.clone());
                    let keep = ctx.with_index(i, |ctx| criteria.evaluate(ctx, &item))?;
                    if !keep.to_bool()? {
                        return Ok(Collection::single(false));
                    }
                }
                Ok(Collection::single(true))
            }
            Self::Repeat => repeat(criteria, ctx, input),
        }
    }
}

impl fmt::Display for LambdaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn filter(criteria: &Expression, ctx: &mut EvaluationContext, input: &Collection) -> Result<Collection> {
    let mut result = Collection::new();
    for (i, value) in input.iter().enumerate() {
        let item = Collection::single(value.clone());
        let keep = ctx.with_index(i, |ctx| criteria.evaluate(ctx, &item))?;
        if keep.to_bool()? {
            result.push(value.clone());
        }
    }
    Ok(result)
}

/// Apply the projection to each new item until nothing new turns up
fn repeat(projection: &Expression, ctx: &mut EvaluationContext, input: &Collection) -> Result<Collection> {
    let mut result = Collection::new();
    let mut pending = input.clone();
    while !pending.is_empty() {
        let mut next = Collection::new();
        for (i, value) in pending.iter().enumerate() {
            let item = Collection::single(value.clone());
            let projected = ctx.with_index(i, |ctx| projection.evaluate(ctx, &item))?;
            for found in projected {
                if !result.contains(&found) && !next.contains(&found) {
                    next.push(found);
                }
            }
        }
        result.extend(next.clone());
        pending = next;
    }
    Ok(result)
}

/// `iif`: only the chosen branch is evaluated
pub fn conditional(
    criterion: &Expression,
    then_branch: &Expression,
    else_branch: Option<&Expression>,
    ctx: &mut EvaluationContext,
    input: &Collection,
) -> Result<Collection> {
    if criterion.evaluate(ctx, input)?.to_bool()? {
        then_branch.evaluate(ctx, input)
    } else {
        match else_branch {
            Some(branch) => branch.evaluate(ctx, input),
            None => Ok(Collection::new()),
        }
    }
}
