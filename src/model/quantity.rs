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

//! Quantity type with unit normalisation and conversion

use octofhir_ucum::{evaluate_owned, parse_expression, precision::to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::temporal::CalendarUnit;

/// A decimal value paired with a unit code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    /// Numeric value
    pub value: Decimal,
    /// Unit as written (UCUM code or calendar keyword)
    pub unit: String,
}

/// Significant digits kept from a UCUM conversion factor
const FACTOR_DIGITS: u32 = 15;

/// UCUM evaluation of a unit: its dimension vector and its factor to the
/// canonical unit of that dimension
struct UnitMeasure<D> {
    dimension: D,
    factor: Decimal,
}

fn measure(unit: &str) -> Option<UnitMeasure<impl PartialEq>> {
    let unit = match unit.trim() {
        "" => "1",
        other => other,
    };
    let expression = parse_expression(unit).ok()?;
    let evaluated = evaluate_owned(&expression).ok()?;
    let factor = Decimal::try_from(to_f64(evaluated.factor)).ok()?;
    Some(UnitMeasure {
        dimension: evaluated.dim,
        factor,
    })
}

impl Quantity {
    /// Create a quantity; calendar keywords are kept as written
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Unit code used for comparison, mapping calendar keywords onto UCUM
    pub fn canonical_unit(&self) -> &str {
        match self.unit.as_str() {
            "year" | "years" => "a",
            "month" | "months" => "mo",
            "week" | "weeks" => "wk",
            "day" | "days" => "d",
            "hour" | "hours" => "h",
            "minute" | "minutes" => "min",
            "second" | "seconds" => "s",
            "millisecond" | "milliseconds" => "ms",
            other => other,
        }
    }

    /// True when the unit names a calendar or clock duration
    pub fn calendar_unit(&self) -> Option<CalendarUnit> {
        CalendarUnit::from_unit(&self.unit)
    }

    /// Convert to another unit of the same UCUM dimension
    pub fn convert_to(&self, unit: &str) -> Option<Quantity> {
        let target = Quantity::new(Decimal::ONE, unit);
        if self.canonical_unit() == target.canonical_unit() {
            return Some(Quantity::new(self.value, unit));
        }
        let from = measure(self.canonical_unit())?;
        let to = measure(target.canonical_unit())?;
        if from.dimension != to.dimension {
            return None;
        }
        let ratio = from.factor.checked_div(to.factor)?.round_sf(FACTOR_DIGITS)?;
        Some(Quantity::new(self.value.checked_mul(ratio)?.normalize(), unit))
    }

    /// True when both units measure the same dimension
    pub fn is_comparable(&self, other: &Quantity) -> bool {
        if self.canonical_unit() == other.canonical_unit() {
            return true;
        }
        match (measure(self.canonical_unit()), measure(other.canonical_unit())) {
            (Some(left), Some(right)) => left.dimension == right.dimension,
            _ => false,
        }
    }

    /// Compare after converting `other` into this quantity's unit
    pub fn partial_compare(&self, other: &Quantity) -> Option<Ordering> {
        if !self.is_comparable(other) {
            return None;
        }
        let other = other.convert_to(&self.unit)?;
        Some(self.value.cmp(&other.value))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.calendar_unit().is_some() && self.canonical_unit() != self.unit {
            write!(f, "{} {}", self.value, self.unit)
        } else {
            write!(f, "{} '{}'", self.value, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn q(value: &str, unit: &str) -> Quantity {
        Quantity::new(Decimal::from_str(value).unwrap(), unit)
    }

    #[test]
    fn test_same_dimension_converts() {
        assert_eq!(q("1", "kg").convert_to("g"), Some(q("1000", "g")));
        assert_eq!(q("250", "mL").convert_to("L"), Some(q("0.25", "L")));
        assert_eq!(q("1", "week").convert_to("d"), Some(q("7", "d")));
        assert_eq!(
            q("1000", "mg").partial_compare(&q("1", "g")),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_incompatible_units() {
        assert!(q("1", "kg").convert_to("m").is_none());
        assert!(q("1", "furlong").convert_to("m").is_none());
        assert!(!q("1", "mg").is_comparable(&q("1", "cm")));
        assert!(!q("1", "mg/dL").is_comparable(&q("1", "mg")));
    }

    #[test]
    fn test_compound_units_convert() {
        assert_eq!(q("1", "mg/dL").convert_to("mg/L"), Some(q("10", "mg/L")));
        assert_eq!(
            q("1", "kg/m2").partial_compare(&q("1000", "g/m2")),
            Some(Ordering::Equal)
        );
        assert!(q("1", "mg/dL").is_comparable(&q("3", "g/L")));
        assert_eq!(
            q("5", "[lb_av]").partial_compare(&q("2", "kg")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_display_keeps_written_unit() {
        assert_eq!(q("4", "g").to_string(), "4 'g'");
        assert_eq!(q("3", "days").to_string(), "3 days");
        assert_eq!(q("3", "d").to_string(), "3 'd'");
    }
}
