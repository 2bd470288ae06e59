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

//! Precision-aware temporal types
//!
//! Dates, times and date-times remember the coarsest unit that was written
//! in their source text. Two values are only comparable down to the finer
//! of the two precisions they share; past that point the answer is unknown.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Precision levels for temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum TemporalPrecision {
    /// YYYY
    Year,
    /// YYYY-MM
    Month,
    /// YYYY-MM-DD
    Day,
    /// hh
    Hour,
    /// hh:mm
    Minute,
    /// hh:mm:ss
    Second,
    /// hh:mm:ss.fff
    Millisecond,
    /// hh:mm:ss.ffffff
    Microsecond,
}

impl TemporalPrecision {
    /// Number of comparable components in a date-time of this precision.
    /// Seconds and their fraction count as one component.
    fn date_time_components(self) -> usize {
        match self {
            Self::Year => 1,
            Self::Month => 2,
            Self::Day => 3,
            Self::Hour => 4,
            Self::Minute => 5,
            Self::Second | Self::Millisecond | Self::Microsecond => 6,
        }
    }

    fn time_components(self) -> usize {
        match self {
            Self::Year | Self::Month | Self::Day | Self::Hour => 1,
            Self::Minute => 2,
            Self::Second | Self::Millisecond | Self::Microsecond => 3,
        }
    }

    fn from_fraction_digits(digits: usize) -> Self {
        if digits <= 3 {
            Self::Millisecond
        } else {
            Self::Microsecond
        }
    }
}

/// Calendar and clock units usable in temporal arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl CalendarUnit {
    /// Resolve a calendar keyword (singular or plural) or its UCUM code
    pub fn from_unit(unit: &str) -> Option<Self> {
        Some(match unit {
            "year" | "years" | "a" => Self::Year,
            "month" | "months" | "mo" => Self::Month,
            "week" | "weeks" | "wk" => Self::Week,
            "day" | "days" | "d" => Self::Day,
            "hour" | "hours" | "h" => Self::Hour,
            "minute" | "minutes" | "min" => Self::Minute,
            "second" | "seconds" | "s" => Self::Second,
            "millisecond" | "milliseconds" | "ms" => Self::Millisecond,
            _ => return None,
        })
    }

    fn is_date_unit(self) -> bool {
        matches!(self, Self::Year | Self::Month | Self::Week | Self::Day)
    }

    fn milliseconds(self) -> i64 {
        match self {
            Self::Year => 365 * 86_400_000,
            Self::Month => 30 * 86_400_000,
            Self::Week => 7 * 86_400_000,
            Self::Day => 86_400_000,
            Self::Hour => 3_600_000,
            Self::Minute => 60_000,
            Self::Second => 1_000,
            Self::Millisecond => 1,
        }
    }
}

/// Date with year, month or day precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionDate {
    pub date: NaiveDate,
    pub precision: TemporalPrecision,
}

/// Date-time with an optional explicit offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionDateTime {
    pub datetime: DateTime<FixedOffset>,
    pub precision: TemporalPrecision,
    /// False when the source text carried no offset; the value is then read as UTC
    pub tz_specified: bool,
}

/// Time of day with hour through microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecisionTime {
    pub time: NaiveTime,
    pub precision: TemporalPrecision,
}

impl PrecisionDate {
    pub fn new(date: NaiveDate, precision: TemporalPrecision) -> Self {
        Self { date, precision }
    }

    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub fn parse(text: &str) -> Option<Self> {
        let (date, precision) = parse_date_part(text)?;
        Some(Self { date, precision })
    }

    fn components(&self) -> Vec<i64> {
        let all = [
            self.date.year() as i64,
            self.date.month() as i64,
            self.date.day() as i64,
        ];
        all[..self.precision.date_time_components().min(3)].to_vec()
    }

    /// Compare at the shared precision. `None` when the values agree as far
    /// as both go but one of them carries more detail.
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_components(&self.components(), &other.components())
    }

    /// Add an integral amount of a calendar unit
    pub fn add(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        let (months, days) = match self.precision {
            TemporalPrecision::Year => (truncate_to_years(amount, unit)? * 12, 0),
            TemporalPrecision::Month => (truncate_to_months(amount, unit)?, 0),
            _ => match unit {
                CalendarUnit::Year => (amount.checked_mul(12)?, 0),
                CalendarUnit::Month => (amount, 0),
                other => (0, amount.checked_mul(other.milliseconds())? / 86_400_000),
            },
        };
        let date = add_months(self.date, months)?;
        let date = date.checked_add_signed(Duration::try_days(days)?)?;
        Some(Self::new(date, self.precision))
    }

    /// Promote to a date-time at the same precision
    pub fn to_date_time(&self) -> PrecisionDateTime {
        let naive = self.date.and_time(NaiveTime::default());
        PrecisionDateTime {
            datetime: utc().from_utc_datetime(&naive),
            precision: self.precision,
            tz_specified: false,
        }
    }
}

impl PrecisionDateTime {
    pub fn new(datetime: DateTime<FixedOffset>, precision: TemporalPrecision) -> Self {
        Self {
            datetime,
            precision,
            tz_specified: true,
        }
    }

    /// Parse `YYYY[-MM[-DD]][T[hh[:mm[:ss[.fff]]]][Z|+hh:mm|-hh:mm]]`
    pub fn parse(text: &str) -> Option<Self> {
        let (date_text, time_text) = match text.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (text, None),
        };
        let (date, date_precision) = parse_date_part(date_text)?;

        let time_text = match time_text {
            Some(t) if !t.is_empty() => t,
            _ => {
                return Some(Self {
                    datetime: utc().from_utc_datetime(&date.and_time(NaiveTime::default())),
                    precision: date_precision,
                    tz_specified: false,
                });
            }
        };
        if date_precision != TemporalPrecision::Day {
            return None;
        }

        let (clock, offset) = split_offset(time_text)?;
        let (time, precision) = parse_time_part(clock)?;
        let naive = NaiveDateTime::new(date, time);
        let (datetime, tz_specified) = match offset {
            Some(offset) => (offset.from_local_datetime(&naive).single()?, true),
            None => (utc().from_utc_datetime(&naive), false),
        };
        Some(Self {
            datetime,
            precision,
            tz_specified,
        })
    }

    fn components(&self) -> Vec<i64> {
        let naive = if self.precision >= TemporalPrecision::Hour {
            self.datetime.naive_utc()
        } else {
            self.datetime.naive_local()
        };
        let all = [
            naive.year() as i64,
            naive.month() as i64,
            naive.day() as i64,
            naive.hour() as i64,
            naive.minute() as i64,
            second_micros(naive.time()),
        ];
        all[..self.precision.date_time_components()].to_vec()
    }

    /// Compare at the shared precision after normalising offsets
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_components(&self.components(), &other.components())
    }

    /// Add an integral amount of a calendar unit
    pub fn add(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        if self.precision <= TemporalPrecision::Day {
            let date = PrecisionDate::new(self.datetime.date_naive(), self.precision).add(amount, unit)?;
            let naive = NaiveDateTime::new(date.date, self.datetime.time());
            return Some(Self {
                datetime: self.datetime.offset().from_local_datetime(&naive).single()?,
                ..*self
            });
        }

        let local = self.datetime.naive_local();
        let shifted = match unit {
            CalendarUnit::Year => shift_months(local, amount.checked_mul(12)?)?,
            CalendarUnit::Month => shift_months(local, amount)?,
            other => local.checked_add_signed(Duration::try_milliseconds(
                amount.checked_mul(other.milliseconds())?,
            )?)?,
        };
        Some(Self {
            datetime: self.datetime.offset().from_local_datetime(&shifted).single()?,
            ..*self
        })
    }
}

impl PrecisionTime {
    pub fn new(time: NaiveTime, precision: TemporalPrecision) -> Self {
        Self { time, precision }
    }

    /// Parse `hh[:mm[:ss[.fff]]]`
    pub fn parse(text: &str) -> Option<Self> {
        let (time, precision) = parse_time_part(text)?;
        Some(Self { time, precision })
    }

    fn components(&self) -> Vec<i64> {
        let all = [
            self.time.hour() as i64,
            self.time.minute() as i64,
            second_micros(self.time),
        ];
        all[..self.precision.time_components()].to_vec()
    }

    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        compare_components(&self.components(), &other.components())
    }

    /// Add an amount of a clock unit, wrapping around midnight.
    /// Date units are not defined on times.
    pub fn add(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        if unit.is_date_unit() {
            return None;
        }
        let delta = Duration::try_milliseconds(amount.checked_mul(unit.milliseconds())?)?;
        let (time, _) = self.time.overflowing_add_signed(delta);
        Some(Self::new(time, self.precision))
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn second_micros(time: NaiveTime) -> i64 {
    time.second() as i64 * 1_000_000 + (time.nanosecond() as i64 / 1_000)
}

fn compare_components(left: &[i64], right: &[i64]) -> Option<Ordering> {
    for (l, r) in left.iter().zip(right) {
        match l.cmp(r) {
            Ordering::Equal => continue,
            decided => return Some(decided),
        }
    }
    if left.len() == right.len() {
        Some(Ordering::Equal)
    } else {
        None
    }
}

fn truncate_to_years(amount: i64, unit: CalendarUnit) -> Option<i64> {
    Some(match unit {
        CalendarUnit::Year => amount,
        CalendarUnit::Month => amount / 12,
        other => amount.checked_mul(other.milliseconds())? / CalendarUnit::Year.milliseconds(),
    })
}

fn truncate_to_months(amount: i64, unit: CalendarUnit) -> Option<i64> {
    Some(match unit {
        CalendarUnit::Year => amount.checked_mul(12)?,
        CalendarUnit::Month => amount,
        other => amount.checked_mul(other.milliseconds())? / CalendarUnit::Month.milliseconds(),
    })
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    if months == 0 {
        return Some(date);
    }
    let total = date.year() as i64 * 12 + date.month0() as i64 + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    let last_day = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, date.day().min(last_day))
}

fn shift_months(datetime: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(
        add_months(datetime.date(), months)?,
        datetime.time(),
    ))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some(first_of_next.pred_opt()?.day())
}

fn parse_number(text: &str, digits: usize) -> Option<u32> {
    if text.len() != digits || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_date_part(text: &str) -> Option<(NaiveDate, TemporalPrecision)> {
    let mut parts = text.split('-');
    let year = parse_number(parts.next()?, 4)? as i32;
    let month = match parts.next() {
        Some(m) => Some(parse_number(m, 2)?),
        None => None,
    };
    let day = match parts.next() {
        Some(d) => Some(parse_number(d, 2)?),
        None => None,
    };
    if parts.next().is_some() || (month.is_none() && day.is_some()) {
        return None;
    }
    let precision = match (month, day) {
        (None, _) => TemporalPrecision::Year,
        (Some(_), None) => TemporalPrecision::Month,
        (Some(_), Some(_)) => TemporalPrecision::Day,
    };
    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
    Some((date, precision))
}

fn parse_time_part(text: &str) -> Option<(NaiveTime, TemporalPrecision)> {
    let mut parts = text.split(':');
    let hour = parse_number(parts.next()?, 2)?;
    let minute = match parts.next() {
        Some(m) => Some(parse_number(m, 2)?),
        None => None,
    };
    let seconds = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let (second, micros, precision) = match seconds {
        None if minute.is_some() => (0, 0, TemporalPrecision::Minute),
        None => (0, 0, TemporalPrecision::Hour),
        Some(s) => match s.split_once('.') {
            None => (parse_number(s, 2)?, 0, TemporalPrecision::Second),
            Some((whole, fraction)) => {
                if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let padded: String = fraction.chars().chain("000000".chars()).take(6).collect();
                (
                    parse_number(whole, 2)?,
                    padded.parse::<u32>().ok()?,
                    TemporalPrecision::from_fraction_digits(fraction.len()),
                )
            }
        },
    };
    let time = NaiveTime::from_hms_micro_opt(hour, minute.unwrap_or(0), second, micros)?;
    Some((time, precision))
}

fn split_offset(text: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(clock) = text.strip_suffix('Z') {
        return Some((clock, Some(utc())));
    }
    let Some(index) = text.rfind(['+', '-']) else {
        return Some((text, None));
    };
    let (clock, offset) = text.split_at(index);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let (hours, minutes) = offset[1..].split_once(':')?;
    let seconds = parse_number(hours, 2)? as i32 * 3600 + parse_number(minutes, 2)? as i32 * 60;
    Some((clock, Some(FixedOffset::east_opt(sign * seconds)?)))
}

fn write_time(f: &mut fmt::Formatter<'_>, time: NaiveTime, precision: TemporalPrecision) -> fmt::Result {
    write!(f, "{:02}", time.hour())?;
    if precision >= TemporalPrecision::Minute {
        write!(f, ":{:02}", time.minute())?;
    }
    if precision >= TemporalPrecision::Second {
        write!(f, ":{:02}", time.second())?;
    }
    match precision {
        TemporalPrecision::Millisecond => write!(f, ".{:03}", time.nanosecond() / 1_000_000),
        TemporalPrecision::Microsecond => write!(f, ".{:06}", time.nanosecond() / 1_000),
        _ => Ok(()),
    }
}

fn write_date(f: &mut fmt::Formatter<'_>, date: NaiveDate, precision: TemporalPrecision) -> fmt::Result {
    write!(f, "{:04}", date.year())?;
    if precision >= TemporalPrecision::Month {
        write!(f, "-{:02}", date.month())?;
    }
    if precision >= TemporalPrecision::Day {
        write!(f, "-{:02}", date.day())?;
    }
    Ok(())
}

impl fmt::Display for PrecisionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_date(f, self.date, self.precision)
    }
}

impl fmt::Display for PrecisionDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.datetime.naive_local();
        write_date(f, local.date(), self.precision)?;
        if self.precision <= TemporalPrecision::Day {
            return Ok(());
        }
        f.write_str("T")?;
        write_time(f, local.time(), self.precision)?;
        if self.tz_specified {
            let seconds = self.datetime.offset().local_minus_utc();
            if seconds == 0 {
                f.write_str("Z")?;
            } else {
                let sign = if seconds < 0 { '-' } else { '+' };
                let seconds = seconds.abs();
                write!(f, "{sign}{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PrecisionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_time(f, self.time, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_keep_precision() {
        for text in ["2015", "2015-02", "2015-02-04"] {
            assert_eq!(PrecisionDate::parse(text).unwrap().to_string(), text);
        }
        for text in [
            "2015-02-04T14",
            "2015-02-04T14:34",
            "2015-02-04T14:34:28",
            "2015-02-04T14:34:28.123Z",
            "2015-02-04T14:34:28+09:00",
        ] {
            assert_eq!(PrecisionDateTime::parse(text).unwrap().to_string(), text);
        }
        for text in ["14", "14:34", "14:34:28", "14:34:28.123456"] {
            assert_eq!(PrecisionTime::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(PrecisionDate::parse("2015-13").is_none());
        assert!(PrecisionDate::parse("2015-02-30").is_none());
        assert!(PrecisionDate::parse("15-02").is_none());
        assert!(PrecisionDateTime::parse("2015-02T10").is_none());
        assert!(PrecisionTime::parse("25:00").is_none());
        assert!(PrecisionTime::parse("10:00:00.").is_none());
        assert!(PrecisionDate::parse("2015-2").is_none());
        assert!(PrecisionDate::parse("2015-02-4").is_none());
        assert!(PrecisionTime::parse("10:7").is_none());
    }

    #[test]
    fn test_optional_components_set_precision() {
        assert_eq!(PrecisionDate::parse("2015").unwrap().precision, TemporalPrecision::Year);
        assert_eq!(PrecisionDate::parse("2015-02").unwrap().precision, TemporalPrecision::Month);
        assert_eq!(PrecisionDate::parse("2015-02-04").unwrap().precision, TemporalPrecision::Day);
        assert_eq!(PrecisionTime::parse("14").unwrap().precision, TemporalPrecision::Hour);
        assert_eq!(PrecisionTime::parse("14:34").unwrap().precision, TemporalPrecision::Minute);
    }

    #[test]
    fn test_precision_sensitive_comparison() {
        let month = PrecisionDate::parse("2000-01").unwrap();
        let day = PrecisionDate::parse("2000-01-03").unwrap();
        let february = PrecisionDate::parse("2000-02").unwrap();

        assert_eq!(month.partial_compare(&day), None);
        assert_eq!(february.partial_compare(&day), Some(Ordering::Greater));
        assert_eq!(day.partial_compare(&day), Some(Ordering::Equal));
    }

    #[test]
    fn test_offsets_normalised_before_comparison() {
        let utc = PrecisionDateTime::parse("2017-11-05T01:30:00Z").unwrap();
        let shifted = PrecisionDateTime::parse("2017-11-05T03:30:00+02:00").unwrap();
        assert_eq!(utc.partial_compare(&shifted), Some(Ordering::Equal));

        let millis = PrecisionDateTime::parse("2017-11-05T01:30:00.000Z").unwrap();
        assert_eq!(utc.partial_compare(&millis), Some(Ordering::Equal));
    }

    #[test]
    fn test_calendar_arithmetic_clamps_month_end() {
        let date = PrecisionDate::parse("2020-01-31").unwrap();
        assert_eq!(date.add(1, CalendarUnit::Month).unwrap().to_string(), "2020-02-29");
        assert_eq!(date.add(-1, CalendarUnit::Year).unwrap().to_string(), "2019-01-31");
        assert_eq!(date.add(2, CalendarUnit::Week).unwrap().to_string(), "2020-02-14");
        assert_eq!(date.add(25, CalendarUnit::Hour).unwrap().to_string(), "2020-02-01");

        let year = PrecisionDate::parse("2014").unwrap();
        assert_eq!(year.add(25, CalendarUnit::Month).unwrap().to_string(), "2016");
    }

    #[test]
    fn test_date_time_and_time_arithmetic() {
        let dt = PrecisionDateTime::parse("2019-12-31T23:30:00Z").unwrap();
        assert_eq!(
            dt.add(45, CalendarUnit::Minute).unwrap().to_string(),
            "2020-01-01T00:15:00Z"
        );

        let time = PrecisionTime::parse("23:00").unwrap();
        assert_eq!(time.add(2, CalendarUnit::Hour).unwrap().to_string(), "01:00");
        assert!(time.add(1, CalendarUnit::Day).is_none());
    }
}
