// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standard 5-field cron expressions.
//!
//! `minute hour day-of-month month day-of-week` with `*`, `,`, `-` and `/`
//! operators. Parsing is strict: empty, malformed, and 6-field expressions
//! are rejected up front so a bad schedule can never reach the scheduler.
//! No cron crate appears in this workspace's dependency set; the field
//! grammar is small enough to parse directly into bitmasks.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("empty cron expression")]
    Empty,
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid {field} field: {token:?}")]
    Invalid { field: &'static str, token: String },
}

/// A parsed cron expression. Field sets are bitmasks over the allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronExpr {
    source: String,
    minutes: u64,
    hours: u32,
    dom: u32,
    months: u16,
    dow: u8,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(CronError::Empty);
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }

        let minutes = parse_field(fields[0], 0, 59, "minute")?;
        let hours = parse_field(fields[1], 0, 23, "hour")? as u32;
        let dom = parse_field(fields[2], 1, 31, "day-of-month")? as u32;
        let months = parse_field(fields[3], 1, 12, "month")? as u16;
        let mut dow = parse_field(fields[4], 0, 7, "day-of-week")?;
        // 7 is an alias for Sunday
        if dow & (1 << 7) != 0 {
            dow = (dow | 1) & 0x7f;
        }

        Ok(Self {
            source: trimmed.to_string(),
            minutes,
            hours,
            dom,
            months,
            dow: dow as u8,
            dom_restricted: fields[2] != "*",
            dow_restricted: fields[4] != "*",
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The next fire time strictly after `after`, or `None` if the
    /// expression never matches within the search horizon (~5 years).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut cursor = (after + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;

        for _ in 0..(366 * 5) {
            let date = cursor.date_naive();
            if self.day_matches(date) {
                if let Some(found) = self.first_slot_on(date, cursor.hour(), cursor.minute()) {
                    return Some(found);
                }
            }
            let next_day = date.succ_opt()?;
            cursor = Utc.from_utc_datetime(&next_day.and_hms_opt(0, 0, 0)?);
        }
        None
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if self.months & (1 << date.month()) == 0 {
            return false;
        }
        let dom_ok = self.dom & (1 << date.day()) != 0;
        let dow_ok = self.dow & (1 << date.weekday().num_days_from_sunday()) != 0;
        // Standard cron: when both day fields are restricted, either may match.
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom_ok || dow_ok,
            (true, false) => dom_ok,
            (false, true) => dow_ok,
            (false, false) => true,
        }
    }

    fn first_slot_on(
        &self,
        date: NaiveDate,
        start_hour: u32,
        start_minute: u32,
    ) -> Option<DateTime<Utc>> {
        for hour in start_hour..24 {
            if self.hours & (1 << hour) == 0 {
                continue;
            }
            let from = if hour == start_hour { start_minute } else { 0 };
            for minute in from..60 {
                if self.minutes & (1 << minute) != 0 {
                    return Some(Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0)?));
                }
            }
        }
        None
    }
}

impl std::fmt::Display for CronExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for CronExpr {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CronExpr {
    type Error = CronError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CronExpr> for String {
    fn from(expr: CronExpr) -> Self {
        expr.source
    }
}

/// Parse one cron field into a bitmask over `[min, max]`.
fn parse_field(field: &str, min: u32, max: u32, name: &'static str) -> Result<u64, CronError> {
    if field.is_empty() {
        return Err(CronError::Invalid { field: name, token: field.to_string() });
    }
    let mut mask = 0u64;
    for part in field.split(',') {
        mask |= parse_part(part, min, max, name)?;
    }
    Ok(mask)
}

fn parse_part(part: &str, min: u32, max: u32, name: &'static str) -> Result<u64, CronError> {
    let invalid = || CronError::Invalid { field: name, token: part.to_string() };

    let (range, step) = match part.split_once('/') {
        Some((range, step)) => {
            let step: u32 = step.parse().map_err(|_| invalid())?;
            if step == 0 {
                return Err(invalid());
            }
            (range, step)
        }
        None => (part, 1),
    };

    let (lo, hi) = if range == "*" {
        (min, max)
    } else if let Some((lo, hi)) = range.split_once('-') {
        let lo: u32 = lo.parse().map_err(|_| invalid())?;
        let hi: u32 = hi.parse().map_err(|_| invalid())?;
        if lo > hi {
            return Err(invalid());
        }
        (lo, hi)
    } else {
        let value: u32 = range.parse().map_err(|_| invalid())?;
        // A bare value with a step (e.g. "5/15") means "from 5 to max".
        if step > 1 {
            (value, max)
        } else {
            (value, value)
        }
    };

    if lo < min || hi > max {
        return Err(invalid());
    }

    let mut mask = 0u64;
    let mut v = lo;
    while v <= hi {
        mask |= 1 << v;
        v += step;
    }
    Ok(mask)
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
