//! Trigger expressions that decide when a job fires.
//!
//! Supported forms:
//! - `@every <duration>`: one or more `<number><unit>` groups, where the number
//!   may be fractional and the unit is one of `ns`, `us` (`µs`), `ms`, `s`, `m`
//!   or `h` (e.g. `@every 1h30m`, `@every 1.5h`, `@every 500us`)
//! - descriptors such as `@hourly` or `@daily`
//! - cron expressions with 5 fields (crontab, minute precision) or 6/7 fields
//!   (seconds, optional year), evaluated in local time
//!
//! In 5-field expressions the day-of-week field uses crontab numbering
//! (0 or 7 is Sunday). Six and seven field expressions use the `cron` crate's
//! own numbering (1 is Sunday).

use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriggerError {
    #[error("trigger expression is empty")]
    Empty,

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
}

/// When a job fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fires at a fixed interval, first one interval after the job starts.
    Every(Duration),
    /// Fires on every instant matched by a cron schedule, in local time.
    Cron(Box<Schedule>),
}

impl Trigger {
    /// The first firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Every(interval) => {
                let interval = chrono::Duration::from_std(*interval).ok()?;
                after.checked_add_signed(interval)
            }
            Trigger::Cron(schedule) => schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|next| next.with_timezone(&Utc)),
        }
    }

    /// The next firing after `cursor` that is not already in the past at `now`.
    ///
    /// Firings missed while the process was stalled are skipped rather than
    /// replayed in a burst.
    pub fn next_fire(
        &self,
        cursor: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut next = self.next_after(cursor)?;
        if next < now {
            next = match self {
                Trigger::Every(_) => self.next_after(now)?,
                Trigger::Cron(_) => self.next_after(now - chrono::Duration::milliseconds(1))?,
            };
        }
        Some(next)
    }
}

impl FromStr for Trigger {
    type Err = TriggerError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(TriggerError::Empty);
        }

        if let Some(interval) = expression.strip_prefix("@every") {
            return parse_interval(interval.trim()).map(Trigger::Every);
        }

        let invalid_cron = |reason: String| TriggerError::InvalidCron {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        let normalized = if expression == "@midnight" {
            "@daily".to_string()
        } else if !expression.starts_with('@') && fields.len() == 5 {
            let weekdays = crontab_weekdays(fields[4]).map_err(invalid_cron)?;
            format!(
                "0 {} {} {} {} {}",
                fields[0], fields[1], fields[2], fields[3], weekdays
            )
        } else {
            expression.to_string()
        };

        Schedule::from_str(&normalized)
            .map(|schedule| Trigger::Cron(Box::new(schedule)))
            .map_err(|e| invalid_cron(e.to_string()))
    }
}

/// Rewrites a crontab day-of-week field (0-7, Sunday is 0 and 7) into the
/// `cron` crate's numbering (1-7, Sunday is 1).
///
/// Fields written with day names are passed through unchanged.
fn crontab_weekdays(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" || field.chars().any(|c| c.is_ascii_alphabetic()) {
        return Ok(field.to_string());
    }

    let number = |s: &str| -> Result<u32, String> {
        s.parse::<u32>()
            .ok()
            .filter(|day| *day <= 7)
            .ok_or_else(|| format!("invalid day of week '{s}' in '{field}'"))
    };

    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<usize>()
                    .ok()
                    .filter(|step| *step > 0)
                    .ok_or_else(|| format!("invalid step '{step}' in '{field}'"))?;
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((start, end)) = range.split_once('-') {
            (number(start)?, number(end)?)
        } else {
            let start = number(range)?;
            // `n/step` runs from n to the end of the week.
            (start, if step.is_some() { 6.max(start) } else { start })
        };
        if start > end {
            return Err(format!("invalid day-of-week range '{range}' in '{field}'"));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7 + 1);
        }
    }

    Ok(days
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(","))
}

/// Parses durations such as `90s`, `1h30m`, `1.5h` or `250ms`.
fn parse_interval(input: &str) -> Result<Duration, TriggerError> {
    let invalid = || TriggerError::InvalidInterval(input.to_string());
    if input.is_empty() {
        return Err(invalid());
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).ok_or_else(invalid)?;
        let number = &rest[..number_end];
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        nanos += value * unit_nanos;
        rest = &rest[unit_end..];
    }

    if !nanos.is_finite() || nanos < 1.0 || nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
