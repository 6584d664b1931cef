//! Cron-style recurrence expressions.
//!
//! Five whitespace-separated fields: minute, hour, day-of-month, month,
//! day-of-week. Each field accepts `*`, `*/step`, a list `a,b,c`, a range
//! `a-b`, or a single number. Parsed and validated up front so invalid
//! expressions are rejected at registration time, not at fire time.

use chrono::{DateTime, Datelike, Duration, Local, Timelike};

use crate::error::LullError;

/// Anything that can compute the next fire instant after a given time.
///
/// The scheduling primitive depends on this trait rather than on
/// [`Recurrence`] directly so tests can substitute fixed calendars.
pub trait NextFire {
    fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>>;
}

/// One parsed cron field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Any,
    Step(u32),
    Values(Vec<u32>),
}

impl Field {
    fn matches(&self, value: u32, min: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Step(step) => (value - min) % step == 0,
            Field::Values(values) => values.contains(&value),
        }
    }

    fn is_any(&self) -> bool {
        matches!(self, Field::Any)
    }
}

/// A parsed recurrence expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

/// Upper bound on the next-fire search, in minutes (a bit over a year,
/// enough to cross any Feb 29 / month-day combination that can ever fire).
const MAX_SEARCH_MINUTES: i64 = 366 * 24 * 60;

impl Recurrence {
    /// Parse a five-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, LullError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(LullError::Schedule(format!(
                "expected 5 cron fields, got {} in '{expr}'",
                fields.len()
            )));
        }

        Ok(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_field(fields[4], 0, 7).map(normalize_dow)?,
        })
    }

    /// Whether the expression matches the given instant (minute precision).
    pub fn matches(&self, t: DateTime<Local>) -> bool {
        if !self.minute.matches(t.minute(), 0)
            || !self.hour.matches(t.hour(), 0)
            || !self.month.matches(t.month(), 1)
        {
            return false;
        }

        let dom_ok = self.day_of_month.matches(t.day(), 1);
        let dow_ok = self
            .day_of_week
            .matches(t.weekday().num_days_from_sunday(), 0);

        // Standard cron: when both day fields are restricted, either may match.
        if !self.day_of_month.is_any() && !self.day_of_week.is_any() {
            dom_ok || dow_ok
        } else {
            dom_ok && dow_ok
        }
    }
}

impl NextFire for Recurrence {
    /// Next matching instant strictly after `after`, scanning at minute
    /// granularity. Returns `None` only for expressions that can never
    /// fire within a year (e.g. Feb 30).
    fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        let mut t = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after)
            + Duration::minutes(1);

        for _ in 0..MAX_SEARCH_MINUTES {
            if self.matches(t) {
                return Some(t);
            }
            t += Duration::minutes(1);
        }
        None
    }
}

/// Parse one cron field with inclusive bounds.
fn parse_field(s: &str, min: u32, max: u32) -> Result<Field, LullError> {
    if s == "*" {
        return Ok(Field::Any);
    }

    if let Some(step) = s.strip_prefix("*/") {
        let step: u32 = step
            .parse()
            .map_err(|_| LullError::Schedule(format!("invalid step '{s}'")))?;
        if step == 0 || step > max {
            return Err(LullError::Schedule(format!("step out of range in '{s}'")));
        }
        return Ok(Field::Step(step));
    }

    let mut values = Vec::new();
    for part in s.split(',') {
        if let Some((lo, hi)) = part.split_once('-') {
            let lo = parse_value(lo, min, max)?;
            let hi = parse_value(hi, min, max)?;
            if lo > hi {
                return Err(LullError::Schedule(format!("inverted range '{part}'")));
            }
            values.extend(lo..=hi);
        } else {
            values.push(parse_value(part, min, max)?);
        }
    }
    Ok(Field::Values(values))
}

fn parse_value(s: &str, min: u32, max: u32) -> Result<u32, LullError> {
    let v: u32 = s
        .parse()
        .map_err(|_| LullError::Schedule(format!("invalid cron value '{s}'")))?;
    if v < min || v > max {
        return Err(LullError::Schedule(format!(
            "cron value {v} out of range {min}-{max}"
        )));
    }
    Ok(v)
}

/// Fold day-of-week 7 into 0 (both mean Sunday).
fn normalize_dow(field: Field) -> Field {
    match field {
        Field::Values(vs) => Field::Values(vs.into_iter().map(|v| v % 7).collect()),
        other => other,
    }
}
