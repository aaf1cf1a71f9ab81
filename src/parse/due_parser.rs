use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::task::Due;

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for due-date resolution
#[derive(Debug, thiserror::Error)]
pub enum DueError {
    #[error("malformed due date: {0:?}")]
    Malformed(String),
    #[error("unknown time zone: {0:?}")]
    UnknownTimezone(String),
}

/// Parse an IANA zone name
pub fn parse_timezone(name: &str) -> Result<Tz, DueError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DueError::UnknownTimezone(name.to_string()))
}

/// Resolve a due descriptor to an instant.
///
/// Floating dates are localised in the descriptor's own zone when it has one,
/// otherwise in `default_tz`. Date-only values mean midnight. Returns None
/// when the descriptor carries no date.
pub fn resolve_due(due: &Due, default_tz: Tz) -> Result<Option<DateTime<Tz>>, DueError> {
    let Some(date) = due.date.as_deref() else {
        return Ok(None);
    };
    let tz = match due.timezone.as_deref() {
        Some(name) => parse_timezone(name)?,
        None => default_tz,
    };
    let date = date.trim();
    let (naive, shape) = parse_date(date)?;
    if shape == DateShape::Utc {
        return Ok(Some(Utc.from_utc_datetime(&naive).with_timezone(&tz)));
    }
    localize(tz, naive)
        .map(Some)
        .ok_or_else(|| DueError::Malformed(date.to_string()))
}

/// Which of the accepted date formats a value was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateShape {
    DateOnly,
    Floating,
    Utc,
}

fn parse_date(date: &str) -> Result<(NaiveDateTime, DateShape), DueError> {
    if let Some(utc) = date.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT)
            .map_err(|_| DueError::Malformed(date.to_string()))?;
        return Ok((naive, DateShape::Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(date, DATE_TIME_FORMAT) {
        return Ok((dt, DateShape::Floating));
    }
    let naive = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| DueError::Malformed(date.to_string()))?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DueError::Malformed(date.to_string()))?;
    Ok((naive, DateShape::DateOnly))
}

/// Distance between two occurrences of a recurring expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Days(u64),
    Months(u32),
}

/// Read the step out of expressions like "every day", "every 2 weeks",
/// "every other month", "every monday" or "yearly". Anything unrecognised
/// repeats daily.
fn recurrence_step(expr: &str) -> Step {
    let lower = expr.to_ascii_lowercase();
    let mut count: u32 = 1;
    for word in lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if let Ok(n) = word.parse::<u32>() {
            count = n.max(1);
            continue;
        }
        let step = match word {
            "other" => {
                count = 2;
                continue;
            }
            "mon" | "monday" | "tue" | "tuesday" | "wed" | "wednesday" | "thu" | "thursday"
            | "fri" | "friday" | "sat" | "saturday" | "sun" | "sunday" | "week" | "weeks"
            | "weekly" => Step::Days(7 * u64::from(count)),
            "month" | "months" | "monthly" => Step::Months(count),
            "year" | "years" | "yearly" | "annually" => Step::Months(12 * count),
            "day" | "days" | "daily" => Step::Days(u64::from(count)),
            _ => continue,
        };
        return step;
    }
    Step::Days(1)
}

/// Advance a recurring descriptor to its first occurrence after `after`,
/// keeping the format its date was written in. Dates are compared as wall
/// time against `after` in UTC. Returns None when there is no date to move.
pub fn next_occurrence(due: &Due, after: NaiveDateTime) -> Result<Option<Due>, DueError> {
    let Some(date) = due.date.as_deref() else {
        return Ok(None);
    };
    let date = date.trim();
    let (mut next, shape) = parse_date(date)?;
    let step = recurrence_step(due.string.as_deref().unwrap_or_default());
    while next <= after {
        next = match step {
            Step::Days(n) => next.checked_add_days(Days::new(n)),
            Step::Months(n) => next.checked_add_months(Months::new(n)),
        }
        .ok_or_else(|| DueError::Malformed(date.to_string()))?;
    }
    let date = match shape {
        DateShape::DateOnly => next.format(DATE_FORMAT).to_string(),
        DateShape::Floating => next.format(DATE_TIME_FORMAT).to_string(),
        DateShape::Utc => format!("{}Z", next.format(DATE_TIME_FORMAT)),
    };
    Ok(Some(Due {
        date: Some(date),
        ..due.clone()
    }))
}

/// True when the descriptor resolves to an instant at or before `now`
pub fn is_due(due: &Due, default_tz: Tz, now: &DateTime<Tz>) -> Result<bool, DueError> {
    Ok(resolve_due(due, default_tz)?.is_some_and(|at| at <= *now))
}

/// Ambiguous local times take the earlier instant; times inside a DST gap
/// move forward by an hour.
fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest().or_else(|| {
        tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
    })
}
