//! Check-in periods and deadline arithmetic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{
    SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_MONTH, SECONDS_PER_WEEK,
};

/// Unit of a check-in period. Months are 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl PeriodUnit {
    pub fn seconds(self) -> i64 {
        match self {
            PeriodUnit::Minutes => SECONDS_PER_MINUTE,
            PeriodUnit::Hours => SECONDS_PER_HOUR,
            PeriodUnit::Days => SECONDS_PER_DAY,
            PeriodUnit::Weeks => SECONDS_PER_WEEK,
            PeriodUnit::Months => SECONDS_PER_MONTH,
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeriodUnit::Minutes => "minutes",
            PeriodUnit::Hours => "hours",
            PeriodUnit::Days => "days",
            PeriodUnit::Weeks => "weeks",
            PeriodUnit::Months => "months",
        };
        f.write_str(s)
    }
}

impl FromStr for PeriodUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" | "min" | "m" => Ok(PeriodUnit::Minutes),
            "hour" | "hours" | "h" => Ok(PeriodUnit::Hours),
            "day" | "days" | "d" => Ok(PeriodUnit::Days),
            "week" | "weeks" | "w" => Ok(PeriodUnit::Weeks),
            "month" | "months" | "mo" => Ok(PeriodUnit::Months),
            other => Err(format!("unknown period unit: {other}")),
        }
    }
}

/// How often the owner must check in: `count` × `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckInPeriod {
    pub count: u32,
    pub unit: PeriodUnit,
}

impl CheckInPeriod {
    pub const fn new(count: u32, unit: PeriodUnit) -> Self {
        Self { count, unit }
    }

    pub fn as_secs(&self) -> i64 {
        i64::from(self.count) * self.unit.seconds()
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.as_secs())
    }
}

impl fmt::Display for CheckInPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

/// Remaining time until a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    /// Whole seconds left, never negative.
    pub seconds_remaining: u64,
    pub is_past: bool,
    pub human_readable: String,
}

/// The deadline `period` from `now`.
pub fn deadline_from(period: CheckInPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    now + period.as_duration()
}

/// `now >= deadline`.
pub fn is_past(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

pub fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
    let secs = (deadline - now).num_seconds().max(0) as u64;
    TimeRemaining {
        seconds_remaining: secs,
        is_past: is_past(deadline, now),
        human_readable: humanize(secs),
    }
}

/// Formats a second count as the two most significant units, e.g.
/// `"2d 3h"`, `"3h 15m"`, `"4m 10s"`. Zero renders as `"expired"`.
pub fn humanize(total_secs: u64) -> String {
    if total_secs == 0 {
        return "expired".to_string();
    }

    let units: [(u64, &str); 4] = [
        (SECONDS_PER_DAY as u64, "d"),
        (SECONDS_PER_HOUR as u64, "h"),
        (SECONDS_PER_MINUTE as u64, "m"),
        (1, "s"),
    ];

    let mut rest = total_secs;
    let mut parts = Vec::with_capacity(2);
    for (size, suffix) in units {
        let n = rest / size;
        rest %= size;
        if n > 0 || !parts.is_empty() {
            parts.push(format!("{n}{suffix}"));
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}
