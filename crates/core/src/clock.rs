//! Clock source. Every "what time is it" question goes through here.
//!
//! A [`ClockSource`] is built once per process invocation and passed to the
//! components that need the current time. Under simulation it returns the same
//! instant on every call, so scheduled runs are reproducible.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use serde::Serialize;

/// The zone all user-facing times are reported in.
pub const EASTERN: Tz = New_York;

/// Where "now" comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockSource {
    /// Real wall-clock time.
    #[default]
    System,
    /// A fixed operator-supplied instant that never advances.
    Fixed(DateTime<Utc>),
}

impl ClockSource {
    /// Fix the clock at a given instant.
    pub fn fixed<Z: TimeZone>(instant: DateTime<Z>) -> Self {
        ClockSource::Fixed(instant.with_timezone(&Utc))
    }

    /// Parse an operator-supplied Eastern-time string and fix the clock there.
    pub fn simulated(input: &str) -> Result<Self, SimulatedTimeError> {
        parse_simulated_time(input).map(Self::fixed)
    }

    /// The current time in US Eastern (EST/EDT chosen by date).
    pub fn now(&self) -> DateTime<Tz> {
        match self {
            ClockSource::System => Utc::now().with_timezone(&EASTERN),
            ClockSource::Fixed(instant) => instant.with_timezone(&EASTERN),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, ClockSource::Fixed(_))
    }

    /// Whether the current Eastern hour falls in `[start_hour, end_hour)`.
    pub fn within_hours(&self, start_hour: u32, end_hour: u32) -> bool {
        let hour = self.now().hour();
        hour >= start_hour && hour < end_hour
    }

    /// A structured snapshot of "now" for tools.
    pub fn snapshot(&self) -> TimeSnapshot {
        let now = self.now();
        TimeSnapshot {
            display: format_eastern(&now),
            iso: now.to_rfc3339(),
            timezone: now.format("%Z").to_string(),
            simulated: self.is_simulated(),
        }
    }
}

/// The current time as reported to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSnapshot {
    /// e.g. `Monday, January 15, 2024 2:30 PM EST`
    pub display: String,
    /// RFC 3339 with the Eastern offset, e.g. `2024-01-15T14:30:00-05:00`
    pub iso: String,
    /// `EST` or `EDT`
    pub timezone: String,
    pub simulated: bool,
}

/// Human-readable Eastern rendering, e.g. `Monday, January 15, 2024 2:30 PM EST`.
pub fn format_eastern(t: &DateTime<Tz>) -> String {
    t.format("%A, %B %-d, %Y %-I:%M %p %Z").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatedTimeError {
    #[error("invalid simulated time '{0}': expected \"YYYY-MM-DD,HH:MM\" or \"YYYY-MM-DD\"")]
    Format(String),

    #[error("simulated time '{0}' does not exist in Eastern time (DST gap)")]
    Nonexistent(String),
}

/// Parse `YYYY-MM-DD,HH:MM` (a space also works as the separator) or a bare
/// `YYYY-MM-DD` meaning midnight, interpreted in US Eastern time.
///
/// Ambiguous wall-clock times in the fall-back hour resolve to the earlier
/// (daylight) instant.
pub fn parse_simulated_time(input: &str) -> Result<DateTime<Tz>, SimulatedTimeError> {
    let trimmed = input.trim();
    let format_err = || SimulatedTimeError::Format(input.to_string());

    let naive = match trimmed.split_once([',', ' ']) {
        Some((date, time)) => {
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| format_err())?;
            let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
                .map_err(|_| format_err())?;
            NaiveDateTime::new(date, time)
        }
        None => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|_| format_err())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(format_err)?,
    };

    EASTERN
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| SimulatedTimeError::Nonexistent(input.to_string()))
}
