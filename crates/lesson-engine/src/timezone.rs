//! Conversions between absolute instants and wall-clock time in a named zone.
//!
//! Slot arithmetic is done in the instructor's zone and turned into absolute
//! [`DateTime<Utc>`] values straight away; every comparison against "now" or
//! against another slot happens on those absolute values.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::dst::DstPolicy;
use crate::error::TimeError;

/// Time-of-day format used for slot labels.
pub const TIME_FORMAT: &str = "%H:%M";
/// Date + weekday + time format used for booking views.
pub const LONG_FORMAT: &str = "%Y/%m/%d (%a) %H:%M";
/// Default wall-clock input format.
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Longest DST gap we step over when shifting forward.
const MAX_GAP_MINUTES: i64 = 180;

/// Parse an IANA timezone identifier such as `Asia/Tokyo`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim()
        .parse()
        .map_err(|_| TimeError::InvalidTimezone(name.to_string()))
}

/// Format `instant` as wall-clock time in `tz` using a chrono format string.
pub fn format_in_zone(instant: DateTime<Utc>, tz: Tz, fmt: &str) -> String {
    instant.with_timezone(&tz).format(fmt).to_string()
}

/// Format a start–end pair as `HH:MM - HH:MM`, optionally prefixed by the date.
pub fn format_time_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz, long: bool) -> String {
    let head = if long { LONG_FORMAT } else { TIME_FORMAT };
    format!(
        "{} - {}",
        format_in_zone(start, tz, head),
        format_in_zone(end, tz, TIME_FORMAT)
    )
}

/// Parse a wall-clock string in `tz` into an absolute instant.
///
/// Ambiguous local times resolve to the earlier instant; local times inside a
/// DST gap are rejected.
pub fn parse_in_zone(input: &str, tz: Tz, fmt: &str) -> Result<DateTime<Utc>, TimeError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), fmt)
        .map_err(|e| TimeError::InvalidDateFormat(format!("'{input}': {e}")))?;
    resolve_local(naive, tz, DstPolicy::Skip).ok_or_else(|| {
        TimeError::InvalidDateFormat(format!("'{input}' does not exist in {}", tz.name()))
    })
}

/// Parse an RFC 3339 timestamp (e.g. `2024-01-05T10:00:00Z`).
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, TimeError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimeError::InvalidDateFormat(format!("'{input}': {e}")))
}

/// Parse a calendar day in `YYYY-MM-DD` form.
pub fn parse_day(input: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| TimeError::InvalidDateFormat(format!("'{input}': {e}")))
}

/// Resolve a local wall-clock time in `tz` to an absolute instant.
///
/// Returns `None` for a gap time under [`DstPolicy::Skip`].
pub fn resolve_local(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES).find_map(|m| {
                tz.from_local_datetime(&(naive + Duration::minutes(m)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
        },
    }
}

/// The half-open `[start, end)` span of a local calendar day in `tz`, as UTC.
///
/// Handles zones whose midnight falls in a DST gap by shifting forward.
pub fn day_bounds(day: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeError> {
    let next = day
        .succ_opt()
        .ok_or_else(|| TimeError::InvalidDateFormat(format!("{day} has no following day")))?;
    let start = midnight(day, tz)?;
    let end = midnight(next, tz)?;
    Ok((start, end))
}

fn midnight(day: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, TimeError> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| TimeError::InvalidDateFormat(day.to_string()))?;
    resolve_local(naive, tz, DstPolicy::ShiftForward)
        .ok_or_else(|| TimeError::InvalidDateFormat(format!("no midnight on {day} in {}", tz.name())))
}

/// The local calendar day `instant` falls on in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
