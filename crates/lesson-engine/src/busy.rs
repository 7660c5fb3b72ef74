//! Busy-interval arithmetic.
//!
//! Busy intervals arrive from the calendar unsorted and possibly overlapping.
//! These helpers clip and merge them, carve a booking's own interval out of
//! them, and run the buffered overlap test used by slot generation and the
//! pre-write re-check.

use chrono::{DateTime, Duration, Utc};

use crate::model::TimeInterval;

/// Merge overlapping or adjacent busy intervals, clipped to `[window_start, window_end)`.
///
/// Returns a sorted, non-overlapping list.
pub fn merge_busy(
    intervals: &[TimeInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<TimeInterval> {
    let mut clipped: Vec<TimeInterval> = intervals
        .iter()
        .filter(|i| i.start < window_end && i.end > window_start)
        .map(|i| TimeInterval {
            start: i.start.max(window_start),
            end: i.end.min(window_end),
        })
        .collect();

    if clipped.is_empty() {
        return Vec::new();
    }

    clipped.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(clipped.len());
    for interval in clipped {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Remove `hole` from every busy interval, splitting where needed.
pub fn subtract(busy: &[TimeInterval], hole: &TimeInterval) -> Vec<TimeInterval> {
    let mut result = Vec::with_capacity(busy.len() + 1);
    for interval in busy {
        if !interval.overlaps(hole) {
            result.push(*interval);
            continue;
        }
        if interval.start < hole.start {
            result.push(TimeInterval {
                start: interval.start,
                end: hole.start,
            });
        }
        if hole.end < interval.end {
            result.push(TimeInterval {
                start: hole.end,
                end: interval.end,
            });
        }
    }
    result
}

/// First busy interval that blocks a lesson starting at `start` and occupying
/// the calendar for `occupied` (lesson plus buffer).
///
/// Blocking means `start < busy.end && start + occupied > busy.start`.
pub fn first_blocking(
    start: DateTime<Utc>,
    occupied: Duration,
    busy: &[TimeInterval],
) -> Option<&TimeInterval> {
    let end = start + occupied;
    busy.iter().find(|b| start < b.end && end > b.start)
}
