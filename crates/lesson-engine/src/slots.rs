//! Candidate lesson slots for one instructor-local day.
//!
//! Candidates are laid out on the working-hours grid in the instructor's zone,
//! converted to absolute instants, and then filtered: a lesson must end within
//! working hours (local wall clock), must start after `now`, and must not
//! collide with a busy interval once the buffer is appended.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::busy;
use crate::config::EngineConfig;
use crate::model::{Slot, TimeInterval};
use crate::timezone::resolve_local;

/// Generate the open slots for `day` (a calendar day in the instructor's zone).
///
/// `busy` should cover the day plus a margin of one lesson and buffer on each
/// side so that lessons straddling midnight are seen. The output is sorted
/// chronologically and is a pure function of the inputs.
pub fn generate_slots(
    day: NaiveDate,
    config: &EngineConfig,
    busy_intervals: &[TimeInterval],
    now: DateTime<Utc>,
) -> Vec<Slot> {
    let tz = config.instructor_timezone;
    let policy = &config.policy;
    let duration = policy.lesson_duration();
    let occupied = duration + policy.buffer();

    let Some(midnight) = day.and_hms_opt(0, 0, 0) else {
        return Vec::new();
    };
    let working_end = midnight + Duration::hours(config.working_hours.end_hour as i64);

    let mut slots: Vec<Slot> = Vec::new();
    for local_start in candidate_starts(midnight, config) {
        let Some(start) = resolve_local(local_start, tz, config.dst_policy) else {
            continue;
        };
        // Shifted gap candidates can collapse onto an earlier one.
        if slots.last().is_some_and(|last| last.start >= start) {
            continue;
        }

        let end = start + duration;
        if end.with_timezone(&tz).naive_local() > working_end {
            continue;
        }
        if start <= now {
            continue;
        }
        if busy::first_blocking(start, occupied, busy_intervals).is_some() {
            continue;
        }

        slots.push(Slot { start, end });
    }

    slots
}

/// Local wall-clock candidate starts from `start_hour` up to (not including) `end_hour`.
fn candidate_starts(
    midnight: NaiveDateTime,
    config: &EngineConfig,
) -> impl Iterator<Item = NaiveDateTime> {
    let step = config.policy.slot_interval_minutes.max(1) as usize;
    let first = config.working_hours.start_hour * 60;
    let last = config.working_hours.end_hour * 60;
    (first..last)
        .step_by(step)
        .map(move |minute| midnight + Duration::minutes(minute as i64))
}
