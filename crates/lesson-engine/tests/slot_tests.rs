//! Tests for candidate slot generation.
//!
//! The default config is the instructor in Asia/Tokyo (UTC+9, no DST), working
//! 09:00-21:00, 50-minute lessons with a 10-minute buffer on an hourly grid.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use lesson_engine::config::{EngineConfig, LessonPolicy, WorkingHours};
use lesson_engine::dst::DstPolicy;
use lesson_engine::model::TimeInterval;
use lesson_engine::slots::generate_slots;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// An interval given in Tokyo wall-clock time on 2024-01-05.
fn tokyo_busy(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeInterval {
    let tz = chrono_tz::Asia::Tokyo;
    TimeInterval::new(
        tz.with_ymd_and_hms(2024, 1, 5, start_h, start_m, 0)
            .unwrap()
            .with_timezone(&Utc),
        tz.with_ymd_and_hms(2024, 1, 5, end_h, end_m, 0)
            .unwrap()
            .with_timezone(&Utc),
    )
    .unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

fn early_now() -> DateTime<Utc> {
    utc(2024, 1, 1, 0, 0)
}

fn tokyo_hours(slots: &[lesson_engine::Slot]) -> Vec<String> {
    slots
        .iter()
        .map(|s| {
            s.start
                .with_timezone(&chrono_tz::Asia::Tokyo)
                .format("%H:%M")
                .to_string()
        })
        .collect()
}

#[test]
fn empty_calendar_yields_full_hourly_grid() {
    let config = EngineConfig::default();
    let slots = generate_slots(day(), &config, &[], early_now());

    assert_eq!(slots.len(), 12, "09:00 through 20:00");
    assert_eq!(slots[0].start, utc(2024, 1, 5, 0, 0));
    assert_eq!(slots[0].end, utc(2024, 1, 5, 0, 50));
    assert_eq!(slots[11].start, utc(2024, 1, 5, 11, 0));
}

#[test]
fn busy_hour_removes_only_that_slot() {
    let config = EngineConfig::default();
    let busy = [tokyo_busy(10, 0, 11, 0)];
    let slots = generate_slots(day(), &config, &busy, early_now());

    assert_eq!(slots.len(), 11);
    let hours = tokyo_hours(&slots);
    assert!(hours.contains(&"09:00".to_string()), "touching end is not a conflict");
    assert!(!hours.contains(&"10:00".to_string()));
    assert!(hours.contains(&"11:00".to_string()), "touching start is not a conflict");
}

#[test]
fn buffer_after_lesson_must_be_free() {
    // Lesson 10:00-10:50 is free, but its buffer 10:50-11:00 hits the busy block.
    let config = EngineConfig::default();
    let busy = [tokyo_busy(10, 55, 11, 0)];
    let hours = tokyo_hours(&generate_slots(day(), &config, &busy, early_now()));

    assert!(!hours.contains(&"10:00".to_string()));
    assert!(hours.contains(&"11:00".to_string()));
}

#[test]
fn zero_buffer_lets_lesson_end_right_before_busy() {
    let config = EngineConfig {
        policy: LessonPolicy {
            buffer_minutes: 0,
            ..LessonPolicy::default()
        },
        ..EngineConfig::default()
    };
    let busy = [tokyo_busy(10, 55, 11, 0)];
    let hours = tokyo_hours(&generate_slots(day(), &config, &busy, early_now()));
    assert!(hours.contains(&"10:00".to_string()));
}

#[test]
fn busy_block_from_previous_evening_blocks_first_slot() {
    let config = EngineConfig::default();
    let tz = chrono_tz::Asia::Tokyo;
    let overnight = TimeInterval::new(
        tz.with_ymd_and_hms(2024, 1, 4, 23, 0, 0).unwrap().with_timezone(&Utc),
        tz.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap().with_timezone(&Utc),
    )
    .unwrap();

    let hours = tokyo_hours(&generate_slots(day(), &config, &[overnight], early_now()));
    assert_eq!(hours.first().map(String::as_str), Some("10:00"));
}

#[test]
fn past_and_current_slots_are_dropped() {
    let config = EngineConfig::default();
    // now = 12:00 Tokyo; the 12:00 slot starts exactly now and is dropped.
    let now = utc(2024, 1, 5, 3, 0);
    let hours = tokyo_hours(&generate_slots(day(), &config, &[], now));

    assert_eq!(hours.len(), 8);
    assert_eq!(hours[0], "13:00");
}

#[test]
fn lesson_must_end_within_working_hours() {
    let config = EngineConfig {
        policy: LessonPolicy {
            slot_interval_minutes: 30,
            ..LessonPolicy::default()
        },
        ..EngineConfig::default()
    };
    let hours = tokyo_hours(&generate_slots(day(), &config, &[], early_now()));

    assert_eq!(hours.len(), 23, "09:00 through 20:00 every 30 minutes");
    assert_eq!(hours.last().map(String::as_str), Some("20:00"));
    assert!(!hours.contains(&"20:30".to_string()), "20:30 would end at 21:20");
}

#[test]
fn working_day_may_end_at_midnight() {
    let config = EngineConfig {
        working_hours: WorkingHours {
            start_hour: 22,
            end_hour: 24,
        },
        ..EngineConfig::default()
    };
    let hours = tokyo_hours(&generate_slots(day(), &config, &[], early_now()));
    assert_eq!(hours, vec!["22:00".to_string(), "23:00".to_string()]);
}

#[test]
fn lesson_longer_than_window_yields_nothing() {
    let config = EngineConfig {
        working_hours: WorkingHours {
            start_hour: 9,
            end_hour: 10,
        },
        policy: LessonPolicy {
            lesson_duration_minutes: 90,
            ..LessonPolicy::default()
        },
        ..EngineConfig::default()
    };
    assert!(generate_slots(day(), &config, &[], early_now()).is_empty());
}

#[test]
fn identical_inputs_give_identical_output() {
    let config = EngineConfig::default();
    let busy = [tokyo_busy(13, 0, 15, 30)];
    let a = generate_slots(day(), &config, &busy, early_now());
    let b = generate_slots(day(), &config, &busy, early_now());
    assert_eq!(a, b);
}

// ── DST ─────────────────────────────────────────────────────────────────────

fn new_york_night(dst_policy: DstPolicy) -> EngineConfig {
    EngineConfig {
        instructor_timezone: chrono_tz::America::New_York,
        working_hours: WorkingHours {
            start_hour: 0,
            end_hour: 5,
        },
        policy: LessonPolicy {
            slot_interval_minutes: 120,
            ..LessonPolicy::default()
        },
        dst_policy,
        ..EngineConfig::default()
    }
}

#[test]
fn gap_candidate_is_skipped_by_default() {
    // Candidates 00:00, 02:00 (does not exist on 2024-03-10), 04:00.
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let slots = generate_slots(day, &new_york_night(DstPolicy::Skip), &[], early_now());

    let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![utc(2024, 3, 10, 5, 0), utc(2024, 3, 10, 8, 0)]);
}

#[test]
fn gap_candidate_shifts_to_transition_when_requested() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let slots = generate_slots(day, &new_york_night(DstPolicy::ShiftForward), &[], early_now());

    let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
    assert_eq!(
        starts,
        vec![
            utc(2024, 3, 10, 5, 0),
            utc(2024, 3, 10, 7, 0),
            utc(2024, 3, 10, 8, 0)
        ]
    );
}
