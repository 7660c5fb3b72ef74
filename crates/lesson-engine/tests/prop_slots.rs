//! Property-based tests for slot generation using proptest.
//!
//! These check invariants that should hold for any busy calendar, working
//! window and "now", not just the fixed scenarios in `slot_tests.rs`.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use lesson_engine::config::{EngineConfig, LessonPolicy, WorkingHours};
use lesson_engine::model::TimeInterval;
use lesson_engine::slots::generate_slots;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_timezone() -> impl Strategy<Value = Tz> {
    prop_oneof![
        Just(chrono_tz::Asia::Tokyo),
        Just(chrono_tz::Asia::Taipei),
        Just(chrono_tz::UTC),
        Just(chrono_tz::Europe::Berlin),
        Just(chrono_tz::America::New_York),
    ]
}

/// A working window of at least one hour within the day.
fn arb_hours() -> impl Strategy<Value = WorkingHours> {
    (0u32..=20, 1u32..=8).prop_map(|(start, len)| WorkingHours {
        start_hour: start,
        end_hour: (start + len).min(24),
    })
}

fn arb_policy() -> impl Strategy<Value = LessonPolicy> {
    (
        prop_oneof![Just(25u32), Just(30), Just(45), Just(50), Just(60)],
        prop_oneof![Just(0u32), Just(5), Just(10), Just(15)],
        prop_oneof![Just(15u32), Just(30), Just(60)],
    )
        .prop_map(|(duration, buffer, interval)| LessonPolicy {
            lesson_duration_minutes: duration,
            buffer_minutes: buffer,
            slot_interval_minutes: interval,
            ..LessonPolicy::default()
        })
}

/// Busy intervals somewhere between 12h before and 36h after the day's UTC midnight.
fn arb_busy() -> impl Strategy<Value = Vec<TimeInterval>> {
    prop::collection::vec((-720i64..2160, 5i64..240), 0..8).prop_map(|specs| {
        specs
            .into_iter()
            .filter_map(|(offset, len)| {
                let start = base() + Duration::minutes(offset);
                TimeInterval::new(start, start + Duration::minutes(len))
            })
            .collect()
    })
}

/// "now" between two days before and one day after the day's UTC midnight.
fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
    (-2880i64..1440).prop_map(|offset| base() + Duration::minutes(offset))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap()
}

fn config(tz: Tz, working_hours: WorkingHours, policy: LessonPolicy) -> EngineConfig {
    EngineConfig {
        instructor_timezone: tz,
        working_hours,
        policy,
        ..EngineConfig::default()
    }
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: Slots are strictly increasing and all in the future
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn slots_are_sorted_and_after_now(
        tz in arb_timezone(),
        hours in arb_hours(),
        policy in arb_policy(),
        busy in arb_busy(),
        now in arb_now(),
    ) {
        let slots = generate_slots(day(), &config(tz, hours, policy), &busy, now);

        for pair in slots.windows(2) {
            prop_assert!(pair[0].start < pair[1].start, "not sorted: {:?}", pair);
        }
        for slot in &slots {
            prop_assert!(slot.start > now);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: Every slot sits inside the local working window
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn slots_stay_within_working_hours(
        tz in arb_timezone(),
        hours in arb_hours(),
        policy in arb_policy(),
    ) {
        let duration = policy.lesson_duration_minutes as i64;
        let slots = generate_slots(day(), &config(tz, hours, policy), &[], base() - Duration::days(2));
        let midnight = day().and_hms_opt(0, 0, 0).unwrap();
        let window_end = midnight + Duration::hours(hours.end_hour as i64);

        for slot in &slots {
            prop_assert_eq!((slot.end - slot.start).num_minutes(), duration);

            let local_start = slot.start.with_timezone(&tz).naive_local();
            let local_end = slot.end.with_timezone(&tz).naive_local();
            prop_assert_eq!(local_start.date(), day());
            prop_assert!(local_start.hour() >= hours.start_hour);
            prop_assert!(local_end <= window_end);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: No slot plus buffer overlaps busy time
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn slots_never_collide_with_busy_time(
        tz in arb_timezone(),
        hours in arb_hours(),
        policy in arb_policy(),
        busy in arb_busy(),
        now in arb_now(),
    ) {
        let buffer = Duration::minutes(policy.buffer_minutes as i64);
        let slots = generate_slots(day(), &config(tz, hours, policy), &busy, now);

        for slot in &slots {
            let occupied = TimeInterval::new(slot.start, slot.end + buffer).unwrap();
            for b in &busy {
                prop_assert!(
                    !occupied.overlaps(b),
                    "slot {:?} collides with busy {:?}",
                    slot,
                    b
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: Adding busy time never adds slots
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn more_busy_time_never_adds_slots(
        tz in arb_timezone(),
        hours in arb_hours(),
        policy in arb_policy(),
        busy in arb_busy(),
        extra in arb_busy(),
        now in arb_now(),
    ) {
        let config = config(tz, hours, policy);
        let fewer = generate_slots(day(), &config, &busy, now);

        let mut all = busy.clone();
        all.extend(extra);
        let more = generate_slots(day(), &config, &all, now);

        prop_assert!(more.len() <= fewer.len());
        for slot in &more {
            prop_assert!(fewer.contains(slot));
        }
    }
}

// ---------------------------------------------------------------------------
// Property 5: On a grid at least as wide as lesson plus buffer, padded slots
// never overlap each other
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn padded_slots_are_disjoint_on_wide_grid(
        tz in arb_timezone(),
        hours in arb_hours(),
        policy in arb_policy(),
        busy in arb_busy(),
    ) {
        prop_assume!(
            policy.slot_interval_minutes >= policy.lesson_duration_minutes + policy.buffer_minutes
        );
        let buffer = Duration::minutes(policy.buffer_minutes as i64);
        let slots = generate_slots(day(), &config(tz, hours, policy), &busy, base() - Duration::days(2));

        for pair in slots.windows(2) {
            prop_assert!(pair[0].end + buffer <= pair[1].start, "{:?}", pair);
        }
    }
}
