//! Tests for building an EngineConfig from defaults, JSON and environment lookups.

use std::collections::HashMap;

use lesson_engine::config::{EngineConfig, LessonPolicy, WorkingHours};
use lesson_engine::dst::DstPolicy;
use lesson_engine::error::ConfigError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_describe_tokyo_instructor() {
    let config = EngineConfig::default();
    assert_eq!(config.instructor_timezone, chrono_tz::Asia::Tokyo);
    assert_eq!(config.default_student_timezone, chrono_tz::Asia::Taipei);
    assert_eq!(config.working_hours, WorkingHours { start_hour: 9, end_hour: 21 });
    assert_eq!(config.policy, LessonPolicy::default());
    assert_eq!(config.policy.lesson_duration_minutes, 50);
    assert_eq!(config.policy.buffer_minutes, 10);
    assert_eq!(config.booking_id_prefix, "MZK");
    assert_eq!(config.dst_policy, DstPolicy::Skip);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_json_yields_defaults() {
    assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
}

#[test]
fn partial_json_overrides_only_given_fields() {
    let config = EngineConfig::from_json_str(
        r#"{
            "instructor_timezone": "Europe/Berlin",
            "policy": {"lesson_duration_minutes": 25, "slot_interval_minutes": 30},
            "dst_policy": "shift_forward"
        }"#,
    )
    .unwrap();

    assert_eq!(config.instructor_timezone, chrono_tz::Europe::Berlin);
    assert_eq!(config.policy.lesson_duration_minutes, 25);
    assert_eq!(config.policy.slot_interval_minutes, 30);
    assert_eq!(config.policy.buffer_minutes, 10, "unset policy fields keep defaults");
    assert_eq!(config.working_hours, WorkingHours::default());
    assert_eq!(config.dst_policy, DstPolicy::ShiftForward);
}

#[test]
fn unknown_timezone_is_rejected() {
    let err = EngineConfig::from_json_str(r#"{"instructor_timezone": "Mars/Olympus"}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimezone(name) if name == "Mars/Olympus"));
}

#[test]
fn inverted_working_hours_are_rejected() {
    let err = EngineConfig::from_json_str(r#"{"working_hours": {"start_hour": 18, "end_hour": 9}}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidWorkingHours { start: 18, end: 9 }));
}

#[test]
fn working_hours_past_midnight_are_rejected() {
    let config = EngineConfig {
        working_hours: WorkingHours { start_hour: 20, end_hour: 25 },
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidWorkingHours { .. })
    ));
}

#[test]
fn zero_length_lessons_are_rejected() {
    let err = EngineConfig::from_json_str(r#"{"policy": {"lesson_duration_minutes": 0}}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPolicy(_)));
}

#[test]
fn lowercase_prefix_is_rejected() {
    let err = EngineConfig::from_json_str(r#"{"booking_id_prefix": "mzk"}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPolicy(_)));
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = EngineConfig::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn missing_config_file_is_io_error() {
    let err = EngineConfig::from_file("/nonexistent/lessons-config.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn pretty_json_round_trips() {
    let config = EngineConfig {
        instructor_timezone: chrono_tz::America::New_York,
        booking_id_prefix: "NYC1".to_string(),
        dst_policy: DstPolicy::ShiftForward,
        ..EngineConfig::default()
    };
    let json = config.to_json_pretty().unwrap();
    assert!(json.contains("\"America/New_York\""));
    assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
}

// ── Environment ─────────────────────────────────────────────────────────────

#[test]
fn no_variables_yields_defaults() {
    let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn variables_override_defaults() {
    let config = EngineConfig::from_lookup(lookup(&[
        ("LESSONS_INSTRUCTOR_TIMEZONE", "America/Los_Angeles"),
        ("LESSONS_STUDENT_TIMEZONE", "Europe/London"),
        ("LESSONS_BOOKING_ID_PREFIX", "LAX"),
        ("LESSONS_WORK_START_HOUR", "7"),
        ("LESSONS_WORK_END_HOUR", "15"),
        ("LESSONS_LESSON_MINUTES", " 45 "),
        ("LESSONS_MAX_MODIFICATIONS", "5"),
    ]))
    .unwrap();

    assert_eq!(config.instructor_timezone, chrono_tz::America::Los_Angeles);
    assert_eq!(config.default_student_timezone, chrono_tz::Europe::London);
    assert_eq!(config.booking_id_prefix, "LAX");
    assert_eq!(config.working_hours, WorkingHours { start_hour: 7, end_hour: 15 });
    assert_eq!(config.policy.lesson_duration_minutes, 45);
    assert_eq!(config.policy.max_modifications, 5);
    assert_eq!(config.policy.buffer_minutes, 10);
}

#[test]
fn non_numeric_variable_names_the_key() {
    let err = EngineConfig::from_lookup(lookup(&[("LESSONS_BUFFER_MINUTES", "ten")])).unwrap_err();
    match err {
        ConfigError::InvalidEnv { key, value } => {
            assert_eq!(key, "LESSONS_BUFFER_MINUTES");
            assert_eq!(value, "ten");
        }
        other => panic!("expected InvalidEnv, got {other:?}"),
    }
}

#[test]
fn variables_are_validated_together() {
    let err = EngineConfig::from_lookup(lookup(&[("LESSONS_WORK_START_HOUR", "22")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidWorkingHours { start: 22, end: 21 }));
}
