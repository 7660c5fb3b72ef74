//! Engine configuration.
//!
//! An [`EngineConfig`] is built once at process start (from defaults, a JSON
//! file, or `LESSONS_*` environment variables) and handed to every component,
//! usually behind an `Arc`. No component reads the environment on its own.

use std::path::Path;

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::ConfigError;

/// The instructor's daily working window, in whole hours of the instructor's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 21,
        }
    }
}

/// Lesson shape and booking rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonPolicy {
    pub lesson_duration_minutes: u32,
    /// Idle time after a lesson before the calendar counts as free again.
    pub buffer_minutes: u32,
    /// Granularity of candidate slot starts.
    pub slot_interval_minutes: u32,
    pub min_advance_booking_hours: u32,
    pub max_advance_booking_days: u32,
    pub cancel_deadline_hours: u32,
    pub modify_deadline_hours: u32,
    pub max_modifications: u32,
}

impl Default for LessonPolicy {
    fn default() -> Self {
        Self {
            lesson_duration_minutes: 50,
            buffer_minutes: 10,
            slot_interval_minutes: 60,
            min_advance_booking_hours: 24,
            max_advance_booking_days: 30,
            cancel_deadline_hours: 24,
            modify_deadline_hours: 24,
            max_modifications: 2,
        }
    }
}

impl LessonPolicy {
    pub fn lesson_duration(&self) -> Duration {
        Duration::minutes(self.lesson_duration_minutes as i64)
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes as i64)
    }

    pub fn slot_interval(&self) -> Duration {
        Duration::minutes(self.slot_interval_minutes as i64)
    }

    pub fn min_advance(&self) -> Duration {
        Duration::hours(self.min_advance_booking_hours as i64)
    }

    pub fn max_advance(&self) -> Duration {
        Duration::days(self.max_advance_booking_days as i64)
    }

    pub fn cancel_deadline(&self) -> Duration {
        Duration::hours(self.cancel_deadline_hours as i64)
    }

    pub fn modify_deadline(&self) -> Duration {
        Duration::hours(self.modify_deadline_hours as i64)
    }
}

/// Immutable engine configuration shared by all services.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub instructor_timezone: Tz,
    /// Zone assumed for students who do not send one.
    pub default_student_timezone: Tz,
    pub working_hours: WorkingHours,
    pub policy: LessonPolicy,
    /// Prefix of generated booking ids (`MZK` in `MZK-20240101-AB12CD`).
    pub booking_id_prefix: String,
    /// How far back from "now" booking lookups search the calendar.
    pub lookup_past_days: u32,
    /// How far ahead from "now" booking lookups search the calendar.
    pub lookup_future_days: u32,
    pub dst_policy: DstPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instructor_timezone: chrono_tz::Asia::Tokyo,
            default_student_timezone: chrono_tz::Asia::Taipei,
            working_hours: WorkingHours::default(),
            policy: LessonPolicy::default(),
            booking_id_prefix: "MZK".to_string(),
            lookup_past_days: 30,
            lookup_future_days: 60,
            dst_policy: DstPolicy::default(),
        }
    }
}

/// On-disk / on-wire shape of [`EngineConfig`]. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub instructor_timezone: Option<String>,
    pub default_student_timezone: Option<String>,
    pub working_hours: Option<WorkingHours>,
    pub policy: Option<LessonPolicy>,
    pub booking_id_prefix: Option<String>,
    pub lookup_past_days: Option<u32>,
    pub lookup_future_days: Option<u32>,
    pub dst_policy: Option<DstPolicy>,
}

fn parse_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}

impl TryFrom<ConfigFile> for EngineConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            instructor_timezone: match file.instructor_timezone {
                Some(name) => parse_zone(&name)?,
                None => defaults.instructor_timezone,
            },
            default_student_timezone: match file.default_student_timezone {
                Some(name) => parse_zone(&name)?,
                None => defaults.default_student_timezone,
            },
            working_hours: file.working_hours.unwrap_or(defaults.working_hours),
            policy: file.policy.unwrap_or(defaults.policy),
            booking_id_prefix: file.booking_id_prefix.unwrap_or(defaults.booking_id_prefix),
            lookup_past_days: file.lookup_past_days.unwrap_or(defaults.lookup_past_days),
            lookup_future_days: file.lookup_future_days.unwrap_or(defaults.lookup_future_days),
            dst_policy: file.dst_policy.unwrap_or(defaults.dst_policy),
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&EngineConfig> for ConfigFile {
    fn from(config: &EngineConfig) -> Self {
        ConfigFile {
            instructor_timezone: Some(config.instructor_timezone.name().to_string()),
            default_student_timezone: Some(config.default_student_timezone.name().to_string()),
            working_hours: Some(config.working_hours),
            policy: Some(config.policy.clone()),
            booking_id_prefix: Some(config.booking_id_prefix.clone()),
            lookup_past_days: Some(config.lookup_past_days),
            lookup_future_days: Some(config.lookup_future_days),
            dst_policy: Some(config.dst_policy),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        file.try_into()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults overlaid with `LESSONS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(name) = lookup("LESSONS_INSTRUCTOR_TIMEZONE") {
            config.instructor_timezone = parse_zone(&name)?;
        }
        if let Some(name) = lookup("LESSONS_STUDENT_TIMEZONE") {
            config.default_student_timezone = parse_zone(&name)?;
        }
        if let Some(prefix) = lookup("LESSONS_BOOKING_ID_PREFIX") {
            config.booking_id_prefix = prefix;
        }

        let number = |key: &str, slot: &mut u32| -> Result<(), ConfigError> {
            if let Some(value) = lookup(key) {
                *slot = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    key: key.to_string(),
                    value,
                })?;
            }
            Ok(())
        };

        number("LESSONS_WORK_START_HOUR", &mut config.working_hours.start_hour)?;
        number("LESSONS_WORK_END_HOUR", &mut config.working_hours.end_hour)?;
        number("LESSONS_LESSON_MINUTES", &mut config.policy.lesson_duration_minutes)?;
        number("LESSONS_BUFFER_MINUTES", &mut config.policy.buffer_minutes)?;
        number("LESSONS_SLOT_INTERVAL_MINUTES", &mut config.policy.slot_interval_minutes)?;
        number("LESSONS_MIN_ADVANCE_HOURS", &mut config.policy.min_advance_booking_hours)?;
        number("LESSONS_MAX_ADVANCE_DAYS", &mut config.policy.max_advance_booking_days)?;
        number("LESSONS_CANCEL_DEADLINE_HOURS", &mut config.policy.cancel_deadline_hours)?;
        number("LESSONS_MODIFY_DEADLINE_HOURS", &mut config.policy.modify_deadline_hours)?;
        number("LESSONS_MAX_MODIFICATIONS", &mut config.policy.max_modifications)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hours = self.working_hours;
        if hours.start_hour >= hours.end_hour || hours.end_hour > 24 {
            return Err(ConfigError::InvalidWorkingHours {
                start: hours.start_hour,
                end: hours.end_hour,
            });
        }
        if self.policy.lesson_duration_minutes == 0 {
            return Err(ConfigError::InvalidPolicy(
                "lesson_duration_minutes must be positive".to_string(),
            ));
        }
        if self.policy.slot_interval_minutes == 0 {
            return Err(ConfigError::InvalidPolicy(
                "slot_interval_minutes must be positive".to_string(),
            ));
        }
        let prefix = &self.booking_id_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidPolicy(format!(
                "booking_id_prefix must be uppercase alphanumeric, got {prefix:?}"
            )));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&ConfigFile::from(self))?)
    }
}
