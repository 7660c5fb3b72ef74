//! Core value types: intervals, slots, student details and booking records.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::booking_id::BookingId;

/// A half-open `[start, end)` time range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
    /// Touching intervals do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A bookable lesson window. Identity is its start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A slot annotated for display in both the instructor's and the student's zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `HH:MM` start in the instructor's zone.
    pub instructor_time: String,
    /// `HH:MM` start in the student's zone.
    pub student_time: String,
    pub display_instructor: String,
    pub display_student: String,
}

/// Who is booking, as submitted by the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub name: String,
    pub email: String,
    #[serde(with = "tz_name")]
    pub timezone: Tz,
    pub note: Option<String>,
}

/// A live booking, re-derived from the calendar on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_id: BookingId,
    /// The collaborator's id for the backing calendar event.
    pub external_id: String,
    pub student: StudentInfo,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub modification_count: u32,
    pub lesson_start: DateTime<Utc>,
    pub lesson_end: DateTime<Utc>,
}

impl BookingRecord {
    pub fn lesson(&self) -> TimeInterval {
        TimeInterval {
            start: self.lesson_start,
            end: self.lesson_end,
        }
    }

    /// Case-insensitive comparison against the stored student email.
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.student.email.trim().to_lowercase() == email.trim().to_lowercase()
    }
}

/// A booking as shown to its owner, with what they may still do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub record: BookingRecord,
    pub can_cancel: bool,
    pub cancel_reason: Option<String>,
    pub can_modify: bool,
    pub modify_reason: Option<String>,
    pub display_instructor: String,
    pub display_student: String,
}

pub(crate) mod tz_name {
    use chrono_tz::Tz;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tz, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
