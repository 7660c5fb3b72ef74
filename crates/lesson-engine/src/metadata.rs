//! Booking metadata stored on calendar events.
//!
//! The calendar has no structured custom fields, so booking details travel as
//! an opaque blob the collaborator stores and hands back verbatim. The blob is
//! a versioned JSON envelope:
//!
//! ```json
//! {"schema":"lesson-booking","version":1,"booking":{"bookingId":"MZK-20240101-AB12CD", ...}}
//! ```
//!
//! Events written by older deployments carry the booking as a trailing
//! `METADATA:{json}` line of a free-text description; [`decode`] reads those too.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking_id::BookingId;
use crate::model::{BookingRecord, StudentInfo, TimeInterval};

pub const SCHEMA: &str = "lesson-booking";
pub const CURRENT_VERSION: u32 = 1;
const LEGACY_SENTINEL: &str = "METADATA:";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("no booking metadata in event")]
    Missing,

    #[error("unexpected metadata schema: {0}")]
    WrongSchema(String),

    #[error("unsupported metadata version: {0}")]
    UnsupportedVersion(u32),

    #[error("malformed metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid student timezone in metadata: {0}")]
    InvalidTimezone(String),
}

/// Booking fields persisted alongside the event (schema version 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    pub booking_id: BookingId,
    pub student_name: String,
    pub student_email: String,
    #[serde(default)]
    pub student_timezone: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modification_count: u32,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    schema: String,
    version: u32,
    booking: serde_json::Value,
}

/// Serialize metadata into the current envelope format.
pub fn encode(metadata: &BookingMetadata) -> Result<String, MetadataError> {
    let envelope = Envelope {
        schema: SCHEMA.to_string(),
        version: CURRENT_VERSION,
        booking: serde_json::to_value(metadata)?,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Read metadata from a stored blob, in either the envelope or the legacy format.
pub fn decode(blob: &str) -> Result<BookingMetadata, MetadataError> {
    let trimmed = blob.trim();
    if trimmed.starts_with('{') {
        let envelope: Envelope = serde_json::from_str(trimmed)?;
        if envelope.schema != SCHEMA {
            return Err(MetadataError::WrongSchema(envelope.schema));
        }
        return match envelope.version {
            1 => Ok(serde_json::from_value(envelope.booking)?),
            other => Err(MetadataError::UnsupportedVersion(other)),
        };
    }

    let legacy = trimmed
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(LEGACY_SENTINEL))
        .ok_or(MetadataError::Missing)?;
    let mut metadata: BookingMetadata = serde_json::from_str(legacy.trim())?;
    if metadata.note.as_deref() == Some("") {
        metadata.note = None;
    }
    Ok(metadata)
}

/// Event title shown in the instructor's calendar.
pub fn summary(student_name: &str) -> String {
    format!("Lesson - {student_name}")
}

/// Human-readable event description shown in the instructor's calendar.
pub fn description(metadata: &BookingMetadata) -> String {
    format!(
        "Booking details\n\nStudent: {}\nEmail: {}\nBooking ID: {}\n\nNote: {}",
        metadata.student_name,
        metadata.student_email,
        metadata.booking_id,
        metadata.note.as_deref().unwrap_or("none"),
    )
}

impl BookingMetadata {
    pub fn from_record(record: &BookingRecord) -> Self {
        BookingMetadata {
            booking_id: record.booking_id.clone(),
            student_name: record.student.name.clone(),
            student_email: record.student.email.clone(),
            student_timezone: Some(record.student.timezone.name().to_string()),
            note: record.student.note.clone(),
            created_at: record.created_at,
            last_modified_at: record.last_modified_at,
            modification_count: record.modification_count,
        }
    }

    /// Rebuild the full record. `fallback_timezone` applies when none was stored.
    pub fn into_record(
        self,
        external_id: String,
        lesson: TimeInterval,
        fallback_timezone: Tz,
    ) -> Result<BookingRecord, MetadataError> {
        let timezone = match self.student_timezone.as_deref() {
            Some(name) if !name.is_empty() => name
                .parse()
                .map_err(|_| MetadataError::InvalidTimezone(name.to_string()))?,
            _ => fallback_timezone,
        };
        Ok(BookingRecord {
            booking_id: self.booking_id,
            external_id,
            student: StudentInfo {
                name: self.student_name,
                email: self.student_email,
                timezone,
                note: self.note,
            },
            created_at: self.created_at,
            last_modified_at: self.last_modified_at,
            modification_count: self.modification_count,
            lesson_start: lesson.start,
            lesson_end: lesson.end,
        })
    }
}
