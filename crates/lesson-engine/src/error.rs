//! Error types for lesson-engine operations.
//!
//! [`BookingError`] is the user-facing taxonomy every service returns. The
//! narrower enums ([`TimeError`], [`CalendarError`], [`ConfigError`]) belong to
//! the layers underneath and are mapped into it at the service boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PolicyViolation;

/// Failures of the timezone converter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),
}

/// Failures reported by a [`CalendarStore`](crate::calendar::CalendarStore) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Transport, auth or availability failure of the remote calendar.
    #[error("calendar unavailable: {0}")]
    Unavailable(String),

    /// Another event already carries this booking marker.
    #[error("duplicate booking marker: {0}")]
    DuplicateMarker(String),

    /// The external event id does not exist (anymore).
    #[error("event not found: {0}")]
    NotFound(String),
}

/// Failures while building or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timezone in config: {0}")]
    InvalidTimezone(String),

    #[error("Invalid working hours: start {start} must be before end {end} (max 24)")]
    InvalidWorkingHours { start: u32, end: u32 },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable machine-readable error codes exposed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    SlotTaken,
    BookingNotFound,
    EmailMismatch,
    CannotCancel,
    CannotModify,
    RemoteUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::SlotTaken => "SLOT_TAKEN",
            ErrorCode::BookingNotFound => "BOOKING_NOT_FOUND",
            ErrorCode::EmailMismatch => "EMAIL_MISMATCH",
            ErrorCode::CannotCancel => "CANNOT_CANCEL",
            ErrorCode::CannotModify => "CANNOT_MODIFY",
            ErrorCode::RemoteUnavailable => "REMOTE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `{code, message}` pair returned upward on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

/// Errors returned by the availability and booking services.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    /// Malformed request, or a start time outside the booking window.
    #[error("{0}")]
    InvalidInput(String),

    /// The slot was taken between the availability fetch and the write.
    #[error("This time slot has just been booked, please choose another time")]
    SlotTaken,

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    /// The caller's email does not match the booking's student email.
    #[error("Email does not match the booking")]
    EmailMismatch,

    #[error("{0}")]
    CannotCancel(PolicyViolation),

    #[error("{0}")]
    CannotModify(PolicyViolation),

    /// The remote calendar failed; the cause is logged, never surfaced.
    #[error("The calendar service is temporarily unavailable, please try again later")]
    RemoteUnavailable(String),

    /// Stored booking data could not be read (e.g. a corrupt metadata blob).
    #[error("Booking data could not be read: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BookingError::InvalidInput(_) => ErrorCode::InvalidInput,
            BookingError::SlotTaken => ErrorCode::SlotTaken,
            BookingError::BookingNotFound(_) => ErrorCode::BookingNotFound,
            BookingError::EmailMismatch => ErrorCode::EmailMismatch,
            BookingError::CannotCancel(_) => ErrorCode::CannotCancel,
            BookingError::CannotModify(_) => ErrorCode::CannotModify,
            BookingError::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            BookingError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<TimeError> for BookingError {
    fn from(e: TimeError) -> Self {
        BookingError::InvalidInput(e.to_string())
    }
}

impl From<CalendarError> for BookingError {
    fn from(e: CalendarError) -> Self {
        match e {
            CalendarError::Unavailable(cause) => {
                tracing::warn!("calendar call failed: {cause}");
                BookingError::RemoteUnavailable(cause)
            }
            CalendarError::NotFound(id) => BookingError::BookingNotFound(id),
            CalendarError::DuplicateMarker(id) => {
                BookingError::Internal(format!("booking id {id} already in use"))
            }
        }
    }
}

/// Convenience alias used throughout lesson-engine.
pub type Result<T> = std::result::Result<T, BookingError>;
