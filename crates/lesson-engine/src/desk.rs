//! Request surface for the UI layer.
//!
//! Takes raw string requests (as they arrive from a form or a command line),
//! validates them, calls the services and wraps the outcome in an
//! [`ApiResponse`]: either `{"success": true, ...payload}` or
//! `{"success": false, "error": {"code", "message"}}`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityService;
use crate::booking::BookingService;
use crate::calendar::CalendarStore;
use crate::claims::SlotClaims;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{BookingError, ErrorPayload, Result};
use crate::model::{AvailableSlot, BookingView, StudentInfo};
use crate::timezone;

const MAX_NAME_CHARS: usize = 50;
const MAX_NOTE_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ListSlotsRequest {
    /// `YYYY-MM-DD`, a day in the instructor's zone.
    pub date: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub student_name: String,
    pub student_email: String,
    pub student_timezone: Option<String>,
    /// RFC 3339 lesson start.
    pub start_time: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingQuery {
    pub booking_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifyBookingRequest {
    pub booking_id: String,
    pub email: String,
    /// RFC 3339 new lesson start.
    pub new_start_time: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotList {
    pub date: String,
    pub instructor_timezone: String,
    pub student_timezone: String,
    pub slots: Vec<AvailableSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDetails {
    pub booking: BookingView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingChanged {
    pub booking_id: String,
    pub message: String,
}

/// Success payload or `{code, message}` error, ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(ErrorPayload),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, ErrorPayload> {
        match self {
            ApiResponse::Success(data) => Ok(data),
            ApiResponse::Failure(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for ApiResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::Success(data),
            Err(e) => {
                tracing::debug!(code = %e.code(), "request failed: {e}");
                ApiResponse::Failure(e.payload())
            }
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a, T> {
    Success {
        success: bool,
        #[serde(flatten)]
        data: &'a T,
    },
    Failure {
        success: bool,
        error: &'a ErrorPayload,
    },
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ApiResponse::Success(data) => Wire::Success {
                success: true,
                data,
            }
            .serialize(serializer),
            ApiResponse::Failure(error) => {
                let wire: Wire<'_, T> = Wire::Failure {
                    success: false,
                    error,
                };
                wire.serialize(serializer)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

/// The five operations exposed upward, sharing one calendar and config.
pub struct LessonDesk<C> {
    availability: AvailabilityService<C>,
    bookings: BookingService<C>,
}

impl<C: CalendarStore> LessonDesk<C> {
    pub fn new(calendar: Arc<C>, config: Arc<EngineConfig>, clock: Arc<dyn Clock>) -> Self {
        let availability =
            AvailabilityService::new(Arc::clone(&calendar), Arc::clone(&config), Arc::clone(&clock));
        let bookings =
            BookingService::with_claims(calendar, config, clock, Arc::new(SlotClaims::new()));
        Self {
            availability,
            bookings,
        }
    }

    pub fn bookings(&self) -> &BookingService<C> {
        &self.bookings
    }

    pub fn availability(&self) -> &AvailabilityService<C> {
        &self.availability
    }

    pub async fn list_slots(&self, request: ListSlotsRequest) -> ApiResponse<SlotList> {
        self.try_list_slots(request).await.into()
    }

    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> ApiResponse<BookingConfirmation> {
        self.try_create_booking(request).await.into()
    }

    pub async fn get_booking(&self, query: BookingQuery) -> ApiResponse<BookingDetails> {
        self.try_get_booking(query).await.into()
    }

    pub async fn modify_booking(&self, request: ModifyBookingRequest) -> ApiResponse<BookingChanged> {
        self.try_modify_booking(request).await.into()
    }

    pub async fn cancel_booking(&self, query: BookingQuery) -> ApiResponse<BookingChanged> {
        self.try_cancel_booking(query).await.into()
    }

    async fn try_list_slots(&self, request: ListSlotsRequest) -> Result<SlotList> {
        let config = self.availability.config();
        let day = timezone::parse_day(&request.date)?;
        let student_tz = self.student_zone(request.timezone.as_deref())?;
        let slots = self.availability.list_available_slots(day, student_tz).await?;
        Ok(SlotList {
            date: day.to_string(),
            instructor_timezone: config.instructor_timezone.name().to_string(),
            student_timezone: student_tz.name().to_string(),
            slots,
        })
    }

    async fn try_create_booking(&self, request: CreateBookingRequest) -> Result<BookingConfirmation> {
        let student = StudentInfo {
            name: validate_name(&request.student_name)?,
            email: validate_email(&request.student_email)?,
            timezone: self.student_zone(request.student_timezone.as_deref())?,
            note: validate_note(request.note)?,
        };
        let start = timezone::parse_instant(&request.start_time)?;

        let record = self.bookings.create(start, student).await?;
        Ok(BookingConfirmation {
            booking_id: record.booking_id.to_string(),
            message: "Booking confirmed. A confirmation has been sent to your email.".to_string(),
            start_time: record.lesson_start,
            end_time: record.lesson_end,
            event_id: record.external_id,
        })
    }

    async fn try_get_booking(&self, query: BookingQuery) -> Result<BookingDetails> {
        let email = validate_email(&query.email)?;
        let booking = self.bookings.find(&query.booking_id, &email).await?;
        Ok(BookingDetails { booking })
    }

    async fn try_modify_booking(&self, request: ModifyBookingRequest) -> Result<BookingChanged> {
        let email = validate_email(&request.email)?;
        let new_start = timezone::parse_instant(&request.new_start_time)?;
        let record = self
            .bookings
            .modify(&request.booking_id, &email, new_start)
            .await?;
        Ok(BookingChanged {
            booking_id: record.booking_id.to_string(),
            message: "Booking has been rescheduled".to_string(),
        })
    }

    async fn try_cancel_booking(&self, query: BookingQuery) -> Result<BookingChanged> {
        let email = validate_email(&query.email)?;
        let record = self.bookings.cancel(&query.booking_id, &email).await?;
        Ok(BookingChanged {
            booking_id: record.booking_id.to_string(),
            message: "Booking has been cancelled".to_string(),
        })
    }

    fn student_zone(&self, name: Option<&str>) -> Result<Tz> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Ok(timezone::parse_timezone(name)?),
            None => Ok(self.availability.config().default_student_timezone),
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BookingError::InvalidInput("Please enter your name".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(BookingError::InvalidInput(format!(
            "Name cannot exceed {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// A deliberately loose syntactic check: one `@`, a non-empty local part and
/// a dotted domain, no whitespace.
fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let invalid = || BookingError::InvalidInput("Please enter a valid email address".to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email.to_string())
}

fn validate_note(note: Option<String>) -> Result<Option<String>> {
    let Some(note) = note else {
        return Ok(None);
    };
    let note = note.trim();
    if note.is_empty() {
        return Ok(None);
    }
    if note.chars().count() > MAX_NOTE_CHARS {
        return Err(BookingError::InvalidInput(format!(
            "Note cannot exceed {MAX_NOTE_CHARS} characters"
        )));
    }
    Ok(Some(note.to_string()))
}
