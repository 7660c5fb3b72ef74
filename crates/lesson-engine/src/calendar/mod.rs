//! The remote calendar seam.
//!
//! The engine keeps no state of its own: busy time, bookings and their
//! metadata all live in a calendar reached through [`CalendarStore`]. An
//! implementation owns transport, auth and attendee notifications; the engine
//! only sees intervals and opaque metadata blobs.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::model::TimeInterval;

pub use memory::InMemoryCalendar;

/// An event as read back from the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub external_id: String,
    pub interval: TimeInterval,
    /// The blob given at creation (or last patch), returned verbatim.
    pub metadata: String,
}

/// Everything needed to write a booking event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub interval: TimeInterval,
    pub summary: String,
    pub description: String,
    pub metadata: String,
    /// Booking id the event can later be found by.
    pub marker: String,
    pub attendee_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub external_id: String,
    pub booking_id: String,
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Busy intervals intersecting `[start, end)`.
    async fn query_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, CalendarError>;

    /// Write a new event and notify its attendee.
    ///
    /// Fails with [`CalendarError::DuplicateMarker`] if the marker is already in use.
    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent, CalendarError>;

    /// Search events intersecting `[search_start, search_end)` for the one
    /// written with `marker`.
    ///
    /// Events written without a marker may be matched by searching their
    /// metadata for it; such a match can be a false positive, so callers
    /// check the decoded booking id.
    async fn find_event_by_marker(
        &self,
        marker: &str,
        search_start: DateTime<Utc>,
        search_end: DateTime<Utc>,
    ) -> Result<Option<CalendarEvent>, CalendarError>;

    /// Move an event and replace its metadata, notifying the attendee.
    async fn patch_event(
        &self,
        external_id: &str,
        interval: TimeInterval,
        metadata: String,
    ) -> Result<(), CalendarError>;

    /// Remove an event, notifying the attendee.
    async fn delete_event(&self, external_id: &str) -> Result<(), CalendarError>;
}
