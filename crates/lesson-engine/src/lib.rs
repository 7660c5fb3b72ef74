//! # lesson-engine
//!
//! Availability and booking engine for a single instructor's lesson calendar.
//!
//! The instructor publishes daily working hours in their own timezone; students
//! in any timezone list open slots, book fixed-length lessons, and later look
//! up, reschedule or cancel them using the booking id plus their email. All
//! durable state lives in a remote calendar reached through
//! [`calendar::CalendarStore`]; the engine re-derives everything per request.
//!
//! ## Modules
//!
//! - [`timezone`] — instant ⇄ wall-clock conversion and formatting
//! - [`policy`] — booking window, cancel and modify rules
//! - [`slots`] — candidate slot generation for one day
//! - [`busy`] — busy-interval merging, subtraction and overlap tests
//! - [`availability`] — open slots for a day, labelled in two zones
//! - [`booking`] — create / find / modify / cancel
//! - [`desk`] — validated request surface returning `{code, message}` errors
//! - [`calendar`] — the calendar seam and an in-memory implementation
//! - [`metadata`] — versioned booking metadata codec
//! - [`booking_id`] — `PREFIX-YYYYMMDD-XXXXXX` identifiers
//! - [`claims`] — per-instance write serialization
//! - [`config`] — immutable engine configuration
//! - [`dst`] — DST gap policy for slot generation
//! - [`clock`] — injectable "now"
//! - [`error`] — Error types

pub mod availability;
pub mod booking;
pub mod booking_id;
pub mod busy;
pub mod calendar;
pub mod claims;
pub mod clock;
pub mod config;
pub mod desk;
pub mod dst;
pub mod error;
pub mod metadata;
pub mod model;
pub mod policy;
pub mod slots;
pub mod timezone;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use booking_id::BookingId;
pub use calendar::{CalendarStore, InMemoryCalendar};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, LessonPolicy, WorkingHours};
pub use desk::{ApiResponse, LessonDesk};
pub use dst::DstPolicy;
pub use error::{BookingError, ErrorCode, ErrorPayload};
pub use model::{AvailableSlot, BookingRecord, BookingView, Slot, StudentInfo, TimeInterval};
pub use policy::{PolicyDecision, PolicyViolation};
pub use slots::generate_slots;
