//! Open lesson slots for a day, ready for display.
//!
//! One busy query per call; the slot grid, the booking-window filter and the
//! dual-zone labels are all computed locally.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use crate::calendar::CalendarStore;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{AvailableSlot, Slot};
use crate::policy;
use crate::slots::generate_slots;
use crate::timezone::{self, TIME_FORMAT};

pub struct AvailabilityService<C> {
    calendar: Arc<C>,
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
}

impl<C> Clone for AvailabilityService<C> {
    fn clone(&self) -> Self {
        Self {
            calendar: Arc::clone(&self.calendar),
            config: Arc::clone(&self.config),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: CalendarStore> AvailabilityService<C> {
    pub fn new(calendar: Arc<C>, config: Arc<EngineConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            calendar,
            config,
            clock,
        }
    }

    /// Bookable slots on `day` (a calendar day in the instructor's zone),
    /// labelled in both the instructor's zone and `student_timezone`.
    ///
    /// An empty list is a normal answer. Calendar failures surface as
    /// [`RemoteUnavailable`](crate::error::BookingError::RemoteUnavailable)
    /// with no partial result.
    pub async fn list_available_slots(
        &self,
        day: NaiveDate,
        student_timezone: Tz,
    ) -> Result<Vec<AvailableSlot>> {
        let tz = self.config.instructor_timezone;
        let policy = &self.config.policy;
        let (day_start, day_end) = timezone::day_bounds(day, tz)?;

        // Widen the query so lessons straddling midnight are seen.
        let margin = policy.lesson_duration() + policy.buffer();
        let busy = self
            .calendar
            .query_busy(day_start - margin, day_end + margin)
            .await?;

        let now = self.clock.now();
        let candidates = generate_slots(day, &self.config, &busy, now);
        let generated = candidates.len();

        // "now" may have moved on since generation; the booking window is authoritative.
        let now = self.clock.now();
        let slots: Vec<AvailableSlot> = candidates
            .into_iter()
            .filter(|slot| policy::is_booking_time_valid(slot.start, now, policy).allowed)
            .map(|slot| annotate(slot, tz, student_timezone))
            .collect();

        debug!(
            %day,
            busy = busy.len(),
            generated,
            bookable = slots.len(),
            "listed available slots"
        );
        Ok(slots)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn annotate(slot: Slot, instructor: Tz, student: Tz) -> AvailableSlot {
    AvailableSlot {
        start: slot.start,
        end: slot.end,
        instructor_time: timezone::format_in_zone(slot.start, instructor, TIME_FORMAT),
        student_time: timezone::format_in_zone(slot.start, student, TIME_FORMAT),
        display_instructor: timezone::format_time_range(slot.start, slot.end, instructor, false),
        display_student: timezone::format_time_range(slot.start, slot.end, student, false),
    }
}
