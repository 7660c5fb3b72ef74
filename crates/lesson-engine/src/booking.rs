//! Create, find, modify and cancel bookings against the calendar.
//!
//! A booking moves `NonExistent -> Active -> Cancelled`; a successful modify
//! keeps it `Active` and bumps its modification count. Every precondition is
//! checked before the first write, so a failed call leaves the calendar
//! untouched.
//!
//! Writes that occupy time (create, modify) re-query busy time right before
//! writing while holding a [`SlotClaims`] claim on the padded window. Modify
//! and cancel also hold a claim on the booking itself from the read of its
//! record until the write.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::booking_id::BookingId;
use crate::busy;
use crate::calendar::{CalendarStore, NewEvent};
use crate::claims::SlotClaims;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{BookingError, CalendarError, Result};
use crate::metadata::{self, BookingMetadata};
use crate::model::{BookingRecord, BookingView, StudentInfo, TimeInterval};
use crate::policy;
use crate::timezone;

/// Attempts at creating an event before a marker collision becomes an error.
const ID_ATTEMPTS: usize = 2;

pub struct BookingService<C> {
    calendar: Arc<C>,
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
    claims: Arc<SlotClaims>,
}

impl<C> Clone for BookingService<C> {
    fn clone(&self) -> Self {
        Self {
            calendar: Arc::clone(&self.calendar),
            config: Arc::clone(&self.config),
            clock: Arc::clone(&self.clock),
            claims: Arc::clone(&self.claims),
        }
    }
}

impl<C: CalendarStore> BookingService<C> {
    pub fn new(calendar: Arc<C>, config: Arc<EngineConfig>, clock: Arc<dyn Clock>) -> Self {
        Self::with_claims(calendar, config, clock, Arc::new(SlotClaims::new()))
    }

    /// Share `claims` between services that write to the same calendar.
    pub fn with_claims(
        calendar: Arc<C>,
        config: Arc<EngineConfig>,
        clock: Arc<dyn Clock>,
        claims: Arc<SlotClaims>,
    ) -> Self {
        Self {
            calendar,
            config,
            clock,
            claims,
        }
    }

    /// Book the lesson starting at `start` for `student`.
    ///
    /// Fails with `InvalidInput` outside the booking window and `SlotTaken`
    /// if the calendar shows the padded lesson window as busy.
    pub async fn create(&self, start: DateTime<Utc>, student: StudentInfo) -> Result<BookingRecord> {
        let now = self.clock.now();
        policy::is_booking_time_valid(start, now, &self.config.policy)
            .into_result()
            .map_err(|v| BookingError::InvalidInput(v.to_string()))?;

        let lesson = self.lesson_at(start)?;
        let window = self.padded(lesson)?;
        let _claim = self.claims.claim(window).await;

        let busy = self.calendar.query_busy(window.start, window.end).await?;
        if let Some(conflict) = busy.iter().find(|b| b.overlaps(&window)) {
            warn!(%start, busy_start = %conflict.start, "slot taken before create");
            return Err(BookingError::SlotTaken);
        }

        for attempt in 1..=ID_ATTEMPTS {
            let booking_id = BookingId::generate(
                &self.config.booking_id_prefix,
                now,
                &mut rand::thread_rng(),
            );
            let metadata = BookingMetadata {
                booking_id: booking_id.clone(),
                student_name: student.name.clone(),
                student_email: student.email.clone(),
                student_timezone: Some(student.timezone.name().to_string()),
                note: student.note.clone(),
                created_at: now,
                last_modified_at: None,
                modification_count: 0,
            };
            let blob = metadata::encode(&metadata)
                .map_err(|e| BookingError::Internal(e.to_string()))?;

            let event = NewEvent {
                interval: lesson,
                summary: metadata::summary(&student.name),
                description: metadata::description(&metadata),
                metadata: blob,
                marker: booking_id.to_string(),
                attendee_email: student.email.clone(),
            };

            match self.calendar.create_event(event).await {
                Ok(created) => {
                    info!(booking_id = %booking_id, %start, "booking created");
                    return Ok(BookingRecord {
                        booking_id,
                        external_id: created.external_id,
                        student,
                        created_at: now,
                        last_modified_at: None,
                        modification_count: 0,
                        lesson_start: lesson.start,
                        lesson_end: lesson.end,
                    });
                }
                Err(CalendarError::DuplicateMarker(id)) if attempt < ID_ATTEMPTS => {
                    debug!(booking_id = %id, "booking id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BookingError::Internal(
            "could not allocate a unique booking id".to_string(),
        ))
    }

    /// Look up a booking and verify `email` owns it.
    ///
    /// Unknown ids are `BookingNotFound`; a wrong email is `EmailMismatch`.
    pub async fn find(&self, booking_id: &str, email: &str) -> Result<BookingView> {
        let id = self.parse_id(booking_id)?;
        let record = self.owned(&id, email).await?;
        Ok(self.view(record))
    }

    /// Move a booking to `new_start`.
    pub async fn modify(
        &self,
        booking_id: &str,
        email: &str,
        new_start: DateTime<Utc>,
    ) -> Result<BookingRecord> {
        let id = self.parse_id(booking_id)?;
        let _booking = self.claims.claim_booking(&id).await;
        let record = self.owned(&id, email).await?;
        let now = self.clock.now();
        let policy = &self.config.policy;

        policy::can_modify(record.lesson_start, record.modification_count, now, policy)
            .into_result()
            .map_err(BookingError::CannotModify)?;
        policy::is_booking_time_valid(new_start, now, policy)
            .into_result()
            .map_err(|v| BookingError::InvalidInput(v.to_string()))?;

        let lesson = self.lesson_at(new_start)?;
        let window = self.padded(lesson)?;
        let _claim = self.claims.claim(window).await;

        let busy = self.calendar.query_busy(window.start, window.end).await?;
        let others = busy::subtract(&busy, &record.lesson());
        if let Some(conflict) = others.iter().find(|b| b.overlaps(&window)) {
            warn!(
                booking_id = %record.booking_id,
                %new_start,
                busy_start = %conflict.start,
                "slot taken before modify"
            );
            return Err(BookingError::SlotTaken);
        }

        let updated = BookingRecord {
            last_modified_at: Some(now),
            modification_count: record.modification_count + 1,
            lesson_start: lesson.start,
            lesson_end: lesson.end,
            ..record
        };
        let blob = metadata::encode(&BookingMetadata::from_record(&updated))
            .map_err(|e| BookingError::Internal(e.to_string()))?;
        self.calendar
            .patch_event(&updated.external_id, lesson, blob)
            .await?;

        info!(
            booking_id = %updated.booking_id,
            %new_start,
            modifications = updated.modification_count,
            "booking modified"
        );
        Ok(updated)
    }

    /// Cancel a booking. Returns the record as it was before removal.
    pub async fn cancel(&self, booking_id: &str, email: &str) -> Result<BookingRecord> {
        let id = self.parse_id(booking_id)?;
        let _booking = self.claims.claim_booking(&id).await;
        let record = self.owned(&id, email).await?;
        let now = self.clock.now();

        policy::can_cancel(record.lesson_start, now, &self.config.policy)
            .into_result()
            .map_err(BookingError::CannotCancel)?;

        self.calendar.delete_event(&record.external_id).await?;
        info!(booking_id = %record.booking_id, "booking cancelled");
        Ok(record)
    }

    /// Decorate a record with what its owner may still do and display labels.
    pub fn view(&self, record: BookingRecord) -> BookingView {
        let now = self.clock.now();
        let policy = &self.config.policy;
        let cancel = policy::can_cancel(record.lesson_start, now, policy);
        let modify =
            policy::can_modify(record.lesson_start, record.modification_count, now, policy);

        let display_instructor = timezone::format_time_range(
            record.lesson_start,
            record.lesson_end,
            self.config.instructor_timezone,
            true,
        );
        let display_student = timezone::format_time_range(
            record.lesson_start,
            record.lesson_end,
            record.student.timezone,
            true,
        );

        BookingView {
            record,
            can_cancel: cancel.allowed,
            cancel_reason: cancel.reason.map(|r| r.to_string()),
            can_modify: modify.allowed,
            modify_reason: modify.reason.map(|r| r.to_string()),
            display_instructor,
            display_student,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn parse_id(&self, booking_id: &str) -> Result<BookingId> {
        BookingId::parse(booking_id, &self.config.booking_id_prefix)
    }

    async fn owned(&self, id: &BookingId, email: &str) -> Result<BookingRecord> {
        let record = self.lookup(id).await?;
        if !record.is_owned_by(email) {
            debug!(booking_id = %record.booking_id, "email mismatch");
            return Err(BookingError::EmailMismatch);
        }
        Ok(record)
    }

    async fn lookup(&self, id: &BookingId) -> Result<BookingRecord> {
        let now = self.clock.now();
        let search_start = now - Duration::days(self.config.lookup_past_days as i64);
        let search_end = now + Duration::days(self.config.lookup_future_days as i64);

        let event = self
            .calendar
            .find_event_by_marker(id.as_str(), search_start, search_end)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(id.to_string()))?;

        let stored = metadata::decode(&event.metadata).map_err(|e| {
            warn!(booking_id = %id, external_id = %event.external_id, "unreadable booking metadata: {e}");
            BookingError::Internal(e.to_string())
        })?;
        if stored.booking_id != *id {
            return Err(BookingError::BookingNotFound(id.to_string()));
        }

        stored
            .into_record(
                event.external_id,
                event.interval,
                self.config.default_student_timezone,
            )
            .map_err(|e| BookingError::Internal(e.to_string()))
    }

    fn lesson_at(&self, start: DateTime<Utc>) -> Result<TimeInterval> {
        TimeInterval::new(start, start + self.config.policy.lesson_duration())
            .ok_or_else(|| BookingError::InvalidInput("lesson duration must be positive".to_string()))
    }

    /// The lesson widened by the buffer on both sides.
    fn padded(&self, lesson: TimeInterval) -> Result<TimeInterval> {
        let buffer = self.config.policy.buffer();
        TimeInterval::new(lesson.start - buffer, lesson.end + buffer)
            .ok_or_else(|| BookingError::InvalidInput("invalid lesson window".to_string()))
    }
}
