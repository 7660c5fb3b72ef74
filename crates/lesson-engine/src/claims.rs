//! Process-local claims on calendar days and on individual bookings.
//!
//! The calendar offers no compare-and-swap, so "re-check then write" leaves a
//! window in which two requests can both see a slot as free. Within one engine
//! instance that window is closed by holding a claim on every UTC day the
//! padded lesson touches for the duration of the re-check and the write.
//! Read-modify-write of one booking (modify, cancel) additionally holds a claim
//! on its id, so two requests never act on the same stale record.
//! Across instances the guarantee stays best-effort.
//!
//! Locks nobody holds or waits for are dropped on the next claim, so the
//! tables only ever contain keys that are in use.

use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::booking_id::BookingId;
use crate::model::TimeInterval;

type LockTable<K> = DashMap<K, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct SlotClaims {
    days: LockTable<NaiveDate>,
    bookings: LockTable<String>,
}

/// Held claims; released on drop.
#[derive(Debug)]
pub struct Claim {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl SlotClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the claims covering `window`.
    ///
    /// Days are locked in ascending order so concurrent claims cannot deadlock.
    pub async fn claim(&self, window: TimeInterval) -> Claim {
        prune(&self.days);

        let first = window.start.date_naive();
        let last = window.end.date_naive();

        let mut guards = Vec::new();
        let mut day = first;
        while day <= last {
            guards.push(lock(&self.days, day).lock_owned().await);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        Claim { _guards: guards }
    }

    /// Wait for and take the claim on one booking.
    ///
    /// Taken before any day claim, never while holding one.
    pub async fn claim_booking(&self, booking_id: &BookingId) -> Claim {
        prune(&self.bookings);
        let guard = lock(&self.bookings, booking_id.to_string())
            .lock_owned()
            .await;
        Claim {
            _guards: vec![guard],
        }
    }

    /// Number of days with a lock currently in the table.
    pub fn tracked_days(&self) -> usize {
        self.days.len()
    }

    /// Number of bookings with a lock currently in the table.
    pub fn tracked_bookings(&self) -> usize {
        self.bookings.len()
    }
}

fn lock<K: Eq + Hash>(table: &LockTable<K>, key: K) -> Arc<Mutex<()>> {
    table
        .entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Drop locks referenced only by the table: no holder, no waiter.
fn prune<K: Eq + Hash>(table: &LockTable<K>) {
    table.retain(|_, lock| Arc::strong_count(lock) > 1);
}
