//! In-process [`CalendarStore`] used by tests and the CLI's file-backed store.
//!
//! Behaves like a single remote calendar: busy queries return merged busy
//! blocks, marker lookup is a linear scan over events, and every write
//! records the notification a real provider would have sent. Failure
//! injection makes every call return [`CalendarError::Unavailable`].

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{CalendarEvent, CalendarStore, CreatedEvent, NewEvent};
use crate::busy;
use crate::error::CalendarError;
use crate::model::TimeInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Updated,
    Cancelled,
}

/// A notification the calendar provider would have delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub external_id: String,
    pub attendee_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub interval: TimeInterval,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub attendee_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    next_id: u64,
    events: BTreeMap<String, StoredEvent>,
    #[serde(default)]
    notifications: Vec<Notification>,
    #[serde(skip)]
    unavailable: bool,
    #[serde(skip)]
    busy_queries: usize,
}

impl State {
    fn check(&self) -> Result<(), CalendarError> {
        if self.unavailable {
            return Err(CalendarError::Unavailable("calendar offline".to_string()));
        }
        Ok(())
    }

    fn notify(&mut self, kind: NotificationKind, external_id: &str) {
        let Some(email) = self
            .events
            .get(external_id)
            .and_then(|e| e.attendee_email.clone())
        else {
            return;
        };
        self.notifications.push(Notification {
            kind,
            external_id: external_id.to_string(),
            attendee_email: email,
        });
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    state: RwLock<State>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block time that is not a booking (e.g. the instructor's own appointment).
    pub async fn add_busy(&self, interval: TimeInterval) -> String {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = format!("evt-{}", state.next_id);
        state.events.insert(
            id.clone(),
            StoredEvent {
                interval,
                summary: "Busy".to_string(),
                description: String::new(),
                metadata: String::new(),
                marker: None,
                attendee_email: None,
            },
        );
        id
    }

    /// Insert a raw event, bypassing marker checks. Useful for seeding
    /// events written by other tools.
    pub async fn insert_raw(&self, event: StoredEvent) -> String {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = format!("evt-{}", state.next_id);
        state.events.insert(id.clone(), event);
        id
    }

    /// Make every subsequent call fail with [`CalendarError::Unavailable`].
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    pub async fn event(&self, external_id: &str) -> Option<StoredEvent> {
        self.state.read().await.events.get(external_id).cloned()
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    /// Number of busy queries served so far.
    pub async fn busy_queries(&self) -> usize {
        self.state.read().await.busy_queries
    }

    pub async fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.state.read().await)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let state: State = serde_json::from_str(json)?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Load a snapshot, or start empty if `path` does not exist.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map_err(std::io::Error::other),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().await.map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[async_trait]
impl CalendarStore for InMemoryCalendar {
    async fn query_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, CalendarError> {
        let mut state = self.state.write().await;
        state.check()?;
        state.busy_queries += 1;
        let intervals: Vec<TimeInterval> = state.events.values().map(|e| e.interval).collect();
        Ok(busy::merge_busy(&intervals, start, end))
    }

    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent, CalendarError> {
        let mut state = self.state.write().await;
        state.check()?;
        if state
            .events
            .values()
            .any(|e| e.marker.as_deref() == Some(event.marker.as_str()))
        {
            return Err(CalendarError::DuplicateMarker(event.marker));
        }

        state.next_id += 1;
        let external_id = format!("evt-{}", state.next_id);
        state.events.insert(
            external_id.clone(),
            StoredEvent {
                interval: event.interval,
                summary: event.summary,
                description: event.description,
                metadata: event.metadata,
                marker: Some(event.marker.clone()),
                attendee_email: Some(event.attendee_email),
            },
        );
        state.notify(NotificationKind::Created, &external_id);

        Ok(CreatedEvent {
            external_id,
            booking_id: event.marker,
        })
    }

    async fn find_event_by_marker(
        &self,
        marker: &str,
        search_start: DateTime<Utc>,
        search_end: DateTime<Utc>,
    ) -> Result<Option<CalendarEvent>, CalendarError> {
        let state = self.state.read().await;
        state.check()?;
        let candidates: Vec<(&String, &StoredEvent)> = state
            .events
            .iter()
            .filter(|(_, e)| e.interval.start < search_end && e.interval.end > search_start)
            .collect();
        // Events written without a marker are only matched by content, and
        // never shadow an event that carries the marker itself.
        let found = candidates
            .iter()
            .find(|(_, e)| e.marker.as_deref() == Some(marker))
            .or_else(|| {
                candidates.iter().find(|(_, e)| {
                    e.marker.is_none()
                        && (e.metadata.contains(marker) || e.description.contains(marker))
                })
            })
            .map(|(id, e)| CalendarEvent {
                external_id: id.to_string(),
                interval: e.interval,
                metadata: if e.metadata.is_empty() {
                    e.description.clone()
                } else {
                    e.metadata.clone()
                },
            });
        Ok(found)
    }

    async fn patch_event(
        &self,
        external_id: &str,
        interval: TimeInterval,
        metadata: String,
    ) -> Result<(), CalendarError> {
        let mut state = self.state.write().await;
        state.check()?;
        let event = state
            .events
            .get_mut(external_id)
            .ok_or_else(|| CalendarError::NotFound(external_id.to_string()))?;
        event.interval = interval;
        event.metadata = metadata;
        state.notify(NotificationKind::Updated, external_id);
        Ok(())
    }

    async fn delete_event(&self, external_id: &str) -> Result<(), CalendarError> {
        let mut state = self.state.write().await;
        state.check()?;
        if !state.events.contains_key(external_id) {
            return Err(CalendarError::NotFound(external_id.to_string()));
        }
        state.notify(NotificationKind::Cancelled, external_id);
        state.events.remove(external_id);
        Ok(())
    }
}
