//! Fest event listings managed from the admin console

use super::AppState;
use crate::store::StoreError;
use crate::types::EventRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Event name is required".to_string());
        }
        Ok(())
    }
}

/// An event plus its countdown relative to the request time
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: EventRecord,
    pub starts_at: NaiveDateTime,
    /// Zero once the event has started
    pub seconds_until: i64,
    pub started: bool,
}

/// Sort events earliest first and attach countdowns.
pub fn schedule(mut events: Vec<EventRecord>, now: NaiveDateTime) -> Vec<EventView> {
    events.sort_by_key(EventRecord::starts_at);
    events
        .into_iter()
        .map(|event| {
            let starts_at = event.starts_at();
            let until = (starts_at - now).num_seconds();
            EventView {
                event,
                starts_at,
                seconds_until: until.max(0),
                started: until <= 0,
            }
        })
        .collect()
}

impl AppState {
    pub async fn create_event(&self, new: NewEvent) -> Result<EventRecord, StoreError> {
        let event = EventRecord {
            id: ulid::Ulid::new().to_string(),
            name: new.name.trim().to_string(),
            date: new.date,
            time: new
                .time
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "10:00 AM".to_string()),
            description: new.description.trim().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.store_call(self.store.put_event(event.clone())).await?;
        tracing::info!(event = %event.id, name = %event.name, "Event created");
        Ok(event)
    }

    /// All events, earliest first
    pub async fn list_events(&self) -> Result<Vec<EventView>, StoreError> {
        let events = self.store_call(self.store.list_events()).await?;
        Ok(schedule(events, chrono::Local::now().naive_local()))
    }

    pub async fn delete_event(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.store_call(self.store.delete_event(id)).await?;
        if deleted {
            tracing::info!(event = id, "Event deleted");
        }
        Ok(deleted)
    }
}
