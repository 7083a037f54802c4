use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process document store.
///
/// Every update runs under a single write lock, which makes conditional
/// updates behave like the hosted store's transactions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    events: Arc<RwLock<HashMap<String, EventRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_record(&self, id: &str) -> StoreResult<UserRecord> {
        self.users
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create_record(&self, record: UserRecord) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        if users.contains_key(&record.uid) {
            return Ok(false);
        }
        users.insert(record.uid.clone(), record);
        Ok(true)
    }

    async fn update_fields(&self, id: &str, update: RecordUpdate) -> StoreResult<UpdateOutcome> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if update.apply_to(record) {
            Ok(UpdateOutcome::Applied(record.clone()))
        } else {
            Ok(UpdateOutcome::Rejected(record.clone()))
        }
    }

    async fn delete_record(&self, id: &str) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn list_records(&self) -> StoreResult<Vec<UserRecord>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn put_event(&self, event: EventRecord) -> StoreResult<()> {
        self.events.write().await.insert(event.id.clone(), event);
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<EventRecord>> {
        Ok(self.events.read().await.values().cloned().collect())
    }

    async fn delete_event(&self, id: &str) -> StoreResult<bool> {
        Ok(self.events.write().await.remove(id).is_some())
    }

    async fn replace_all(&self, users: Vec<UserRecord>, events: Vec<EventRecord>) -> StoreResult<()> {
        let mut user_map = self.users.write().await;
        let mut event_map = self.events.write().await;
        *user_map = users.into_iter().map(|u| (u.uid.clone(), u)).collect();
        *event_map = events.into_iter().map(|e| (e.id.clone(), e)).collect();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
