//! Store snapshots for backup and restore.
//!
//! Sessions and live feed channels are runtime-only and are not included.

use super::AppState;
use crate::store::StoreError;
use crate::types::{EventRecord, UserRecord, TOTAL_GAMES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version for snapshot compatibility
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot: {0}")]
    Invalid(String),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A serializable copy of every user and event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    /// Export timestamp (RFC 3339)
    pub exported_at: String,
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl StoreSnapshot {
    pub fn new(users: Vec<UserRecord>, events: Vec<EventRecord>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            users,
            events,
        }
    }

    /// Check the snapshot before import and repair records whose level
    /// disagrees with their completed set. Returns how many were repaired.
    pub fn validate(&mut self) -> Result<usize, SnapshotError> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::Invalid(format!(
                "schema version {} is newer than supported version {}. Please update the server.",
                self.schema_version, SNAPSHOT_SCHEMA_VERSION
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for user in self.users.iter() {
            if !seen.insert(user.uid.as_str()) {
                return Err(SnapshotError::Invalid(format!(
                    "user '{}' appears more than once",
                    user.uid
                )));
            }
            if user.completed_games.len() > TOTAL_GAMES {
                return Err(SnapshotError::Invalid(format!(
                    "user '{}' has more than {} completed games",
                    user.uid, TOTAL_GAMES
                )));
            }
            let out_of_order = user.completed_games.iter().find_map(|game| {
                game.predecessor()
                    .filter(|prev| !user.has_completed(*prev))
                    .map(|prev| (*game, prev))
            });
            if let Some((game, requires)) = out_of_order {
                return Err(SnapshotError::Invalid(format!(
                    "user '{}' completed {} without completing {}",
                    user.uid, game, requires
                )));
            }
        }

        drop(seen);

        let mut repaired = 0;
        for user in &mut self.users {
            let count = user.completed_games.len() as u32;
            if user.level != count {
                tracing::warn!(
                    principal = %user.uid,
                    level = user.level,
                    completed = count,
                    "Repairing level to match completed games"
                );
                user.level = count;
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}

impl AppState {
    pub async fn export_snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let users = self.store_call(self.store.list_records()).await?;
        let events = self.store_call(self.store.list_events()).await?;
        Ok(StoreSnapshot::new(users, events))
    }

    /// Replace all stored records with the snapshot's.
    ///
    /// In-progress sessions are dropped since their records may be gone.
    pub async fn import_snapshot(&self, mut snapshot: StoreSnapshot) -> Result<(), SnapshotError> {
        let repaired = snapshot.validate()?;
        let (users, events) = (snapshot.users.len(), snapshot.events.len());

        self.store_call(self.store.replace_all(snapshot.users, snapshot.events))
            .await?;
        self.sessions.write().await.clear();

        tracing::info!(users, events, repaired, "Snapshot imported");
        Ok(())
    }

    /// Write the current store to `path` (via a temp file and rename).
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let snapshot = self.export_snapshot().await?;
        let json = serde_json::to_vec_pretty(&snapshot)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Load `path` into the store. A missing file is not an error.
    pub async fn load_snapshot(&self, path: &Path) -> Result<bool, SnapshotError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        self.import_snapshot(snapshot).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameId, Principal};

    fn user(id: &str) -> UserRecord {
        UserRecord::new(&Principal {
            id: id.to_string(),
            email: format!("{id}@fest.edu"),
            display_name: id.to_string(),
        })
    }

    #[test]
    fn test_validation_future_schema() {
        let mut snapshot = StoreSnapshot::new(Vec::new(), Vec::new());
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;

        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_validation_repairs_level() {
        let mut drifted = user("p1");
        drifted.completed_games.insert(GameId::RiddleRush);
        drifted.level = 3;

        let mut snapshot = StoreSnapshot::new(vec![drifted, user("p2")], Vec::new());
        assert_eq!(snapshot.validate().unwrap(), 1);
        assert_eq!(snapshot.users[0].level, 1);
    }

    #[test]
    fn test_validation_rejects_out_of_order_completion() {
        let mut skipped_ahead = user("p1");
        skipped_ahead.completed_games.insert(GameId::TreasureHunt);
        skipped_ahead.level = 1;

        let mut snapshot = StoreSnapshot::new(vec![skipped_ahead], Vec::new());
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)));
        assert!(err.to_string().contains("without completing word-scramble"));
    }

    #[tokio::test]
    async fn test_import_of_out_of_order_record_leaves_store_untouched() {
        let state = AppState::default();
        state.store.create_record(user("p0")).await.unwrap();

        let mut skipped_ahead = user("p1");
        skipped_ahead.completed_games.insert(GameId::WhoSaidIt);
        skipped_ahead.level = 1;
        let snapshot = StoreSnapshot::new(vec![skipped_ahead], Vec::new());

        assert!(state.import_snapshot(snapshot).await.is_err());
        assert!(state.store.get_record("p0").await.is_ok());
        assert!(state.store.get_record("p1").await.is_err());
    }

    #[test]
    fn test_validation_duplicate_user() {
        let mut snapshot = StoreSnapshot::new(vec![user("p1"), user("p1")], Vec::new());
        assert!(matches!(snapshot.validate(), Err(SnapshotError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fest.json");

        let source = AppState::default();
        source.store.create_record(user("p1")).await.unwrap();
        source.complete_game("p1", GameId::RiddleRush, 82).await.unwrap();
        source.save_snapshot(&path).await.unwrap();

        let target = AppState::default();
        assert!(target.load_snapshot(&path).await.unwrap());
        let record = target.store.get_record("p1").await.unwrap();
        assert_eq!(record.total_score, 82);
        assert!(record.has_completed(GameId::RiddleRush));

        let missing = dir.path().join("absent.json");
        assert!(!target.load_snapshot(&missing).await.unwrap());
    }
}
