//! Document store seam.
//!
//! The hosted document database is an external collaborator. The core only
//! needs record reads, create-if-absent, and partial updates that support
//! counter increments plus an atomic append-if-absent on the completed set.

pub mod memory;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::types::{EventRecord, GameId, SubmissionMark, UserRecord, RECENT_SUBMISSIONS_KEPT};

pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the document store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Transient errors may succeed on retry; NotFound never will.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Integer fields that support increment-by-delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    Level,
    TotalScore,
    GamesPlayed,
}

/// A single field mutation inside a [`RecordUpdate`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    Increment { field: CounterField, by: u64 },
    /// Add to `completedGames` unless already present
    AppendCompleted(GameId),
}

/// Guard evaluated against the stored record before any delta is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precondition {
    NotCompleted(GameId),
}

/// Partial update applied as one logical write.
///
/// Either every delta lands or none does. An update carrying a submission
/// key is rejected if the record already remembers that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub deltas: Vec<FieldDelta>,
    pub precondition: Option<Precondition>,
    pub submission: Option<String>,
}

impl RecordUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(mut self, field: CounterField, by: u64) -> Self {
        self.deltas.push(FieldDelta::Increment { field, by });
        self
    }

    pub fn append_completed(mut self, game: GameId) -> Self {
        self.deltas.push(FieldDelta::AppendCompleted(game));
        self
    }

    pub fn only_if(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Apply at most once for this submission key
    pub fn once(mut self, submission: impl Into<String>) -> Self {
        self.submission = Some(submission.into());
        self
    }

    fn levels_up(&self) -> bool {
        self.deltas.iter().any(|d| {
            matches!(
                d,
                FieldDelta::Increment {
                    field: CounterField::Level,
                    ..
                }
            )
        })
    }

    /// Apply to an in-memory record. Used by stores without native
    /// field transforms; callers must hold exclusive access to `record`.
    pub fn apply_to(&self, record: &mut UserRecord) -> bool {
        if let Some(Precondition::NotCompleted(game)) = self.precondition {
            if record.completed_games.contains(&game) {
                return false;
            }
        }
        if let Some(session) = &self.submission {
            if record.submission_mark(session).is_some() {
                return false;
            }
        }

        for delta in &self.deltas {
            match delta {
                FieldDelta::Increment { field, by } => match field {
                    CounterField::Level => {
                        record.level = record.level.saturating_add(*by as u32)
                    }
                    CounterField::TotalScore => {
                        record.total_score = record.total_score.saturating_add(*by)
                    }
                    CounterField::GamesPlayed => {
                        record.games_played = record.games_played.saturating_add(*by)
                    }
                },
                FieldDelta::AppendCompleted(game) => {
                    record.completed_games.insert(*game);
                }
            }
        }

        if let Some(session) = &self.submission {
            record.recent_submissions.push(SubmissionMark {
                session: session.clone(),
                leveled_up: self.levels_up(),
                level: record.level,
            });
            let excess = record
                .recent_submissions
                .len()
                .saturating_sub(RECENT_SUBMISSIONS_KEPT);
            record.recent_submissions.drain(..excess);
        }
        true
    }
}

/// Result of a (possibly conditional) update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Update applied; carries the record as written
    Applied(UserRecord),
    /// Precondition failed; carries the unchanged record
    Rejected(UserRecord),
}

/// Trait every document store backend implements
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one user record
    async fn get_record(&self, id: &str) -> StoreResult<UserRecord>;

    /// Create the record if absent. Returns true if it was created.
    async fn create_record(&self, record: UserRecord) -> StoreResult<bool>;

    /// Apply a partial update atomically
    async fn update_fields(&self, id: &str, update: RecordUpdate) -> StoreResult<UpdateOutcome>;

    async fn delete_record(&self, id: &str) -> StoreResult<bool>;

    async fn list_records(&self) -> StoreResult<Vec<UserRecord>>;

    async fn put_event(&self, event: EventRecord) -> StoreResult<()>;

    async fn list_events(&self) -> StoreResult<Vec<EventRecord>>;

    async fn delete_event(&self, id: &str) -> StoreResult<bool>;

    /// Replace every user and event record (snapshot import)
    async fn replace_all(&self, users: Vec<UserRecord>, events: Vec<EventRecord>) -> StoreResult<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Run a store call with an upper bound on its duration.
///
/// Expiry surfaces as a transient [`StoreError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Principal;

    fn record() -> UserRecord {
        UserRecord::new(&Principal {
            id: "p".to_string(),
            email: "p@x.io".to_string(),
            display_name: "P".to_string(),
        })
    }

    #[test]
    fn test_apply_increments_and_append() {
        let mut rec = record();
        let update = RecordUpdate::new()
            .increment(CounterField::Level, 1)
            .increment(CounterField::TotalScore, 82)
            .increment(CounterField::GamesPlayed, 1)
            .append_completed(GameId::RiddleRush);

        assert!(update.apply_to(&mut rec));
        assert_eq!(rec.level, 1);
        assert_eq!(rec.total_score, 82);
        assert_eq!(rec.games_played, 1);
        assert!(rec.has_completed(GameId::RiddleRush));
    }

    #[test]
    fn test_precondition_blocks_every_delta() {
        let mut rec = record();
        rec.completed_games.insert(GameId::RiddleRush);
        rec.level = 1;

        let update = RecordUpdate::new()
            .increment(CounterField::Level, 1)
            .append_completed(GameId::RiddleRush)
            .only_if(Precondition::NotCompleted(GameId::RiddleRush));

        assert!(!update.apply_to(&mut rec));
        assert_eq!(rec.level, 1);
        assert_eq!(rec.completed_games.len(), 1);
    }

    #[test]
    fn test_keyed_update_applies_once() {
        let mut rec = record();
        let update = RecordUpdate::new()
            .increment(CounterField::Level, 1)
            .increment(CounterField::GamesPlayed, 1)
            .append_completed(GameId::RiddleRush)
            .once("session-1");

        assert!(update.apply_to(&mut rec));
        assert!(!update.apply_to(&mut rec));
        assert_eq!(rec.level, 1);
        assert_eq!(rec.games_played, 1);

        let mark = rec.submission_mark("session-1").unwrap();
        assert!(mark.leveled_up);
        assert_eq!(mark.level, 1);
    }

    #[test]
    fn test_submission_marks_are_bounded() {
        let mut rec = record();
        for i in 0..RECENT_SUBMISSIONS_KEPT + 5 {
            let update = RecordUpdate::new()
                .increment(CounterField::GamesPlayed, 1)
                .once(format!("s{i}"));
            assert!(update.apply_to(&mut rec));
        }

        assert_eq!(rec.recent_submissions.len(), RECENT_SUBMISSIONS_KEPT);
        assert!(rec.submission_mark("s0").is_none());
        assert!(rec.submission_mark(&format!("s{}", RECENT_SUBMISSIONS_KEPT + 4)).is_some());
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: StoreResult<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(StoreError::Timeout(Duration::from_millis(10))));
        assert!(result.unwrap_err().is_transient());
    }
}
