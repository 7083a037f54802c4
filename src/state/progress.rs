//! Completion guard and progression engine.
//!
//! The progression engine is the only writer of a record's progress fields.
//! A first completion is one conditional update (level, score, play count and
//! the completed set together, guarded on the game being absent), so two racing
//! first completions produce exactly one level-up.

use super::AppState;
use crate::protocol::ServerMessage;
use crate::session::catalog;
use crate::store::{CounterField, Precondition, RecordUpdate, StoreError, UpdateOutcome};
use crate::types::{GameId, GameTile, LevelResult, PrincipalId, ProgressSummary, UserRecord};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgressError {
    #[error("no progress record for principal {0}")]
    NotFound(PrincipalId),

    /// Transient store failure; nothing was recorded
    #[error("progress store failure: {0}")]
    Store(StoreError),

    #[error("earned score must be non-negative, got {0}")]
    InvalidScore(i64),

    #[error("{game} is locked until {requires} is completed")]
    Locked { game: GameId, requires: GameId },
}

impl ProgressError {
    /// Whether resubmitting the same completion could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ProgressError::Store(e) if e.is_transient())
    }
}

impl From<StoreError> for ProgressError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ProgressError::NotFound(id),
            other => ProgressError::Store(other),
        }
    }
}

impl AppState {
    async fn load_record(&self, principal: &str) -> Result<UserRecord, ProgressError> {
        self.store_call(self.store.get_record(principal))
            .await
            .map_err(|e| {
                if e.is_transient() {
                    tracing::error!(principal, "Progress read failed: {}", e);
                }
                ProgressError::from(e)
            })
    }

    /// The record, or `None` if the principal has none yet. Any other store
    /// failure is returned so the caller blocks play instead of guessing.
    pub(crate) async fn find_record(
        &self,
        principal: &str,
    ) -> Result<Option<UserRecord>, ProgressError> {
        match self.load_record(principal).await {
            Ok(record) => Ok(Some(record)),
            Err(ProgressError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Has `principal` already completed `game`?
    ///
    /// A missing record reads as "not completed".
    pub async fn is_completed(&self, principal: &str, game: GameId) -> Result<bool, ProgressError> {
        let record = self.find_record(principal).await?;
        Ok(record.is_some_and(|r| r.has_completed(game)))
    }

    /// Game 1 is always playable; game i needs game i-1 completed.
    pub async fn is_unlocked(&self, principal: &str, game: GameId) -> Result<bool, ProgressError> {
        let record = self.find_record(principal).await?;
        Ok(record.map_or(game.predecessor().is_none(), |r| r.is_unlocked(game)))
    }

    /// Record a finished play of `game`.
    ///
    /// First completion levels up; a replay only adds score and a play.
    /// Returns only once the store confirmed the write.
    pub async fn complete_game(
        &self,
        principal: &str,
        game: GameId,
        earned_score: i64,
    ) -> Result<LevelResult, ProgressError> {
        self.record_completion(principal, game, earned_score, None)
            .await
    }

    /// [`complete_game`](Self::complete_game) keyed by a session id, so
    /// resubmitting a write whose acknowledgement was lost counts it once.
    pub(crate) async fn complete_submission(
        &self,
        principal: &str,
        game: GameId,
        earned_score: i64,
        session: &str,
    ) -> Result<LevelResult, ProgressError> {
        self.record_completion(principal, game, earned_score, Some(session))
            .await
    }

    async fn record_completion(
        &self,
        principal: &str,
        game: GameId,
        earned_score: i64,
        session: Option<&str>,
    ) -> Result<LevelResult, ProgressError> {
        let score =
            u64::try_from(earned_score).map_err(|_| ProgressError::InvalidScore(earned_score))?;

        let record = self.load_record(principal).await?;

        if !record.has_completed(game) {
            if let Some(requires) = game.predecessor() {
                if !record.has_completed(requires) {
                    tracing::warn!(principal, %game, "Completion rejected, game is locked");
                    return Err(ProgressError::Locked { game, requires });
                }
            }

            let update = RecordUpdate::new()
                .increment(CounterField::Level, 1)
                .increment(CounterField::TotalScore, score)
                .increment(CounterField::GamesPlayed, 1)
                .append_completed(game)
                .only_if(Precondition::NotCompleted(game));

            match self.write(principal, keyed(update, session)).await? {
                UpdateOutcome::Applied(written) => {
                    tracing::info!(
                        principal,
                        %game,
                        score,
                        level = written.level,
                        "Level up"
                    );
                    self.notify(ServerMessage::LevelUp {
                        display_name: written.display_name.clone(),
                        game,
                        new_level: written.level,
                    });
                    self.publish_leaderboard().await;

                    return Ok(LevelResult {
                        leveled_up: true,
                        new_level: written.level,
                        previous_level: written.level.saturating_sub(1),
                        game,
                        score_earned: score,
                    });
                }
                UpdateOutcome::Rejected(current) => {
                    if let Some(result) = already_recorded(&current, game, score, session) {
                        return Ok(result);
                    }
                    tracing::warn!(
                        principal,
                        %game,
                        "Concurrent first completion already recorded, counting as replay"
                    );
                }
            }
        }

        self.record_replay(principal, game, score, session).await
    }

    async fn record_replay(
        &self,
        principal: &str,
        game: GameId,
        score: u64,
        session: Option<&str>,
    ) -> Result<LevelResult, ProgressError> {
        let update = RecordUpdate::new()
            .increment(CounterField::TotalScore, score)
            .increment(CounterField::GamesPlayed, 1);

        let written = match self.write(principal, keyed(update, session)).await? {
            UpdateOutcome::Applied(r) => r,
            UpdateOutcome::Rejected(current) => {
                match already_recorded(&current, game, score, session) {
                    Some(result) => return Ok(result),
                    None => current,
                }
            }
        };

        tracing::info!(principal, %game, score, "Replay recorded");
        self.publish_leaderboard().await;

        Ok(LevelResult {
            leveled_up: false,
            new_level: written.level,
            previous_level: written.level,
            game,
            score_earned: score,
        })
    }

    async fn write(
        &self,
        principal: &str,
        update: RecordUpdate,
    ) -> Result<UpdateOutcome, ProgressError> {
        self.store_call(self.store.update_fields(principal, update))
            .await
            .map_err(|e| {
                tracing::error!(principal, "Progress write failed: {}", e);
                ProgressError::from(e)
            })
    }

    pub async fn get_progress(&self, principal: &str) -> Result<ProgressSummary, ProgressError> {
        let record = self.load_record(principal).await?;
        Ok(ProgressSummary::from_record(&record))
    }

    /// Dashboard tiles in unlock order
    pub async fn game_tiles(&self, principal: &str) -> Result<Vec<GameTile>, ProgressError> {
        let record = self.load_record(principal).await?;
        Ok(GameId::ALL
            .iter()
            .map(|&game| GameTile {
                game,
                position: game.position(),
                title: catalog::title(game).to_string(),
                unlocked: record.is_unlocked(game),
                completed: record.has_completed(game),
            })
            .collect())
    }
}

fn keyed(update: RecordUpdate, session: Option<&str>) -> RecordUpdate {
    match session {
        Some(id) => update.once(id),
        None => update,
    }
}

/// The result of an earlier write for the same session, if the store has one
fn already_recorded(
    record: &UserRecord,
    game: GameId,
    score: u64,
    session: Option<&str>,
) -> Option<LevelResult> {
    let mark = record.submission_mark(session?)?;
    tracing::info!(
        principal = %record.uid,
        %game,
        session = %mark.session,
        "Submission already recorded"
    );
    Some(LevelResult {
        leveled_up: mark.leveled_up,
        new_level: mark.level,
        previous_level: if mark.leveled_up {
            mark.level.saturating_sub(1)
        } else {
            mark.level
        },
        game,
        score_earned: score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Principal;

    async fn state_with_player(id: &str) -> AppState {
        let state = AppState::default();
        let principal = Principal {
            id: id.to_string(),
            email: format!("{id}@fest.edu"),
            display_name: "Asha".to_string(),
        };
        state
            .store
            .create_record(UserRecord::new(&principal))
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_first_completion_then_replay() {
        let state = state_with_player("p1").await;

        let first = state.complete_game("p1", GameId::RiddleRush, 82).await.unwrap();
        assert!(first.leveled_up);
        assert_eq!(first.new_level, 1);

        let record = state.store.get_record("p1").await.unwrap();
        assert_eq!(record.total_score, 82);
        assert_eq!(record.games_played, 1);
        assert!(record.has_completed(GameId::RiddleRush));

        let replay = state.complete_game("p1", GameId::RiddleRush, 40).await.unwrap();
        assert!(!replay.leveled_up);
        assert_eq!(replay.new_level, 1);

        let record = state.store.get_record("p1").await.unwrap();
        assert_eq!(record.level, 1);
        assert_eq!(record.total_score, 122);
        assert_eq!(record.games_played, 2);
        assert_eq!(record.completed_games.len(), 1);
    }

    #[tokio::test]
    async fn test_resubmitted_session_counts_once() {
        let state = state_with_player("p1").await;

        let first = state
            .complete_submission("p1", GameId::RiddleRush, 30, "s1")
            .await
            .unwrap();
        let again = state
            .complete_submission("p1", GameId::RiddleRush, 30, "s1")
            .await
            .unwrap();
        assert_eq!(first, again);
        assert!(again.leveled_up);

        // A different session is a genuine replay
        let replay = state
            .complete_submission("p1", GameId::RiddleRush, 5, "s2")
            .await
            .unwrap();
        assert!(!replay.leveled_up);

        let record = state.store.get_record("p1").await.unwrap();
        assert_eq!(record.level, 1);
        assert_eq!(record.games_played, 2);
        assert_eq!(record.total_score, 35);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let state = AppState::default();
        assert_eq!(
            state.complete_game("ghost", GameId::RiddleRush, 10).await,
            Err(ProgressError::NotFound("ghost".to_string()))
        );
        // The guard treats a missing record as "not completed"
        assert_eq!(state.is_completed("ghost", GameId::RiddleRush).await, Ok(false));
    }

    #[tokio::test]
    async fn test_negative_score_rejected_before_store() {
        let state = AppState::default();
        assert_eq!(
            state.complete_game("ghost", GameId::RiddleRush, -3).await,
            Err(ProgressError::InvalidScore(-3))
        );
    }

    #[tokio::test]
    async fn test_locked_game_rejected() {
        let state = state_with_player("p1").await;
        assert_eq!(
            state.complete_game("p1", GameId::TruthDare, 100).await,
            Err(ProgressError::Locked {
                game: GameId::TruthDare,
                requires: GameId::WhoSaidIt
            })
        );
        let record = state.store.get_record("p1").await.unwrap();
        assert_eq!(record.games_played, 0);
    }

    #[tokio::test]
    async fn test_tiles_follow_progress() {
        let state = state_with_player("p1").await;
        state.complete_game("p1", GameId::RiddleRush, 50).await.unwrap();

        let tiles = state.game_tiles("p1").await.unwrap();
        assert_eq!(tiles.len(), 5);
        assert!(tiles[0].completed && tiles[0].unlocked);
        assert!(!tiles[1].completed && tiles[1].unlocked);
        assert!(!tiles[2].unlocked);

        let progress = state.get_progress("p1").await.unwrap();
        assert_eq!(progress.remaining_count, 4);
        assert!((progress.progress_percent - 20.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_level_up_is_broadcast() {
        let state = state_with_player("p1").await;
        let mut rx = state.live_broadcast.subscribe();

        state.complete_game("p1", GameId::RiddleRush, 10).await.unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::LevelUp { game, new_level, .. } => {
                assert_eq!(game, GameId::RiddleRush);
                assert_eq!(new_level, 1);
            }
            other => panic!("expected level up, got {:?}", other),
        }
    }
}
