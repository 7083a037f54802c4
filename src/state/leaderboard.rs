use super::AppState;
use crate::protocol::ServerMessage;
use crate::store::StoreError;
use crate::types::UserRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Number of entries shown on the leaderboard
pub const LEADERBOARD_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    #[default]
    Score,
    Level,
    Games,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub uid: String,
    pub display_name: String,
    pub total_score: u64,
    pub level: u32,
    pub games_played: u64,
}

/// Order records for display. Ties fall back to score, then name.
pub fn rank(mut records: Vec<UserRecord>, by: RankBy, limit: usize) -> Vec<LeaderboardEntry> {
    records.sort_by_key(|r| {
        let primary = match by {
            RankBy::Score => r.total_score,
            RankBy::Level => r.level as u64,
            RankBy::Games => r.games_played,
        };
        (Reverse(primary), Reverse(r.total_score), r.display_name.to_lowercase())
    });

    records
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            uid: r.uid,
            display_name: r.display_name,
            total_score: r.total_score,
            level: r.level,
            games_played: r.games_played,
        })
        .collect()
}

impl AppState {
    /// Whether a record is the admin account and should stay off public lists
    pub(crate) fn is_admin_record(&self, record: &UserRecord) -> bool {
        record.is_admin || self.config.is_admin_email(&record.email)
    }

    pub async fn leaderboard(&self, by: RankBy) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let records: Vec<UserRecord> = self
            .store_call(self.store.list_records())
            .await?
            .into_iter()
            .filter(|r| !self.is_admin_record(r))
            .collect();

        Ok(rank(records, by, LEADERBOARD_SIZE))
    }

    /// Push the score leaderboard to live feed clients.
    ///
    /// Best effort: a failed read is logged and skipped.
    pub async fn publish_leaderboard(&self) {
        if self.live_broadcast.receiver_count() == 0 {
            return;
        }
        match self.leaderboard(RankBy::Score).await {
            Ok(entries) => self.notify(ServerMessage::Leaderboard {
                by: RankBy::Score,
                entries,
            }),
            Err(e) => tracing::warn!("Skipping leaderboard broadcast: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::types::Principal;

    fn record(id: &str, score: u64, level: u32, played: u64) -> UserRecord {
        let mut r = UserRecord::new(&Principal {
            id: id.to_string(),
            email: format!("{id}@fest.edu"),
            display_name: id.to_string(),
        });
        r.total_score = score;
        r.level = level;
        r.games_played = played;
        r
    }

    #[test]
    fn test_rank_orderings() {
        let records = vec![
            record("ana", 300, 2, 9),
            record("bo", 500, 1, 3),
            record("cy", 200, 4, 4),
        ];

        let by_score: Vec<_> = rank(records.clone(), RankBy::Score, 20)
            .into_iter()
            .map(|e| e.uid)
            .collect();
        assert_eq!(by_score, vec!["bo", "ana", "cy"]);

        let by_level = rank(records.clone(), RankBy::Level, 20);
        assert_eq!(by_level[0].uid, "cy");
        assert_eq!(by_level[0].rank, 1);

        let by_games = rank(records, RankBy::Games, 2);
        assert_eq!(by_games.len(), 2);
        assert_eq!(by_games[0].uid, "ana");
    }

    #[test]
    fn test_entry_carries_only_populated_fields() {
        let entry = rank(vec![record("ana", 300, 2, 9)], RankBy::Score, 20).remove(0);
        let json = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["display_name", "games_played", "level", "rank", "total_score", "uid"]
        );
    }

    #[test]
    fn test_ties_break_on_score() {
        let records = vec![record("low", 10, 3, 1), record("high", 90, 3, 1)];
        let ranked = rank(records, RankBy::Level, 20);
        assert_eq!(ranked[0].uid, "high");
    }

    #[tokio::test]
    async fn test_admin_excluded() {
        let config = AppConfig {
            admin_email: Some("boss@fest.edu".to_string()),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.store.create_record(record("boss", 9999, 5, 50)).await.unwrap();
        state.store.create_record(record("ana", 10, 1, 1)).await.unwrap();

        let board = state.leaderboard(RankBy::Score).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].uid, "ana");
    }
}
