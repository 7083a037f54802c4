//! User records outside the progression engine: login-time creation,
//! profile reads and the admin console views.

use super::AppState;
use crate::store::StoreError;
use crate::types::{Principal, UserRecord, TOTAL_GAMES};
use serde::Serialize;

/// Aggregate numbers for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_users: usize,
    /// Sum of every player's plays, replays included
    pub total_games_played: u64,
    pub total_events: usize,
    pub active_sessions: usize,
    /// `players_at_level[n]` is the number of players at level n
    pub players_at_level: Vec<usize>,
}

impl AppState {
    /// Create the principal's record with zeroed progress if it does not
    /// exist yet, then return the stored record.
    pub async fn ensure_user_record(&self, principal: &Principal) -> Result<UserRecord, StoreError> {
        let mut fresh = UserRecord::new(principal);
        fresh.is_admin = self.config.is_admin_email(&principal.email);

        if self.store_call(self.store.create_record(fresh)).await? {
            tracing::info!(principal = %principal.id, "Created user record");
        }
        self.store_call(self.store.get_record(&principal.id)).await
    }

    pub async fn profile(&self, principal: &str) -> Result<UserRecord, StoreError> {
        self.store_call(self.store.get_record(principal)).await
    }

    /// Every non-admin record, newest first
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users: Vec<UserRecord> = self
            .store_call(self.store.list_records())
            .await?
            .into_iter()
            .filter(|r| !self.is_admin_record(r))
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Remove a user record and any sessions it owns. Returns false if
    /// there was nothing to delete.
    pub async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.store_call(self.store.delete_record(id)).await?;
        if deleted {
            self.drop_sessions_of(id).await;
            tracing::warn!(principal = id, "User record deleted by admin");
        }
        Ok(deleted)
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, StoreError> {
        let users = self.list_users().await?;
        let events = self.store_call(self.store.list_events()).await?;

        let mut players_at_level = vec![0; TOTAL_GAMES + 1];
        for user in &users {
            let level = (user.level as usize).min(TOTAL_GAMES);
            players_at_level[level] += 1;
        }

        Ok(AdminStats {
            total_users: users.len(),
            total_games_played: users.iter().map(|u| u.games_played).sum(),
            total_events: events.len(),
            active_sessions: self.active_session_count().await,
            players_at_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::types::GameId;

    fn principal(id: &str, email: &str) -> Principal {
        Principal {
            id: id.to_string(),
            email: email.to_string(),
            display_name: id.to_uppercase(),
        }
    }

    #[tokio::test]
    async fn test_ensure_record_keeps_existing_progress() {
        let state = AppState::default();
        let p = principal("p1", "p1@fest.edu");

        let created = state.ensure_user_record(&p).await.unwrap();
        assert_eq!(created.level, 0);

        state.complete_game("p1", GameId::RiddleRush, 30).await.unwrap();

        let again = state.ensure_user_record(&p).await.unwrap();
        assert_eq!(again.level, 1);
        assert_eq!(again.total_score, 30);
    }

    #[tokio::test]
    async fn test_admin_flagged_and_hidden() {
        let state = AppState::new(AppConfig {
            admin_email: Some("boss@fest.edu".to_string()),
            ..AppConfig::default()
        });
        let admin = state
            .ensure_user_record(&principal("boss", "Boss@Fest.edu"))
            .await
            .unwrap();
        assert!(admin.is_admin);

        state
            .ensure_user_record(&principal("p1", "p1@fest.edu"))
            .await
            .unwrap();

        let users = state.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].uid, "p1");
    }

    #[tokio::test]
    async fn test_stats_and_delete() {
        let state = AppState::default();
        state
            .ensure_user_record(&principal("p1", "p1@fest.edu"))
            .await
            .unwrap();
        state
            .ensure_user_record(&principal("p2", "p2@fest.edu"))
            .await
            .unwrap();
        state.complete_game("p1", GameId::RiddleRush, 30).await.unwrap();
        state.complete_game("p1", GameId::RiddleRush, 30).await.unwrap();

        let stats = state.admin_stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_games_played, 2);
        assert_eq!(stats.players_at_level, vec![1, 1, 0, 0, 0, 0]);

        assert!(state.delete_user("p2").await.unwrap());
        assert!(!state.delete_user("p2").await.unwrap());
        assert_eq!(state.admin_stats().await.unwrap().total_users, 1);
    }
}
