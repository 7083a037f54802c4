//! Live feed messages sent over `/ws`

use serde::{Deserialize, Serialize};

use crate::state::leaderboard::{LeaderboardEntry, RankBy};
use crate::types::GameId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a fresh leaderboard in the given ordering
    Leaderboard {
        #[serde(default)]
        by: RankBy,
    },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// A player completed a game for the first time
    LevelUp {
        display_name: String,
        game: GameId,
        new_level: u32,
    },
    Leaderboard {
        by: RankBy,
        entries: Vec<LeaderboardEntry>,
    },
    Pong,
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"t":"leaderboard","by":"level"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Leaderboard { by: RankBy::Level }));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"leaderboard"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Leaderboard { by: RankBy::Score }));
    }

    #[test]
    fn test_level_up_wire_format() {
        let json = serde_json::to_value(ServerMessage::LevelUp {
            display_name: "Asha".to_string(),
            game: GameId::WhoSaidIt,
            new_level: 2,
        })
        .unwrap();
        assert_eq!(json["t"], "level_up");
        assert_eq!(json["game"], "who-said-it");
    }
}
