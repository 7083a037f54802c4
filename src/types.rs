use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for type safety
pub type PrincipalId = String;
pub type SessionId = String;
pub type EventId = String;

/// Number of games in the fest sequence
pub const TOTAL_GAMES: usize = 5;

/// How many recorded session submissions a record remembers
pub const RECENT_SUBMISSIONS_KEPT: usize = 20;

/// The five games, in unlock order.
///
/// Ordering is total: a game unlocks only once its predecessor is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameId {
    RiddleRush,
    WhoSaidIt,
    TruthDare,
    WordScramble,
    TreasureHunt,
}

impl GameId {
    pub const ALL: [GameId; TOTAL_GAMES] = [
        GameId::RiddleRush,
        GameId::WhoSaidIt,
        GameId::TruthDare,
        GameId::WordScramble,
        GameId::TreasureHunt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameId::RiddleRush => "riddle-rush",
            GameId::WhoSaidIt => "who-said-it",
            GameId::TruthDare => "truth-dare",
            GameId::WordScramble => "word-scramble",
            GameId::TreasureHunt => "treasure-hunt",
        }
    }

    /// 1-based position in the unlock sequence
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|g| g == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// The game that must be completed before this one unlocks
    pub fn predecessor(&self) -> Option<GameId> {
        match self.position() {
            0 | 1 => None,
            n => Some(Self::ALL[n - 2]),
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game identifier: {0}")]
pub struct UnknownGame(pub String);

impl FromStr for GameId {
    type Err = UnknownGame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGame(s.to_string()))
    }
}

/// An authenticated user as seen by the core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
}

/// Per-principal progress document.
///
/// `level` tracks the number of completed games; the progression engine is
/// the only writer of the progress fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
    #[serde(default)]
    pub total_score: u64,
    #[serde(default)]
    pub games_played: u64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub completed_games: BTreeSet<GameId>,
    #[serde(default)]
    pub is_admin: bool,
    /// Sessions already recorded against this record, oldest first
    #[serde(default)]
    pub recent_submissions: Vec<SubmissionMark>,
}

/// A session submission the store has applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMark {
    pub session: SessionId,
    pub leveled_up: bool,
    /// Level right after the submission was applied
    pub level: u32,
}

impl UserRecord {
    /// Fresh record with zeroed progress, as created at first login
    pub fn new(principal: &Principal) -> Self {
        Self {
            uid: principal.id.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.trim().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            total_score: 0,
            games_played: 0,
            level: 0,
            completed_games: BTreeSet::new(),
            is_admin: false,
            recent_submissions: Vec::new(),
        }
    }

    pub fn submission_mark(&self, session: &str) -> Option<&SubmissionMark> {
        self.recent_submissions.iter().find(|m| m.session == session)
    }

    pub fn has_completed(&self, game: GameId) -> bool {
        self.completed_games.contains(&game)
    }

    /// Game 1 is always unlocked; game i needs game i-1 completed.
    pub fn is_unlocked(&self, game: GameId) -> bool {
        match game.predecessor() {
            None => true,
            Some(prev) => self.has_completed(prev),
        }
    }
}

/// A fest event shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub name: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: chrono::NaiveDate,
    /// Free-form time as entered by the admin ("10:00 AM", "14:30")
    pub time: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
}

impl EventRecord {
    /// Start of the event; unparseable times fall back to 10:00.
    pub fn starts_at(&self) -> chrono::NaiveDateTime {
        let time = parse_event_time(&self.time)
            .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default());
        self.date.and_time(time)
    }
}

fn parse_event_time(raw: &str) -> Option<chrono::NaiveTime> {
    let raw = raw.trim();
    ["%I:%M %p", "%I:%M%p", "%H:%M"]
        .iter()
        .find_map(|fmt| chrono::NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Outcome of a completion call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelResult {
    pub leveled_up: bool,
    pub new_level: u32,
    pub previous_level: u32,
    pub game: GameId,
    pub score_earned: u64,
}

/// Read-only progress view for dashboard and profile pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressSummary {
    pub level: u32,
    pub completed_games: Vec<GameId>,
    pub total_games: usize,
    pub progress_percent: f64,
    pub remaining_count: usize,
}

impl ProgressSummary {
    pub fn from_record(record: &UserRecord) -> Self {
        let completed = record.completed_games.len();
        Self {
            level: record.level,
            completed_games: record.completed_games.iter().copied().collect(),
            total_games: TOTAL_GAMES,
            progress_percent: completed as f64 / TOTAL_GAMES as f64 * 100.0,
            remaining_count: TOTAL_GAMES.saturating_sub(completed),
        }
    }
}

/// Dashboard tile state for one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameTile {
    pub game: GameId,
    pub position: usize,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
}
