//! Sequential-challenge session engine
//!
//! All five games share one state machine: `NotStarted -> Running -> Completed`
//! with a cursor over a fixed item list. Games differ only in their
//! [`GameDefinition`] (items, scoring constants, completion threshold, timer).
//!
//! The controller is synchronous and takes `now` explicitly; the async
//! registry in `state::session` owns persistence and timers.

pub mod catalog;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::types::GameId;

/// Errors raised by an individual session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("session has not been started")]
    NotRunning,

    #[error("session has not finished yet")]
    NotFinished,

    #[error("session already started")]
    AlreadyStarted,

    #[error("response does not fit the current item")]
    ResponseMismatch,

    #[error("choice {0} is out of range")]
    InvalidChoice(usize),

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("this game does not allow skipping")]
    SkipNotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Truth,
    Dare,
}

/// One question, clue, or challenge
#[derive(Debug, Clone, PartialEq)]
pub enum Challenge {
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        correct: usize,
    },
    Typed {
        prompt: String,
        hint: Option<String>,
        answer: String,
    },
    TruthOrDare {
        truth: String,
        dare: String,
    },
}

impl Challenge {
    /// Client-facing view; never includes the answer.
    pub fn view(&self) -> ItemView {
        match self {
            Challenge::MultipleChoice { prompt, options, .. } => ItemView::MultipleChoice {
                prompt: prompt.clone(),
                options: options.clone(),
            },
            Challenge::Typed { prompt, hint, .. } => ItemView::Typed {
                prompt: prompt.clone(),
                hint: hint.clone(),
            },
            Challenge::TruthOrDare { truth, dare } => ItemView::TruthOrDare {
                truth: truth.clone(),
                dare: dare.clone(),
            },
        }
    }

    fn answer_text(&self) -> String {
        match self {
            Challenge::MultipleChoice {
                options, correct, ..
            } => options.get(*correct).cloned().unwrap_or_default(),
            Challenge::Typed { answer, .. } => answer.clone(),
            Challenge::TruthOrDare { .. } => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemView {
    MultipleChoice { prompt: String, options: Vec<String> },
    Typed { prompt: String, hint: Option<String> },
    TruthOrDare { truth: String, dare: String },
}

/// A player's response to the current item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Select { index: usize },
    Answer { text: String },
    Acknowledge { pick: ChallengeKind },
    Skip,
}

/// Typed answers compare after trimming and upper-casing.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Per-game scoring constants
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRule {
    pub per_correct: i64,
    /// Subtracted on a wrong answer or a timeout
    pub per_incorrect: i64,
    /// One bonus point per this many seconds left on the item timer
    pub time_bonus_step: Option<u64>,
    /// Flat award added on completion
    pub completion_bonus: i64,
}

/// Result title chosen by percentage correct
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub min_percent: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameDefinition {
    pub game: GameId,
    pub title: String,
    pub items: Vec<Challenge>,
    pub scoring: ScoringRule,
    /// Finish once this many items were answered correctly
    pub completion_threshold: Option<usize>,
    pub item_timer: Option<Duration>,
    pub allow_skip: bool,
    /// Sorted by `min_percent` descending; the last entry should be 0.
    pub tiers: Vec<Tier>,
}

impl GameDefinition {
    pub fn tier_for(&self, percent: u32) -> String {
        self.tiers
            .iter()
            .find(|t| percent >= t.min_percent)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    Running,
    Completed,
}

/// What happened to the item that was just resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    Correct { awarded: i64, time_bonus: i64 },
    Incorrect { penalty: i64, correct_answer: String },
    TimedOut { penalty: i64, correct_answer: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub game: GameId,
    /// Running score, may be negative for penalty games
    pub raw_score: i64,
    /// Score handed to the progression engine (never negative)
    pub earned_score: u64,
    pub correct: u32,
    pub incorrect: u32,
    pub skipped: u32,
    pub time_bonus: i64,
    pub total_items: usize,
    pub percent_correct: u32,
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Advanced(ItemOutcome),
    Finished(ItemOutcome, SessionSummary),
    /// The session was already completed; nothing changed
    Ignored,
}

enum Verdict {
    Answered(bool),
    Skip,
}

pub struct SessionController {
    definition: GameDefinition,
    phase: SessionPhase,
    cursor: usize,
    score: i64,
    correct: u32,
    incorrect: u32,
    skipped: u32,
    time_bonus: i64,
    deadline: Option<Instant>,
}

impl SessionController {
    pub fn new(definition: GameDefinition) -> Self {
        Self {
            definition,
            phase: SessionPhase::NotStarted,
            cursor: 0,
            score: 0,
            correct: 0,
            incorrect: 0,
            skipped: 0,
            time_bonus: 0,
            deadline: None,
        }
    }

    pub fn game(&self) -> GameId {
        self.definition.game
    }

    pub fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Seconds left on the current item timer, if any
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn start(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = SessionPhase::Running;
        self.cursor = 0;
        self.score = 0;
        self.correct = 0;
        self.incorrect = 0;
        self.skipped = 0;
        self.time_bonus = 0;
        self.arm_timer(now);

        if self.definition.items.is_empty() {
            // Degenerate definition: nothing to play
            self.phase = SessionPhase::Completed;
            self.deadline = None;
        }
        Ok(())
    }

    pub fn current_item(&self) -> Option<ItemView> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        self.definition.items.get(self.cursor).map(Challenge::view)
    }

    pub fn respond(&mut self, response: Response, now: Instant) -> Result<Step, SessionError> {
        match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotRunning),
            SessionPhase::Completed => return Ok(Step::Ignored),
            SessionPhase::Running => {}
        }

        if self.is_expired(now) {
            return Ok(self.resolve_timeout(now));
        }

        let outcome = match self.evaluate(&response)? {
            Verdict::Skip => {
                self.skipped += 1;
                ItemOutcome::Skipped
            }
            Verdict::Answered(hit) => self.score_answer(hit, now),
        };

        Ok(self.advance(outcome, now))
    }

    /// Expire the current item if its timer has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<Step> {
        if self.phase == SessionPhase::Running && self.is_expired(now) {
            Some(self.resolve_timeout(now))
        } else {
            None
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let total_items = self.definition.items.len();
        let percent_correct = if total_items == 0 {
            0
        } else {
            (self.correct as usize * 100 / total_items) as u32
        };

        SessionSummary {
            game: self.definition.game,
            raw_score: self.score,
            earned_score: self.score.max(0) as u64,
            correct: self.correct,
            incorrect: self.incorrect,
            skipped: self.skipped,
            time_bonus: self.time_bonus,
            total_items,
            percent_correct,
            tier: self.definition.tier_for(percent_correct),
        }
    }

    fn evaluate(&self, response: &Response) -> Result<Verdict, SessionError> {
        let item = &self.definition.items[self.cursor];
        match (item, response) {
            (_, Response::Skip) if self.definition.allow_skip => Ok(Verdict::Skip),
            (_, Response::Skip) => Err(SessionError::SkipNotAllowed),
            (Challenge::MultipleChoice { options, correct, .. }, Response::Select { index }) => {
                if *index >= options.len() {
                    return Err(SessionError::InvalidChoice(*index));
                }
                Ok(Verdict::Answered(index == correct))
            }
            (Challenge::Typed { answer, .. }, Response::Answer { text }) => {
                let given = normalize_answer(text);
                if given.is_empty() {
                    return Err(SessionError::EmptyAnswer);
                }
                Ok(Verdict::Answered(given == normalize_answer(answer)))
            }
            (Challenge::TruthOrDare { .. }, Response::Acknowledge { .. }) => {
                Ok(Verdict::Answered(true))
            }
            _ => Err(SessionError::ResponseMismatch),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    fn arm_timer(&mut self, now: Instant) {
        self.deadline = self.definition.item_timer.map(|t| now + t);
    }

    fn score_answer(&mut self, hit: bool, now: Instant) -> ItemOutcome {
        let ScoringRule {
            per_correct,
            per_incorrect,
            time_bonus_step,
            ..
        } = self.definition.scoring;
        if hit {
            let bonus = match (time_bonus_step, self.remaining(now)) {
                (Some(step), Some(left)) if step > 0 => (left.as_secs() / step) as i64,
                _ => 0,
            };
            self.correct += 1;
            self.time_bonus += bonus;
            self.score += per_correct + bonus;
            ItemOutcome::Correct {
                awarded: per_correct,
                time_bonus: bonus,
            }
        } else {
            self.incorrect += 1;
            self.score -= per_incorrect;
            ItemOutcome::Incorrect {
                penalty: per_incorrect,
                correct_answer: self.definition.items[self.cursor].answer_text(),
            }
        }
    }

    fn resolve_timeout(&mut self, now: Instant) -> Step {
        let penalty = self.definition.scoring.per_incorrect;
        let correct_answer = self.definition.items[self.cursor].answer_text();
        self.incorrect += 1;
        self.score -= penalty;
        self.advance(
            ItemOutcome::TimedOut {
                penalty,
                correct_answer,
            },
            now,
        )
    }

    fn advance(&mut self, outcome: ItemOutcome, now: Instant) -> Step {
        self.cursor += 1;

        let threshold_met = self
            .definition
            .completion_threshold
            .is_some_and(|n| self.correct as usize >= n);

        if threshold_met || self.cursor >= self.definition.items.len() {
            self.phase = SessionPhase::Completed;
            self.deadline = None;
            self.score += self.definition.scoring.completion_bonus;
            Step::Finished(outcome, self.summary())
        } else {
            self.arm_timer(now);
            Step::Advanced(outcome)
        }
    }
}
