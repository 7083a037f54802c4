//! Session registry.
//!
//! Drives [`SessionController`]s for signed-in players and hands finished
//! sessions to the progression engine at most once. The sessions lock is
//! never held across a store call.

use super::AppState;
use super::progress::ProgressError;
use crate::session::{
    catalog, ItemOutcome, ItemView, Response, SessionController, SessionError, SessionPhase,
    SessionSummary, Step,
};
use crate::types::{GameId, LevelResult, Principal, PrincipalId, SessionId};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayError {
    #[error("session not found")]
    SessionNotFound,

    #[error("{0} has already been completed")]
    AlreadyCompleted(GameId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Where a finished session stands with the progression engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Submission {
    /// Not yet submitted, or the last attempt failed transiently
    Pending,
    InFlight,
    Recorded(LevelResult),
    /// Rejected for a reason a resubmission cannot fix
    Failed,
}

pub struct SessionEntry {
    pub id: SessionId,
    pub owner: PrincipalId,
    pub controller: SessionController,
    pub submission: Submission,
    pub last_outcome: Option<ItemOutcome>,
    pub last_error: Option<String>,
    pub last_touched: Instant,
}

impl SessionEntry {
    fn view(&self, now: Instant) -> SessionView {
        let controller = &self.controller;
        let finished = controller.phase() == SessionPhase::Completed;
        SessionView {
            id: self.id.clone(),
            game: controller.game(),
            title: controller.definition().title.clone(),
            phase: controller.phase(),
            cursor: controller.cursor(),
            total_items: controller.definition().items.len(),
            score: controller.score(),
            item: controller.current_item(),
            remaining_secs: controller.remaining(now).map(|d| d.as_secs()),
            last_outcome: self.last_outcome.clone(),
            summary: finished.then(|| controller.summary()),
            submission: self.submission.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Finished, not recorded, and nobody is submitting it right now
    fn awaiting_submission(&self) -> bool {
        self.controller.phase() == SessionPhase::Completed && self.submission == Submission::Pending
    }
}

/// Client-facing snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub game: GameId,
    pub title: String,
    pub phase: SessionPhase,
    pub cursor: usize,
    pub total_items: usize,
    pub score: i64,
    pub item: Option<ItemView>,
    pub remaining_secs: Option<u64>,
    pub last_outcome: Option<ItemOutcome>,
    pub summary: Option<SessionSummary>,
    pub submission: Submission,
    pub last_error: Option<String>,
}

/// A completion claimed for submission
struct Claim {
    session: SessionId,
    owner: PrincipalId,
    game: GameId,
    score: u64,
}

impl AppState {
    /// Start a fresh play of `game`.
    ///
    /// Runs the completion guard and unlock check against one read of the
    /// record; a completed game is refused so the client returns to the
    /// dashboard.
    pub async fn start_session(
        &self,
        principal: &Principal,
        game: GameId,
    ) -> Result<SessionView, PlayError> {
        let record = self.find_record(&principal.id).await?;
        if record.as_ref().is_some_and(|r| r.has_completed(game)) {
            tracing::warn!(principal = %principal.id, %game, "Refusing replay start, already completed");
            return Err(PlayError::AlreadyCompleted(game));
        }
        let unlocked = record
            .as_ref()
            .map_or(game.predecessor().is_none(), |r| r.is_unlocked(game));
        if !unlocked {
            let requires = game.predecessor().unwrap_or(game);
            return Err(ProgressError::Locked { game, requires }.into());
        }

        let now = Instant::now();
        let mut controller = SessionController::new(catalog::definition(game));
        controller.start(now)?;

        let entry = SessionEntry {
            id: ulid::Ulid::new().to_string(),
            owner: principal.id.clone(),
            controller,
            submission: Submission::Pending,
            last_outcome: None,
            last_error: None,
            last_touched: now,
        };
        let view = entry.view(now);

        self.sessions.write().await.insert(entry.id.clone(), entry);
        tracing::info!(principal = %principal.id, %game, session = %view.id, "Session started");
        Ok(view)
    }

    pub async fn get_session(&self, owner: &str, id: &str) -> Result<SessionView, PlayError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(id)
            .filter(|e| e.owner == owner)
            .ok_or(PlayError::SessionNotFound)?;
        Ok(entry.view(Instant::now()))
    }

    /// Answer the current item.
    ///
    /// When this finishes the session the completion is submitted before
    /// returning; a failed submission leaves the session completed but
    /// unrecorded so the client can retry.
    pub async fn respond(
        &self,
        owner: &str,
        id: &str,
        response: Response,
    ) -> Result<SessionView, PlayError> {
        let now = Instant::now();
        let claim = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .get_mut(id)
                .filter(|e| e.owner == owner)
                .ok_or(PlayError::SessionNotFound)?;
            entry.last_touched = now;

            match entry.controller.respond(response, now)? {
                Step::Advanced(outcome) => {
                    tracing::debug!(session = id, ?outcome, "Item resolved");
                    entry.last_outcome = Some(outcome);
                    None
                }
                Step::Finished(outcome, summary) => {
                    tracing::info!(
                        session = id,
                        game = %summary.game,
                        score = summary.earned_score,
                        tier = %summary.tier,
                        "Session finished"
                    );
                    entry.last_outcome = Some(outcome);
                    claim_entry(entry)
                }
                Step::Ignored => {
                    tracing::debug!(session = id, "Response after completion ignored");
                    None
                }
            }
        };

        if let Some(claim) = claim {
            self.submit(claim).await?;
        }
        self.get_session(owner, id).await
    }

    /// Resubmit a finished session whose completion was not recorded.
    ///
    /// A session already recorded, being submitted, or failed for good is
    /// returned unchanged.
    pub async fn retry_completion(&self, owner: &str, id: &str) -> Result<SessionView, PlayError> {
        let claim = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .get_mut(id)
                .filter(|e| e.owner == owner)
                .ok_or(PlayError::SessionNotFound)?;
            entry.last_touched = Instant::now();

            if entry.controller.phase() != SessionPhase::Completed {
                return Err(SessionError::NotFinished.into());
            }
            claim_entry(entry)
        };

        if let Some(claim) = claim {
            self.submit(claim).await?;
        }
        self.get_session(owner, id).await
    }

    /// Discard a session. Unrecorded completions are dropped with a warning.
    pub async fn abandon_session(&self, owner: &str, id: &str) -> Result<(), PlayError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(entry) if entry.owner == owner => {
                if entry.awaiting_submission() {
                    tracing::warn!(session = id, "Abandoning a finished but unrecorded session");
                }
                sessions.remove(id);
                tracing::info!(session = id, "Session abandoned");
                Ok(())
            }
            _ => Err(PlayError::SessionNotFound),
        }
    }

    /// Expire overdue items and submit any completions they produced.
    ///
    /// Also retries finished sessions whose last submission failed.
    /// Returns the number of completions submitted.
    pub async fn tick_sessions(&self, now: Instant) -> usize {
        {
            let mut sessions = self.sessions.write().await;
            for entry in sessions.values_mut() {
                if let Some(step) = entry.controller.tick(now) {
                    match step {
                        Step::Advanced(outcome) => entry.last_outcome = Some(outcome),
                        Step::Finished(outcome, summary) => {
                            tracing::info!(
                                session = %entry.id,
                                game = %summary.game,
                                score = summary.earned_score,
                                "Session finished on timer"
                            );
                            entry.last_outcome = Some(outcome);
                        }
                        Step::Ignored => {}
                    }
                }
            }
        }

        let claims = self.claim_finished(None).await;
        let count = claims.len();
        self.submit_claims(claims).await;
        count
    }

    /// Drop sessions idle longer than the configured TTL.
    pub async fn evict_idle_sessions(&self, now: Instant) -> usize {
        let ttl = self.config.session_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| {
            let keep = e.submission == Submission::InFlight
                || now.saturating_duration_since(e.last_touched) <= ttl;
            if !keep && e.awaiting_submission() {
                tracing::warn!(session = %e.id, "Evicting a finished but unrecorded session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session owned by `owner`
    pub(crate) async fn drop_sessions_of(&self, owner: &str) {
        self.sessions.write().await.retain(|_, e| e.owner != owner);
    }

    /// Claim finished sessions awaiting submission (all, or just `only`)
    async fn claim_finished(&self, only: Option<&str>) -> Vec<Claim> {
        let mut sessions = self.sessions.write().await;
        sessions
            .values_mut()
            .filter(|e| only.map_or(true, |id| e.id == id))
            .filter_map(claim_entry)
            .collect()
    }

    async fn submit_claims(&self, claims: Vec<Claim>) {
        for claim in claims {
            if let Err(e) = self.submit(claim).await {
                tracing::warn!("Background completion submission failed: {}", e);
            }
        }
    }

    /// Call the progression engine for one claimed session and record the
    /// outcome on the entry.
    async fn submit(&self, claim: Claim) -> Result<LevelResult, PlayError> {
        let result = self
            .complete_submission(&claim.owner, claim.game, claim.score as i64, &claim.session)
            .await;

        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&claim.session);

        match result {
            Ok(level) => {
                if let Some(entry) = entry {
                    entry.submission = Submission::Recorded(level.clone());
                    entry.last_error = None;
                }
                Ok(level)
            }
            Err(e) => {
                let next = if e.is_transient() {
                    tracing::error!(session = %claim.session, "Completion not recorded, will retry: {}", e);
                    Submission::Pending
                } else {
                    tracing::error!(session = %claim.session, "Completion rejected: {}", e);
                    Submission::Failed
                };
                if let Some(entry) = entry {
                    entry.submission = next;
                    entry.last_error = Some(e.to_string());
                }
                Err(e.into())
            }
        }
    }
}

/// Mark a finished, pending entry as in flight and describe the submission.
fn claim_entry(entry: &mut SessionEntry) -> Option<Claim> {
    if !entry.awaiting_submission() {
        return None;
    }
    entry.submission = Submission::InFlight;
    let summary = entry.controller.summary();
    Some(Claim {
        session: entry.id.clone(),
        owner: entry.owner.clone(),
        game: summary.game,
        score: summary.earned_score,
    })
}
