use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;

use exam_core::Clock;
use exam_core::gate::GateOutcome;
use exam_core::model::{Level, SessionId, SessionPhase, SessionResult, Skill};
use storage::repository::{DraftRecord, DraftRepository};

use super::aggregate::ResultAggregator;
use super::controller::{ExamSessionController, PartTransition, TickOutcome};
use crate::clock::{Tick, TickClock};
use crate::error::{SessionError, StartSessionError, SubmitError};
use crate::provider::PartProvider;
use crate::scorer::Scorer;

/// Default autosave cadence, in ticks (seconds).
pub const DEFAULT_AUTOSAVE_INTERVAL: u32 = 10;

/// Orchestrates session start/resume, tick-driven persistence, and
/// submission.
///
/// Stateless itself; per-session state lives in the
/// [`ExamSessionController`] passed into each call. Draft writes triggered
/// by a transition are awaited before the transition is reported, so a
/// crash right after never loses the just-completed part's final content.
/// Autosaves are best-effort: a failed save is logged and retried on the
/// next autosave tick, never surfaced to the user.
#[derive(Clone)]
pub struct ExamFlowService {
    clock: Clock,
    provider: Arc<dyn PartProvider>,
    drafts: Arc<dyn DraftRepository>,
    scorer: Arc<dyn Scorer>,
    autosave_interval: u32,
}

impl ExamFlowService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn PartProvider>,
        drafts: Arc<dyn DraftRepository>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            clock: Clock::default_clock(),
            provider,
            drafts,
            scorer,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_autosave_interval(mut self, ticks: u32) -> Self {
        self.autosave_interval = ticks;
        self
    }

    /// Start a new session using the skill's default advance policy.
    ///
    /// # Errors
    ///
    /// Returns `StartSessionError` for provider failures or an empty part
    /// sequence.
    pub async fn start_session(
        &self,
        skill: Skill,
        level: Level,
    ) -> Result<ExamSessionController, StartSessionError> {
        self.start_session_with_policy(skill, level, skill.default_auto_advance())
            .await
    }

    /// Start a new session with an explicit advance policy.
    ///
    /// # Errors
    ///
    /// Returns `StartSessionError` for provider failures or an empty part
    /// sequence.
    pub async fn start_session_with_policy(
        &self,
        skill: Skill,
        level: Level,
        auto_advance: bool,
    ) -> Result<ExamSessionController, StartSessionError> {
        let parts = self.provider.parts(skill, level).await?;
        let serial = rand::rng().random_range(0..1000);
        let id = SessionId::generate(skill, level, self.clock.now(), serial);
        let mut session = ExamSessionController::new(id, skill, level, parts, auto_advance)?;
        session.start()?;
        Ok(session)
    }

    /// Resume a previously started session from its persisted drafts.
    ///
    /// # Errors
    ///
    /// Returns `StartSessionError` for provider or storage failures.
    pub async fn resume_session(
        &self,
        id: SessionId,
    ) -> Result<ExamSessionController, StartSessionError> {
        let skill = id.skill();
        let level = id.level();
        let parts = self.provider.parts(skill, level).await?;

        let mut drafts = Vec::with_capacity(parts.len());
        for index in 0..parts.len() {
            let part_index = u32::try_from(index).unwrap_or(u32::MAX);
            let record = self.drafts.load(&id, part_index).await?;
            drafts.push(record.map(|r| r.content));
        }

        let auto_advance = skill.default_auto_advance();
        let mut session = ExamSessionController::new(id, skill, level, parts, auto_advance)?;
        session.resume(drafts)?;
        Ok(session)
    }

    /// Route one clock tick into the session.
    ///
    /// Persists the completed part on a transition, and autosaves the
    /// active part (plus any earlier failed saves) every
    /// `autosave_interval` ticks.
    pub async fn handle_tick(&self, session: &mut ExamSessionController) -> TickOutcome {
        let outcome = session.handle_tick();
        match outcome {
            TickOutcome::Running { elapsed, .. }
                if self.autosave_interval > 0 && elapsed % self.autosave_interval == 0 =>
            {
                self.autosave(session).await;
            }
            TickOutcome::PartCompleted(transition) => {
                self.save_part(session, transition.completed_index).await;
            }
            _ => {}
        }
        outcome
    }

    /// Complete the active part early. The part's final content is saved
    /// before the transition is reported.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when called outside a running session; a stop
    /// racing an expiry is `Ok(None)`.
    pub async fn stop_current_part(
        &self,
        session: &mut ExamSessionController,
    ) -> Result<Option<PartTransition>, SessionError> {
        let transition = session.stop_current_part()?;
        if let Some(transition) = transition {
            self.save_part(session, transition.completed_index).await;
        }
        Ok(transition)
    }

    /// Redo a completed part and overwrite its draft, so a later resume
    /// cannot resurrect the discarded content.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for an illegal redo target.
    pub async fn redo_part(
        &self,
        session: &mut ExamSessionController,
        index: usize,
    ) -> Result<(), SessionError> {
        session.redo_part(index)?;
        self.save_part(session, index).await;
        Ok(())
    }

    /// Submit the session: gate check, artifact aggregation, scorer call.
    ///
    /// # Errors
    ///
    /// A gate failure reports the first failing part and leaves the session
    /// editable; a scorer failure reverts the phase so submission can be
    /// retried without data loss.
    pub async fn submit(
        &self,
        session: &mut ExamSessionController,
    ) -> Result<SessionResult, SubmitError> {
        session.begin_submit()?;

        if let GateOutcome::NotReady { part_index, reason } = session.evaluate_gate() {
            session.fail_submit();
            return Err(SubmitError::Gate { part_index, reason });
        }

        let aggregator = ResultAggregator::new(Arc::clone(&self.scorer));
        match aggregator.aggregate(session).await {
            Ok(result) => {
                session.complete_submit();
                if let Err(e) = self.drafts.clear(session.id()).await {
                    log::warn!("failed to clear drafts for {}: {e}", session.id());
                }
                Ok(result)
            }
            Err(e) => {
                session.fail_submit();
                Err(SubmitError::Scorer(e))
            }
        }
    }

    async fn autosave(&self, session: &mut ExamSessionController) {
        let mut targets = session.take_unsaved();
        if let Some(active) = session.active_part()
            && !targets.contains(&active)
        {
            targets.push(active);
        }
        for index in targets {
            self.save_part(session, index).await;
        }
    }

    async fn save_part(&self, session: &mut ExamSessionController, index: usize) {
        let Some(state) = session.part_state(index) else {
            return;
        };
        let record = DraftRecord {
            session_id: session.id().clone(),
            part_index: u32::try_from(index).unwrap_or(u32::MAX),
            content: state.content().clone(),
            saved_at: self.clock.now(),
        };
        if let Err(e) = self.drafts.save(&record).await {
            log::warn!(
                "draft save failed for {} part {index}: {e}; retrying on next autosave",
                session.id()
            );
            session.note_unsaved(index);
        }
    }
}

/// Owns a clock subscription for one session run.
///
/// Forwards every tick into [`ExamFlowService::handle_tick`]. The clock is
/// stopped when the driver is dropped, so abandoning a session mid-part
/// never leaves a timer firing into a disposed controller.
pub struct ClockDriver<'a> {
    clock: &'a dyn TickClock,
    ticks: mpsc::UnboundedReceiver<Tick>,
}

impl<'a> ClockDriver<'a> {
    /// Start the clock and take over its subscription.
    #[must_use]
    pub fn start(clock: &'a dyn TickClock) -> Self {
        Self {
            ticks: clock.start(),
            clock,
        }
    }

    /// Forward ticks into the session until it leaves `InProgress` or the
    /// subscription closes. The clock is stopped on return.
    pub async fn run(mut self, flow: &ExamFlowService, session: &mut ExamSessionController) {
        while session.phase() == SessionPhase::InProgress {
            if self.ticks.recv().await.is_none() {
                break;
            }
            flow.handle_tick(session).await;
        }
    }
}

impl Drop for ClockDriver<'_> {
    fn drop(&mut self) {
        self.clock.stop();
    }
}
