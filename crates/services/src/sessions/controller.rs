use std::fmt;

use exam_core::gate::{self, GateOutcome};
use exam_core::model::{
    Level, PartConstraint, PartContent, PartRuntimeState, PartSpec, SessionId, SessionPhase, Skill,
};

use super::progress::SessionProgress;
use super::timer::{PartTimer, TimerEvent};
use crate::error::SessionError;

//
// ─── TRANSITION EVENTS ─────────────────────────────────────────────────────────
//

/// What follows a completed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPart {
    /// Auto-advance activated this index; its timer is already running.
    Activated(usize),
    /// Manual-advance policy: this index waits for `start_part`.
    AwaitingStart(usize),
    /// Every part is complete.
    AllComplete,
}

/// A part transition, reported so the persistence layer can write the
/// completed part's final content before anything else observes the new
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartTransition {
    pub completed_index: usize,
    pub next: NextPart,
}

/// Outcome of routing one clock tick into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is counting down.
    Idle,
    /// The active part consumed one second of its budget.
    Running {
        part_index: usize,
        elapsed: u32,
        remaining: u32,
    },
    /// The active part's budget expired on this tick.
    PartCompleted(PartTransition),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// State machine for one timed exam session.
///
/// Owns the session exclusively for its lifetime: parts are immutable once
/// the session starts, exactly one part is active while in progress, and
/// the furthest-activated index never decreases. Driven from outside by
/// clock ticks and explicit user transitions.
pub struct ExamSessionController {
    id: SessionId,
    skill: Skill,
    level: Level,
    auto_advance: bool,
    parts: Vec<PartSpec>,
    states: Vec<Option<PartRuntimeState>>,
    furthest: usize,
    active: Option<usize>,
    timer: Option<PartTimer>,
    phase: SessionPhase,
    submit_pending: bool,
    unsaved: Vec<usize>,
}

impl ExamSessionController {
    /// Create a session over an ordered, validated part sequence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no parts are provided.
    pub fn new(
        id: SessionId,
        skill: Skill,
        level: Level,
        parts: Vec<PartSpec>,
        auto_advance: bool,
    ) -> Result<Self, SessionError> {
        if parts.is_empty() {
            return Err(SessionError::Empty);
        }
        let states = vec![None; parts.len()];
        Ok(Self {
            id,
            skill,
            level,
            auto_advance,
            parts,
            states,
            furthest: 0,
            active: None,
            timer: None,
            phase: SessionPhase::NotStarted,
            submit_pending: false,
            unsaved: Vec::new(),
        })
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn skill(&self) -> Skill {
        self.skill
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn parts(&self) -> &[PartSpec] {
        &self.parts
    }

    #[must_use]
    pub fn part_state(&self, index: usize) -> Option<&PartRuntimeState> {
        self.states.get(index).and_then(Option::as_ref)
    }

    /// Index of the part currently open for input, if any.
    #[must_use]
    pub fn active_part(&self) -> Option<usize> {
        self.active
    }

    /// The part currently open for input, or the furthest part reached.
    /// Monotonically non-decreasing across the forward pass.
    #[must_use]
    pub fn active_part_index(&self) -> usize {
        self.active.unwrap_or(self.furthest)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total_parts: self.parts.len(),
            completed_parts: self
                .states
                .iter()
                .filter(|s| s.as_ref().is_some_and(PartRuntimeState::completed))
                .count(),
            active_part: self.active,
            phase: self.phase,
        }
    }

    /// Final content of every part, in part order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<PartContent> {
        self.states
            .iter()
            .map(|state| {
                state
                    .as_ref()
                    .map_or(PartContent::Empty, |s| s.content().clone())
            })
            .collect()
    }

    #[must_use]
    pub fn total_elapsed_seconds(&self) -> u64 {
        self.states
            .iter()
            .flatten()
            .map(|s| u64::from(s.elapsed_seconds()))
            .sum()
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────
    //

    /// Begin the session: part 0 becomes active with a running timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is fresh.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = SessionPhase::InProgress;
        self.activate_index(0);
        Ok(())
    }

    /// Rehydrate a fresh session from persisted draft content.
    ///
    /// Drafts below the highest saved index become completed parts; the
    /// highest one becomes the active part with its content restored and a
    /// fresh timer (elapsed time is not drafted).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is fresh,
    /// or `SessionError::PartOutOfRange` when there are more drafts than
    /// parts.
    pub fn resume(&mut self, drafts: Vec<Option<PartContent>>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if drafts.len() > self.parts.len() {
            return Err(SessionError::PartOutOfRange(self.parts.len()));
        }

        let Some(last) = drafts.iter().rposition(Option::is_some) else {
            return self.start();
        };

        for index in 0..last {
            let constraint = self.parts[index].constraint();
            let mut state = PartRuntimeState::fresh(constraint);
            if let Some(Some(content)) = drafts.get(index) {
                state.set_content(content.clone());
            }
            state.complete();
            self.states[index] = Some(state);
        }

        self.phase = SessionPhase::InProgress;
        self.activate_index(last);
        if let Some(Some(content)) = drafts.get(last)
            && let Some(state) = self.states[last].as_mut()
        {
            state.set_content(content.clone());
        }
        Ok(())
    }

    fn activate_index(&mut self, index: usize) {
        let mut state = PartRuntimeState::fresh(self.parts[index].constraint());
        state.activate();
        self.states[index] = Some(state);
        self.timer = Some(PartTimer::for_part(&self.parts[index]));
        self.active = Some(index);
        self.furthest = self.furthest.max(index);
    }

    //
    // ─── TICKS AND TRANSITIONS ─────────────────────────────────────────────
    //

    /// Route one clock tick into the active part's timer.
    ///
    /// When the budget expires the part completes and, under auto-advance,
    /// the next part starts without user action.
    pub fn handle_tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Idle;
        }
        let Some(index) = self.active else {
            return TickOutcome::Idle;
        };
        let Some(timer) = self.timer.as_mut() else {
            return TickOutcome::Idle;
        };

        match timer.tick() {
            TimerEvent::Tick { elapsed, remaining } => {
                if let Some(state) = self.states[index].as_mut() {
                    state.record_elapsed(elapsed);
                }
                TickOutcome::Running {
                    part_index: index,
                    elapsed,
                    remaining,
                }
            }
            TimerEvent::Expired => TickOutcome::PartCompleted(self.close_part(index)),
            TimerEvent::Idle => TickOutcome::Idle,
        }
    }

    /// Complete the active part early, with the same effect as a timeout.
    ///
    /// A stop racing an already-processed expiry is a no-op (`Ok(None)`):
    /// first event wins, the session never double-advances.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when called outside a running session.
    pub fn stop_current_part(&mut self) -> Result<Option<PartTransition>, SessionError> {
        if self.submit_pending {
            return Err(SessionError::SubmitPending);
        }
        match self.phase {
            SessionPhase::NotStarted => Err(SessionError::NotInProgress),
            SessionPhase::Submitted => Err(SessionError::AlreadySubmitted),
            // The final expiry was processed first; the manual stop loses.
            SessionPhase::AllPartsComplete => Ok(None),
            SessionPhase::InProgress => match self.active {
                None => Ok(None),
                Some(index) => {
                    if let Some(timer) = self.timer.as_mut() {
                        timer.stop();
                    }
                    Ok(Some(self.close_part(index)))
                }
            },
        }
    }

    fn close_part(&mut self, index: usize) -> PartTransition {
        if let Some(timer) = self.timer.take()
            && let Some(state) = self.states[index].as_mut()
        {
            state.record_elapsed(timer.elapsed_seconds());
        }
        if let Some(state) = self.states[index].as_mut() {
            state.complete();
        }
        self.active = None;

        let next = if let Some(pending) = self.states.iter().position(Option::is_none) {
            if self.auto_advance {
                self.activate_index(pending);
                NextPart::Activated(pending)
            } else {
                NextPart::AwaitingStart(pending)
            }
        } else if let Some(open) = self
            .states
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| !s.completed()))
        {
            // A redone part is still open; it is re-entered explicitly.
            NextPart::AwaitingStart(open)
        } else {
            self.phase = SessionPhase::AllPartsComplete;
            NextPart::AllComplete
        };

        PartTransition {
            completed_index: index,
            next,
        }
    }

    /// Open a part for input: either the next pending part (manual-advance
    /// policy) or a part that was just redone.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when another part is active, the index is out
    /// of range, or the part is not open for activation.
    pub fn start_part(&mut self, index: usize) -> Result<(), SessionError> {
        if self.submit_pending {
            return Err(SessionError::SubmitPending);
        }
        match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotInProgress),
            SessionPhase::Submitted => return Err(SessionError::AlreadySubmitted),
            SessionPhase::AllPartsComplete => return Err(SessionError::NotInProgress),
            SessionPhase::InProgress => {}
        }
        if self.active.is_some() {
            return Err(SessionError::PartAlreadyActive);
        }
        if index >= self.parts.len() {
            return Err(SessionError::PartOutOfRange(index));
        }

        match &self.states[index] {
            // Fresh parts open strictly in order.
            None => {
                let first_pending = self.states.iter().position(Option::is_none);
                if first_pending == Some(index) {
                    self.activate_index(index);
                    Ok(())
                } else {
                    Err(SessionError::PartNotAvailable(index))
                }
            }
            Some(state) if !state.completed() => {
                if let Some(state) = self.states[index].as_mut() {
                    state.activate();
                }
                self.timer = Some(PartTimer::for_part(&self.parts[index]));
                self.active = Some(index);
                Ok(())
            }
            // Completed parts may be reviewed, never reopened in place.
            Some(_) => Err(SessionError::PartNotAvailable(index)),
        }
    }

    //
    // ─── CONTENT ───────────────────────────────────────────────────────────
    //

    /// Replace the active part's in-progress content.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no part is active, a submission is in
    /// flight, or the content variant does not match the part's skill.
    pub fn on_content_changed(&mut self, content: PartContent) -> Result<(), SessionError> {
        if self.submit_pending {
            return Err(SessionError::SubmitPending);
        }
        let Some(index) = self.active else {
            return Err(SessionError::NoActivePart);
        };

        let matches = match (self.parts[index].constraint(), &content) {
            (_, PartContent::Empty) => true,
            (PartConstraint::Writing { .. }, PartContent::Text { .. }) => true,
            (PartConstraint::Speaking { .. }, PartContent::Recording { .. }) => true,
            _ => false,
        };
        if !matches {
            return Err(SessionError::ContentMismatch);
        }

        if let Some(state) = self.states[index].as_mut() {
            state.set_content(content);
        }
        Ok(())
    }

    /// Discard a completed part's work and open a fresh attempt slot.
    ///
    /// A local replace: no timer restarts, no index rewind; the part is
    /// re-entered via [`ExamSessionController::start_part`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for redo of the active part, an uncompleted
    /// part, or while a submission is in flight.
    pub fn redo_part(&mut self, index: usize) -> Result<(), SessionError> {
        if self.submit_pending {
            return Err(SessionError::SubmitPending);
        }
        match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotInProgress),
            SessionPhase::Submitted => return Err(SessionError::AlreadySubmitted),
            SessionPhase::InProgress | SessionPhase::AllPartsComplete => {}
        }
        if index >= self.parts.len() {
            return Err(SessionError::PartOutOfRange(index));
        }
        if self.active == Some(index) {
            return Err(SessionError::RedoActivePart(index));
        }
        let completed = self.states[index]
            .as_ref()
            .is_some_and(PartRuntimeState::completed);
        if !completed {
            return Err(SessionError::RedoNotCompleted(index));
        }

        self.states[index] = Some(PartRuntimeState::fresh(self.parts[index].constraint()));
        if self.phase == SessionPhase::AllPartsComplete {
            self.phase = SessionPhase::InProgress;
        }
        Ok(())
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────
    //

    /// Evaluate the submission gate against the current part states.
    #[must_use]
    pub fn evaluate_gate(&self) -> GateOutcome {
        gate::evaluate_session(&self.parts, &self.states)
    }

    /// Mark a submission as in flight, rejecting further mutation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AllPartsComplete` or when a
    /// submission is already pending.
    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.phase != SessionPhase::AllPartsComplete {
            return Err(SessionError::NotAllPartsComplete);
        }
        if self.submit_pending {
            return Err(SessionError::SubmitPending);
        }
        self.submit_pending = true;
        Ok(())
    }

    /// Revert a failed submission; the session stays editable.
    pub fn fail_submit(&mut self) {
        self.submit_pending = false;
    }

    /// Finish a successful submission.
    pub fn complete_submit(&mut self) {
        self.submit_pending = false;
        self.phase = SessionPhase::Submitted;
    }

    //
    // ─── PERSISTENCE BOOKKEEPING ───────────────────────────────────────────
    //

    pub(crate) fn note_unsaved(&mut self, index: usize) {
        if !self.unsaved.contains(&index) {
            self.unsaved.push(index);
        }
    }

    pub(crate) fn take_unsaved(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.unsaved)
    }
}

impl fmt::Debug for ExamSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSessionController")
            .field("id", &self.id.to_string())
            .field("skill", &self.skill)
            .field("level", &self.level)
            .field("parts_len", &self.parts.len())
            .field("active", &self.active)
            .field("furthest", &self.furthest)
            .field("phase", &self.phase)
            .field("submit_pending", &self.submit_pending)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
