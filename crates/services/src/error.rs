//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::gate::GateFailure;
use exam_core::model::{Level, Skill};
use storage::repository::StorageError;

/// Errors emitted by `Scorer` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScorerError {
    #[error("scorer is not configured")]
    Disabled,
    #[error("scorer request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `PartProvider` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("no content for {skill} at {level}")]
    NoContent { skill: Skill, level: Level },
    #[error("content provider unavailable: {0}")]
    Unavailable(String),
}

/// Contract violations raised by `ExamSessionController`.
///
/// These indicate caller bugs (an illegal transition was requested), not
/// runtime conditions, and are meant to fail loudly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no parts available for session")]
    Empty,
    #[error("session already started")]
    AlreadyStarted,
    #[error("operation requires an in-progress session")]
    NotInProgress,
    #[error("no part is currently active")]
    NoActivePart,
    #[error("part index {0} is out of range")]
    PartOutOfRange(usize),
    #[error("part {0} is not open for activation")]
    PartNotAvailable(usize),
    #[error("another part is already active")]
    PartAlreadyActive,
    #[error("cannot redo part {0}: not completed")]
    RedoNotCompleted(usize),
    #[error("cannot redo part {0}: currently active")]
    RedoActivePart(usize),
    #[error("content does not match the part's skill")]
    ContentMismatch,
    #[error("submission requires all parts complete")]
    NotAllPartsComplete,
    #[error("a submission is already in flight")]
    SubmitPending,
    #[error("session already submitted")]
    AlreadySubmitted,
}

/// Errors from starting or resuming a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StartSessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from submitting a session.
///
/// Gate and scorer failures are the two failure modes meant to reach the
/// end user; both leave the session editable and retryable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("part {part_index} is not ready: {reason}")]
    Gate {
        part_index: usize,
        reason: GateFailure,
    },
    #[error(transparent)]
    Scorer(#[from] ScorerError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
