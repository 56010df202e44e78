//! Pure submission-readiness rules.
//!
//! No side effects and no caching: word counts are recomputed from the
//! current content on every evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{PartConstraint, PartContent, PartRuntimeState, PartSpec};

/// Reason a part blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateFailure {
    InsufficientWords,
    NoRecording,
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateFailure::InsufficientWords => write!(f, "insufficient-words"),
            GateFailure::NoRecording => write!(f, "no-recording"),
        }
    }
}

/// Session-level gate verdict. The first failing part wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Ready,
    NotReady {
        part_index: usize,
        reason: GateFailure,
    },
}

/// Count words by splitting on whitespace and discarding empty tokens.
#[must_use]
pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Soft over-length check for Writing parts.
///
/// Exceeding `max_words` never blocks submission; callers may surface it as
/// a warning.
#[must_use]
pub fn word_limit_exceeded(spec: &PartSpec, state: &PartRuntimeState) -> bool {
    match spec.constraint() {
        PartConstraint::Writing {
            max_words: Some(max),
            ..
        } => state
            .content()
            .as_text()
            .is_some_and(|text| word_count(text) > max),
        _ => false,
    }
}

/// Evaluate one part against its skill rule.
///
/// Returns `None` when the part is ready. A missing or uncompleted state
/// maps to the skill's natural failure reason.
#[must_use]
pub fn evaluate_part(spec: &PartSpec, state: Option<&PartRuntimeState>) -> Option<GateFailure> {
    let fallback = match spec.constraint() {
        PartConstraint::Writing { .. } => GateFailure::InsufficientWords,
        PartConstraint::Speaking { .. } => GateFailure::NoRecording,
    };

    let Some(state) = state else {
        return Some(fallback);
    };
    if !state.completed() {
        return Some(fallback);
    }

    match spec.constraint() {
        PartConstraint::Writing { min_words, .. } => match state.content() {
            PartContent::Text { text } if word_count(text) >= min_words => None,
            _ => Some(GateFailure::InsufficientWords),
        },
        PartConstraint::Speaking { .. } => match state.content() {
            PartContent::Recording { uri, .. } if !uri.is_empty() => None,
            _ => Some(GateFailure::NoRecording),
        },
    }
}

/// Evaluate a whole session: ready iff every part is completed and passes
/// its individual rule.
#[must_use]
pub fn evaluate_session(
    parts: &[PartSpec],
    states: &[Option<PartRuntimeState>],
) -> GateOutcome {
    for (part_index, spec) in parts.iter().enumerate() {
        let state = states.get(part_index).and_then(Option::as_ref);
        if let Some(reason) = evaluate_part(spec, state) {
            return GateOutcome::NotReady { part_index, reason };
        }
    }
    GateOutcome::Ready
}
