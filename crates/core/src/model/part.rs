use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── PART SPECS ────────────────────────────────────────────────────────────────
//

/// Skill-specific constraints attached to a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "skill", rename_all = "lowercase")]
pub enum PartConstraint {
    Writing {
        min_words: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_words: Option<u32>,
    },
    Speaking {
        response_time_seconds: u32,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartSpecError {
    #[error("time budget must be greater than zero")]
    ZeroTimeBudget,

    #[error("max_words ({max}) is below min_words ({min})")]
    WordLimitBelowMinimum { min: u32, max: u32 },
}

/// Static description of one exam part, loaded from the content provider
/// and immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpec {
    label: String,
    title: String,
    constraint: PartConstraint,
    time_budget_seconds: u32,
}

impl PartSpec {
    /// Validate and build a part spec.
    ///
    /// # Errors
    ///
    /// Returns `PartSpecError::ZeroTimeBudget` for an empty countdown, or
    /// `PartSpecError::WordLimitBelowMinimum` for an inverted word range.
    pub fn new(
        label: impl Into<String>,
        title: impl Into<String>,
        constraint: PartConstraint,
        time_budget_seconds: u32,
    ) -> Result<Self, PartSpecError> {
        if time_budget_seconds == 0 {
            return Err(PartSpecError::ZeroTimeBudget);
        }
        if let PartConstraint::Writing {
            min_words,
            max_words: Some(max),
        } = constraint
            && max < min_words
        {
            return Err(PartSpecError::WordLimitBelowMinimum {
                min: min_words,
                max,
            });
        }

        Ok(Self {
            label: label.into(),
            title: title.into(),
            constraint,
            time_budget_seconds,
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn constraint(&self) -> PartConstraint {
        self.constraint
    }

    #[must_use]
    pub fn time_budget_seconds(&self) -> u32 {
        self.time_budget_seconds
    }
}

//
// ─── PART CONTENT ──────────────────────────────────────────────────────────────
//

/// In-progress work for one part: accumulated text for Writing, a recorded
/// artifact reference for Speaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartContent {
    Empty,
    Text { text: String },
    Recording { uri: String, duration_seconds: u32 },
}

impl PartContent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn recording(uri: impl Into<String>, duration_seconds: u32) -> Self {
        Self::Recording {
            uri: uri.into(),
            duration_seconds,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// True when no usable artifact has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text { text } => text.is_empty(),
            Self::Recording { uri, .. } => uri.is_empty(),
        }
    }
}

impl Default for PartContent {
    fn default() -> Self {
        Self::Empty
    }
}

//
// ─── PART RUNTIME STATE ────────────────────────────────────────────────────────
//

/// Mutable per-part state while a session runs.
///
/// `completed` is a one-way transition: a redo replaces the whole state with
/// a fresh one instead of reopening a completed one, so prior content stays
/// recoverable from the last persisted draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRuntimeState {
    content: PartContent,
    elapsed_seconds: u32,
    completed: bool,
    is_active: bool,
}

impl PartRuntimeState {
    /// Fresh state for a part governed by `constraint`, not yet active.
    #[must_use]
    pub fn fresh(constraint: PartConstraint) -> Self {
        let content = match constraint {
            PartConstraint::Writing { .. } => PartContent::text(String::new()),
            PartConstraint::Speaking { .. } => PartContent::Empty,
        };
        Self {
            content,
            elapsed_seconds: 0,
            completed: false,
            is_active: false,
        }
    }

    /// Rehydrate a state from persisted draft content.
    #[must_use]
    pub fn from_draft(content: PartContent, completed: bool) -> Self {
        Self {
            content,
            elapsed_seconds: 0,
            completed,
            is_active: false,
        }
    }

    #[must_use]
    pub fn content(&self) -> &PartContent {
        &self.content
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn set_content(&mut self, content: PartContent) {
        self.content = content;
    }

    pub fn record_elapsed(&mut self, elapsed_seconds: u32) {
        self.elapsed_seconds = elapsed_seconds;
    }

    /// Close the part. One-way: there is no way to un-complete a state.
    pub fn complete(&mut self) {
        self.completed = true;
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_rejects_zero_budget() {
        let err = PartSpec::new(
            "part-1",
            "Describe a photo",
            PartConstraint::Speaking {
                response_time_seconds: 45,
            },
            0,
        )
        .unwrap_err();
        assert_eq!(err, PartSpecError::ZeroTimeBudget);
    }

    #[test]
    fn spec_rejects_inverted_word_range() {
        let err = PartSpec::new(
            "part-1",
            "Short essay",
            PartConstraint::Writing {
                min_words: 120,
                max_words: Some(80),
            },
            600,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PartSpecError::WordLimitBelowMinimum { min: 120, max: 80 }
        );
    }

    #[test]
    fn fresh_writing_state_starts_with_empty_text() {
        let state = PartRuntimeState::fresh(PartConstraint::Writing {
            min_words: 100,
            max_words: None,
        });
        assert_eq!(state.content().as_text(), Some(""));
        assert!(state.content().is_empty());
        assert!(!state.completed());
        assert!(!state.is_active());
    }

    #[test]
    fn fresh_speaking_state_has_no_artifact() {
        let state = PartRuntimeState::fresh(PartConstraint::Speaking {
            response_time_seconds: 60,
        });
        assert_eq!(state.content(), &PartContent::Empty);
    }

    #[test]
    fn complete_deactivates() {
        let mut state = PartRuntimeState::fresh(PartConstraint::Speaking {
            response_time_seconds: 60,
        });
        state.activate();
        assert!(state.is_active());
        state.complete();
        assert!(state.completed());
        assert!(!state.is_active());
    }

    #[test]
    fn content_serde_round_trips_as_tagged_json() {
        let content = PartContent::recording("blob:rec-17", 43);
        let json = serde_json::to_string(&content).unwrap();
        assert!(json.contains("\"type\":\"recording\""));
        let back: PartContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }
}
