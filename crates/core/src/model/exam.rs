use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exam skill driven by the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Speaking,
    Writing,
}

impl Skill {
    /// Single-letter code used in session identifiers.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Skill::Speaking => 'S',
            Skill::Writing => 'W',
        }
    }

    /// Inverse of [`Skill::code`].
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'S' => Some(Skill::Speaking),
            'W' => Some(Skill::Writing),
            _ => None,
        }
    }

    /// Default part-advance policy for this skill.
    ///
    /// Starting a Speaking test commits to the whole sequence, so completed
    /// parts hand over to the next one automatically. Writing tasks are
    /// opened one by one.
    #[must_use]
    pub fn default_auto_advance(self) -> bool {
        match self {
            Skill::Speaking => true,
            Skill::Writing => false,
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::Speaking => write!(f, "Speaking"),
            Skill::Writing => write!(f, "Writing"),
        }
    }
}

/// CEFR level the session content is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    A2,
    B1,
    B2,
    C1,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown level: {0}")]
pub struct LevelParseError(pub String);

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A2" => Ok(Level::A2),
            "B1" => Ok(Level::B1),
            "B2" => Ok(Level::B2),
            "C1" => Ok(Level::C1),
            other => Err(LevelParseError(other.to_owned())),
        }
    }
}

/// Lifecycle phase of an exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    AllPartsComplete,
    Submitted,
}
