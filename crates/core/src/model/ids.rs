use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Level, Skill};
use crate::time;

/// Traceability identifier for an exam session.
///
/// Format: `<SkillCode>-<Level>-<YYMMDD>-<NNN>`, e.g. `S-B1-241214-001`.
/// The serial is a 3-digit random number, so the identifier is meant for
/// debugging and log correlation, not as a uniqueness guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    skill: Skill,
    level: Level,
    date_code: String,
    serial: u16,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionIdError {
    #[error("malformed session id: {0}")]
    Malformed(String),

    #[error("unknown skill code: {0}")]
    UnknownSkillCode(String),

    #[error("unknown level: {0}")]
    UnknownLevel(String),

    #[error("invalid date code: {0}")]
    InvalidDateCode(String),

    #[error("invalid serial: {0}")]
    InvalidSerial(String),
}

impl SessionId {
    /// Build an identifier for a session created at `created_at`.
    ///
    /// The serial is truncated to three digits.
    #[must_use]
    pub fn generate(skill: Skill, level: Level, created_at: DateTime<Utc>, serial: u16) -> Self {
        Self {
            skill,
            level,
            date_code: time::date_code(created_at),
            serial: serial % 1000,
        }
    }

    #[must_use]
    pub fn skill(&self) -> Skill {
        self.skill
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Creation date as a `YYMMDD` code.
    #[must_use]
    pub fn date_code(&self) -> &str {
        &self.date_code
    }

    #[must_use]
    pub fn serial(&self) -> u16 {
        self.serial
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{:03}",
            self.skill.code(),
            self.level,
            self.date_code,
            self.serial
        )
    }
}

impl FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split('-');
        let (Some(code), Some(level), Some(date_code), Some(serial), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(SessionIdError::Malformed(s.to_owned()));
        };

        let mut chars = code.chars();
        let skill = match (chars.next(), chars.next()) {
            (Some(c), None) => Skill::from_code(c)
                .ok_or_else(|| SessionIdError::UnknownSkillCode(code.to_owned()))?,
            _ => return Err(SessionIdError::UnknownSkillCode(code.to_owned())),
        };

        let level: Level = level
            .parse()
            .map_err(|_| SessionIdError::UnknownLevel(level.to_owned()))?;

        if date_code.len() != 6 || !date_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(SessionIdError::InvalidDateCode(date_code.to_owned()));
        }

        if serial.len() != 3 {
            return Err(SessionIdError::InvalidSerial(serial.to_owned()));
        }
        let serial: u16 = serial
            .parse()
            .map_err(|_| SessionIdError::InvalidSerial(serial.to_owned()))?;

        Ok(Self {
            skill,
            level,
            date_code: date_code.to_owned(),
            serial,
        })
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
