use std::collections::HashMap;

use async_trait::async_trait;

use exam_core::model::{Level, PartSpec, Skill};

use crate::error::ProviderError;

/// External content provider: the ordered part sequence for a skill/level
/// pair. Specs are immutable for a session's lifetime; the engine never
/// refetches mid-session.
#[async_trait]
pub trait PartProvider: Send + Sync {
    /// Fetch the ordered part specs for `(skill, level)`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the combination has no content or the
    /// provider is unreachable.
    async fn parts(&self, skill: Skill, level: Level) -> Result<Vec<PartSpec>, ProviderError>;
}

/// In-memory provider for tests and prototyping.
#[derive(Clone, Default)]
pub struct StaticPartProvider {
    sets: HashMap<(Skill, Level), Vec<PartSpec>>,
}

impl StaticPartProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, skill: Skill, level: Level, parts: Vec<PartSpec>) {
        self.sets.insert((skill, level), parts);
    }
}

#[async_trait]
impl PartProvider for StaticPartProvider {
    async fn parts(&self, skill: Skill, level: Level) -> Result<Vec<PartSpec>, ProviderError> {
        self.sets
            .get(&(skill, level))
            .cloned()
            .ok_or(ProviderError::NoContent { skill, level })
    }
}
