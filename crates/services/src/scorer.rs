use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use exam_core::model::{Level, PartContent, ScorerOutput, Skill};

use crate::error::ScorerError;

/// External scoring contract.
///
/// Receives every completed part's artifact, in part order, and returns an
/// opaque score/feedback object that is propagated into the session result
/// unchanged.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score one session's artifact set.
    ///
    /// # Errors
    ///
    /// Returns `ScorerError` when the scorer is unavailable or rejects the
    /// request. The session reverts to an editable state on failure.
    async fn score(
        &self,
        artifacts: &[PartContent],
        skill: Skill,
        level: Level,
    ) -> Result<ScorerOutput, ScorerError>;
}

#[derive(Clone, Debug)]
pub struct ScorerConfig {
    pub base_url: String,
    pub api_key: String,
    /// Optional model override forwarded to the scoring backend.
    pub model: Option<String>,
}

impl ScorerConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("EXAM_SCORER_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("EXAM_SCORER_BASE_URL").ok()?;
        let model = env::var("EXAM_SCORER_MODEL").ok().filter(|m| !m.is_empty());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// HTTP scorer client.
#[derive(Clone)]
pub struct HttpScorer {
    client: Client,
    config: Option<ScorerConfig>,
}

impl HttpScorer {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ScorerConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ScorerConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(
        &self,
        artifacts: &[PartContent],
        skill: Skill,
        level: Level,
    ) -> Result<ScorerOutput, ScorerError> {
        let config = self.config.as_ref().ok_or(ScorerError::Disabled)?;

        let url = format!("{}/score", config.base_url.trim_end_matches('/'));
        let payload = ScoreRequest {
            skill,
            level,
            artifacts,
            model: config.model.as_deref(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScorerError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    skill: Skill,
    level: Level,
    artifacts: &'a [PartContent],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}
