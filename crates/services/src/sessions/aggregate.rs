use std::sync::Arc;

use exam_core::model::SessionResult;

use super::controller::ExamSessionController;
use crate::error::ScorerError;
use crate::scorer::Scorer;

/// Merges completed part artifacts into one payload and invokes the
/// external scorer.
pub struct ResultAggregator {
    scorer: Arc<dyn Scorer>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    /// Copy every part's final content in part order, sum elapsed time, and
    /// score the artifact set.
    ///
    /// May be long-running; the controller rejects mutation while this is
    /// outstanding. The scorer's response is propagated unchanged.
    ///
    /// # Errors
    ///
    /// Propagates `ScorerError`; the caller decides how the session phase
    /// reacts.
    pub async fn aggregate(
        &self,
        session: &ExamSessionController,
    ) -> Result<SessionResult, ScorerError> {
        let artifacts = session.artifacts();
        let total_elapsed_seconds = session.total_elapsed_seconds();
        let output = self
            .scorer
            .score(&artifacts, session.skill(), session.level())
            .await?;
        Ok(SessionResult::new(artifacts, total_elapsed_seconds, output))
    }
}
