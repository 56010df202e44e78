use exam_core::model::SessionPhase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total_parts: usize,
    pub completed_parts: usize,
    pub active_part: Option<usize>,
    pub phase: SessionPhase,
}
