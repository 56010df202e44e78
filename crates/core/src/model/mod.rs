mod exam;
mod ids;
mod part;
mod result;

pub use exam::{Level, LevelParseError, SessionPhase, Skill};
pub use ids::{SessionId, SessionIdError};
pub use part::{PartConstraint, PartContent, PartRuntimeState, PartSpec, PartSpecError};
pub use result::{ScorerFeedback, ScorerOutput, SessionResult};
