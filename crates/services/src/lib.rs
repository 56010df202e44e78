#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod provider;
pub mod scorer;
pub mod sessions;

pub use exam_core::Clock;

pub use clock::{IntervalClock, ManualClock, Tick, TickClock};
pub use error::{ProviderError, ScorerError, SessionError, StartSessionError, SubmitError};
pub use provider::{PartProvider, StaticPartProvider};
pub use scorer::{HttpScorer, Scorer, ScorerConfig};
pub use sessions::{
    ClockDriver, DEFAULT_AUTOSAVE_INTERVAL, ExamFlowService, ExamSessionController, NextPart,
    PartTimer, PartTransition, ResultAggregator, SessionProgress, TickOutcome, TimerEvent,
};
