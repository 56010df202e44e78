mod aggregate;
mod controller;
mod progress;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use aggregate::ResultAggregator;
pub use controller::{ExamSessionController, NextPart, PartTransition, TickOutcome};
pub use progress::SessionProgress;
pub use timer::{PartTimer, PartTimerError, TimerEvent};
pub use workflow::{ClockDriver, DEFAULT_AUTOSAVE_INTERVAL, ExamFlowService};
