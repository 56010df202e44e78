use thiserror::Error;

use exam_core::model::PartSpec;

/// Outcome of routing one clock tick into a [`PartTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Budget not yet exhausted.
    Tick { elapsed: u32, remaining: u32 },
    /// Budget exhausted on this tick. Emitted exactly once.
    Expired,
    /// The timer already reached a terminal state; the tick is a no-op.
    Idle,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartTimerError {
    #[error("timer budget must be greater than zero")]
    ZeroBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Running,
    Expired,
    Stopped,
}

/// Counts one part's time budget down, tick by tick.
///
/// Expiry and a manual stop are mutually exclusive terminal outcomes: once
/// either happens, further ticks and stops are no-ops.
#[derive(Debug, Clone)]
pub struct PartTimer {
    budget_seconds: u32,
    elapsed: u32,
    state: TimerState,
}

impl PartTimer {
    /// Build a timer for a budget of `budget_seconds`.
    ///
    /// # Errors
    ///
    /// Returns `PartTimerError::ZeroBudget` when the budget is zero.
    pub fn new(budget_seconds: u32) -> Result<Self, PartTimerError> {
        if budget_seconds == 0 {
            return Err(PartTimerError::ZeroBudget);
        }
        Ok(Self {
            budget_seconds,
            elapsed: 0,
            state: TimerState::Running,
        })
    }

    /// Timer for a validated part spec. `PartSpec` guarantees a positive
    /// budget, so this cannot fail.
    pub(crate) fn for_part(spec: &PartSpec) -> Self {
        Self {
            budget_seconds: spec.time_budget_seconds().max(1),
            elapsed: 0,
            state: TimerState::Running,
        }
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TimerEvent {
        match self.state {
            TimerState::Running => {
                self.elapsed += 1;
                if self.elapsed >= self.budget_seconds {
                    self.state = TimerState::Expired;
                    TimerEvent::Expired
                } else {
                    TimerEvent::Tick {
                        elapsed: self.elapsed,
                        remaining: self.budget_seconds - self.elapsed,
                    }
                }
            }
            TimerState::Expired | TimerState::Stopped => TimerEvent::Idle,
        }
    }

    /// Stop counting before expiry. Returns `false` when the timer was
    /// already terminal (expired or stopped).
    pub fn stop(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed
    }

    #[must_use]
    pub fn budget_seconds(&self) -> u32 {
        self.budget_seconds
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state != TimerState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_budget() {
        assert_eq!(PartTimer::new(0).unwrap_err(), PartTimerError::ZeroBudget);
    }

    #[test]
    fn expires_exactly_at_the_budget_boundary() {
        let mut timer = PartTimer::new(3).unwrap();

        assert_eq!(
            timer.tick(),
            TimerEvent::Tick {
                elapsed: 1,
                remaining: 2
            }
        );
        assert_eq!(
            timer.tick(),
            TimerEvent::Tick {
                elapsed: 2,
                remaining: 1
            }
        );
        assert_eq!(timer.tick(), TimerEvent::Expired);
        assert_eq!(timer.elapsed_seconds(), 3);
    }

    #[test]
    fn expired_is_emitted_exactly_once() {
        let mut timer = PartTimer::new(1).unwrap();
        assert_eq!(timer.tick(), TimerEvent::Expired);
        assert_eq!(timer.tick(), TimerEvent::Idle);
        assert_eq!(timer.tick(), TimerEvent::Idle);
        assert_eq!(timer.elapsed_seconds(), 1);
    }

    #[test]
    fn stop_after_expiry_is_a_no_op() {
        let mut timer = PartTimer::new(1).unwrap();
        assert_eq!(timer.tick(), TimerEvent::Expired);
        assert!(!timer.stop());
        assert!(timer.is_terminal());
    }

    #[test]
    fn stop_before_expiry_prevents_expired() {
        let mut timer = PartTimer::new(5).unwrap();
        assert_eq!(
            timer.tick(),
            TimerEvent::Tick {
                elapsed: 1,
                remaining: 4
            }
        );
        assert!(timer.stop());
        assert_eq!(timer.tick(), TimerEvent::Idle);
        assert!(!timer.stop());
        assert_eq!(timer.elapsed_seconds(), 1);
    }
}
