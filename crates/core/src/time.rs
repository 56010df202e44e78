use chrono::{DateTime, Utc};

/// Wall-clock abstraction so session timestamps and identifiers stay
/// deterministic in tests.
///
/// This is the calendar clock (session ids, draft timestamps). The 1 Hz
/// countdown tick source lives in the services layer.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Clock backed by the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Clock frozen at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// `YYMMDD` code for a timestamp, as embedded in session identifiers.
#[must_use]
pub fn date_code(at: DateTime<Utc>) -> String {
    at.format("%y%m%d").to_string()
}

/// Deterministic timestamp for tests and doc examples (2024-12-12T11:20:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_734_002_400;

/// Deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// A `Clock` frozen at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
