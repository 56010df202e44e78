//! 1 Hz tick sources driving part countdowns.
//!
//! The clock knows nothing about sessions; it only delivers one tick per
//! elapsed second into a subscription while running. Tests inject a
//! [`ManualClock`] so time is driven explicitly.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Marker for one elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// A suspendable periodic tick source.
pub trait TickClock: Send + Sync {
    /// Begin ticking and return the subscription. Any previous subscription
    /// is cut off.
    fn start(&self) -> mpsc::UnboundedReceiver<Tick>;

    /// Stop delivering ticks. Idempotent; a stopped clock can be started
    /// again with a fresh subscription.
    fn stop(&self);
}

/// Production clock: one tick per wall-clock second on a background task.
#[derive(Default)]
pub struct IntervalClock {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickClock for IntervalClock {
    fn start(&self) -> mpsc::UnboundedReceiver<Tick> {
        self.stop();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first interval tick completes immediately; swallow it so
            // the first delivered tick marks one elapsed second.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Tick).is_err() {
                    break;
                }
            }
        });
        if let Ok(mut guard) = self.task.lock() {
            *guard = Some(handle);
        }
        rx
    }

    fn stop(&self) {
        if let Ok(mut guard) = self.task.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deterministic clock: ticks are delivered only when [`ManualClock::advance`]
/// is called.
#[derive(Default)]
pub struct ManualClock {
    tx: Mutex<Option<mpsc::UnboundedSender<Tick>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `seconds` ticks to the current subscription, if any.
    pub fn advance(&self, seconds: u32) {
        if let Ok(guard) = self.tx.lock()
            && let Some(tx) = guard.as_ref()
        {
            for _ in 0..seconds {
                let _ = tx.send(Tick);
            }
        }
    }
}

impl TickClock for ManualClock {
    fn start(&self) -> mpsc::UnboundedReceiver<Tick> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.tx.lock() {
            *guard = Some(tx);
        }
        rx
    }

    fn stop(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_delivers_the_requested_ticks() {
        let clock = ManualClock::new();
        let mut rx = clock.start();

        clock.advance(3);
        for _ in 0..3 {
            assert_eq!(rx.try_recv().unwrap(), Tick);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn manual_clock_stop_closes_the_subscription() {
        let clock = ManualClock::new();
        let mut rx = clock.start();
        clock.stop();
        clock.advance(5);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn restarting_cuts_off_the_old_subscription() {
        let clock = ManualClock::new();
        let mut old = clock.start();
        let mut fresh = clock.start();

        clock.advance(1);
        assert!(old.try_recv().is_err());
        assert_eq!(fresh.try_recv().unwrap(), Tick);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_clock_ticks_once_per_second() {
        let clock = IntervalClock::new();
        let mut rx = clock.start();

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(Tick));
        }

        clock.stop();
        assert!(rx.recv().await.is_none());
    }
}
