//! Tick sources driving the refresh timer thread.
//!
//! A [`TickSource`] decides *when* the next refresh happens. It gets the
//! timer's cancellation receiver so it can wake up early when the scheduler
//! stops.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

/// How often [`ManualTicks`] re-checks for cancellation while idle.
const MANUAL_POLL: Duration = Duration::from_millis(10);

pub trait TickSource: Send + 'static {
    /// Block until the next tick is due.
    ///
    /// Returns `false` when the timer should exit, either because `cancel`
    /// fired or because the source is exhausted.
    fn wait(&mut self, cancel: &Receiver<()>) -> bool;
}

/// Fixed-rate ticks. Deadlines advance by exactly one interval per tick, so
/// the time spent publishing does not accumulate as drift.
#[derive(Debug)]
pub struct IntervalTicks {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalTicks {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }
}

impl TickSource for IntervalTicks {
    fn wait(&mut self, cancel: &Receiver<()>) -> bool {
        let deadline = self.next.unwrap_or_else(|| Instant::now() + self.interval);
        let timeout = deadline.saturating_duration_since(Instant::now());

        match cancel.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                // Skip missed deadlines instead of bursting to catch up.
                let mut next = deadline + self.interval;
                let now = Instant::now();
                while next <= now {
                    next += self.interval;
                }
                self.next = Some(next);
                true
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Ticks fired explicitly through a [`Sender`].
///
/// For callers that own their own event loop, and for deterministic tests.
/// Dropping every sender ends the timer.
#[derive(Debug)]
pub struct ManualTicks {
    ticks: Receiver<()>,
}

impl ManualTicks {
    /// Returns the trigger and the tick source to hand to the scheduler.
    pub fn channel() -> (Sender<()>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { ticks: rx })
    }
}

impl TickSource for ManualTicks {
    fn wait(&mut self, cancel: &Receiver<()>) -> bool {
        loop {
            if is_cancelled(cancel) {
                return false;
            }
            match self.ticks.recv_timeout(MANUAL_POLL) {
                Ok(()) => return !is_cancelled(cancel),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

fn is_cancelled(cancel: &Receiver<()>) -> bool {
    matches!(
        cancel.try_recv(),
        Ok(()) | Err(TryRecvError::Disconnected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_ticks_fire_after_interval() {
        let (_cancel_tx, cancel_rx) = mpsc::channel();
        let mut ticks = IntervalTicks::new(Duration::from_millis(20));

        let started = Instant::now();
        assert!(ticks.wait(&cancel_rx));
        assert!(ticks.wait(&cancel_rx));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn interval_ticks_stop_on_cancel() {
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let mut ticks = IntervalTicks::new(Duration::from_secs(60));
        cancel_tx.send(()).unwrap();

        let started = Instant::now();
        assert!(!ticks.wait(&cancel_rx));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn interval_ticks_stop_when_canceller_dropped() {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        drop(cancel_tx);
        assert!(!IntervalTicks::new(Duration::from_secs(60)).wait(&cancel_rx));
    }

    #[test]
    fn manual_ticks_follow_sender() {
        let (_cancel_tx, cancel_rx) = mpsc::channel();
        let (trigger, mut ticks) = ManualTicks::channel();

        trigger.send(()).unwrap();
        trigger.send(()).unwrap();
        assert!(ticks.wait(&cancel_rx));
        assert!(ticks.wait(&cancel_rx));

        drop(trigger);
        assert!(!ticks.wait(&cancel_rx));
    }

    #[test]
    fn manual_ticks_prefer_cancellation() {
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let (trigger, mut ticks) = ManualTicks::channel();

        trigger.send(()).unwrap();
        cancel_tx.send(()).unwrap();
        assert!(!ticks.wait(&cancel_rx));
    }
}
