//! Periodic snapshot refresh.
//!
//! [`RefreshScheduler`] owns a [`MetricSource`] and republishes a fresh
//! snapshot on every tick:
//!
//! ```text
//! tick ─► generate() ─► DerivedMetrics::compute() ─► store Arc<Published> ─► notify subscribers
//! ```
//!
//! The whole cycle runs under one mutex, so a timer tick and an on-demand
//! [`refresh_now`](RefreshScheduler::refresh_now) never interleave. Readers
//! only ever see a complete [`Published`] through an `Arc`.
//!
//! `stop()` clears the active flag under that same mutex before joining the
//! timer thread. A tick that wakes up concurrently therefore either finished
//! publishing before `stop()` took the lock, or observes the flag and exits.
//! Nothing is published once `stop()` returns.
mod ticks;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::metrics::Snapshot;
use crate::metrics::derived::{DerivationPolicy, DerivedMetrics};
use crate::metrics::source::MetricSource;

pub use ticks::{IntervalTicks, ManualTicks, TickSource};

/// Default time between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

/// One published refresh: the snapshot, its derived metrics and when it was
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Published {
    /// 1-based count of snapshots produced by this scheduler.
    pub sequence: u64,
    pub generated_at: DateTime<Utc>,
    pub snapshot: Snapshot,
    pub derived: DerivedMetrics,
}

struct Inner<S> {
    source: S,
    policy: DerivationPolicy,
    current: Option<Arc<Published>>,
    subscribers: Vec<Sender<Arc<Published>>>,
    sequence: u64,
    active: bool,
}

impl<S: MetricSource> Inner<S> {
    fn publish(&mut self) -> Arc<Published> {
        let snapshot = self.source.generate();
        let derived = DerivedMetrics::compute(&snapshot, &self.policy);
        self.sequence += 1;

        let update = Arc::new(Published {
            sequence: self.sequence,
            generated_at: Utc::now(),
            snapshot,
            derived,
        });
        self.current = Some(Arc::clone(&update));

        // Drop subscribers whose receiver is gone.
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&update)).is_ok());

        debug!(
            sequence = update.sequence,
            total_collected = update.derived.total_collected,
            overall_percent = update.derived.overall_achieved_percent,
            total_actions = update.derived.total_actions,
            subscribers = self.subscribers.len(),
            "published snapshot"
        );
        update
    }
}

struct Timer {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Regenerates the dashboard snapshot on a fixed cadence.
///
/// Created inactive. [`start`](Self::start) publishes the first snapshot
/// immediately and arms the timer; [`stop`](Self::stop) cancels it. A
/// stopped scheduler can be started again.
pub struct RefreshScheduler<S> {
    inner: Arc<Mutex<Inner<S>>>,
    interval: Duration,
    timer: Option<Timer>,
}

impl<S: MetricSource + Send + 'static> RefreshScheduler<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                source,
                policy: DerivationPolicy::default(),
                current: None,
                subscribers: Vec::new(),
                sequence: 0,
                active: false,
            })),
            interval,
            timer: None,
        }
    }

    /// Replace the agent count and severity bands used for derivation.
    pub fn with_policy(self, policy: DerivationPolicy) -> Self {
        lock(&self.inner).policy = policy;
        self
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> Receiver<Arc<Published>> {
        let (tx, rx) = mpsc::channel();
        lock(&self.inner).subscribers.push(tx);
        rx
    }

    /// Publish an initial snapshot and start ticking every `interval`.
    ///
    /// No-op while already active.
    pub fn start(&mut self) {
        let ticks = IntervalTicks::new(self.interval);
        self.start_with(ticks);
    }

    /// Like [`start`](Self::start), with a caller-supplied cadence.
    pub fn start_with<T: TickSource>(&mut self, mut ticks: T) {
        if self.is_active() {
            return;
        }
        // A tick source that ran dry leaves a finished thread behind.
        if let Some(stale) = self.timer.take() {
            let _ = stale.handle.join();
        }

        {
            let mut inner = lock(&self.inner);
            inner.active = true;
            inner.publish();
        }

        let (cancel, cancel_rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || {
            while ticks.wait(&cancel_rx) {
                let mut guard = lock(&inner);
                if !guard.active {
                    return;
                }
                guard.publish();
            }
            lock(&inner).active = false;
            debug!("tick source exhausted, scheduler inactive");
        });

        self.timer = Some(Timer { cancel, handle });
        info!(interval_ms = self.interval.as_millis() as u64, "refresh scheduler started");
    }

    /// Publish a fresh snapshot outside the regular cadence.
    ///
    /// Returns `None` without generating anything while inactive.
    pub fn refresh_now(&self) -> Option<Arc<Published>> {
        let mut inner = lock(&self.inner);
        if !inner.active {
            return None;
        }
        Some(inner.publish())
    }
}

impl<S> RefreshScheduler<S> {
    /// Cancel the timer. Returns once the timer thread has exited; no
    /// snapshot is published after that.
    pub fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };

        lock(&self.inner).active = false;
        let _ = timer.cancel.send(());
        let _ = timer.handle.join();
        info!("refresh scheduler stopped");
    }

    /// `false` once stopped, or once the tick source has ended on its own.
    pub fn is_active(&self) -> bool {
        lock(&self.inner).active
    }

    /// The most recently published snapshot, if any.
    pub fn current(&self) -> Option<Arc<Published>> {
        lock(&self.inner).current.clone()
    }

    /// Snapshots produced so far, across all activations.
    pub fn published_count(&self) -> u64 {
        lock(&self.inner).sequence
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<S> Drop for RefreshScheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A panic inside a source leaves the data intact: every publish replaces
/// `current` in one assignment.
fn lock<S>(inner: &Mutex<Inner<S>>) -> MutexGuard<'_, Inner<S>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::source::{MetricTables, RandomSource};

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    fn scheduler() -> RefreshScheduler<RandomSource> {
        RefreshScheduler::new(
            RandomSource::seeded(MetricTables::standard(), 5),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn new_scheduler_is_inactive_and_empty() {
        let scheduler = scheduler();
        assert!(!scheduler.is_active());
        assert!(scheduler.current().is_none());
        assert_eq!(scheduler.published_count(), 0);
        assert_eq!(scheduler.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn start_publishes_initial_snapshot_synchronously() {
        let mut scheduler = scheduler();
        let updates = scheduler.subscribe();
        scheduler.start();

        let first = updates.try_recv().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(scheduler.current().unwrap(), first);
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn start_twice_keeps_one_timer() {
        let mut scheduler = scheduler();
        scheduler.start();
        scheduler.start();
        assert_eq!(scheduler.published_count(), 1);
    }

    #[test]
    fn refresh_now_requires_active_scheduler() {
        let mut scheduler = scheduler();
        assert!(scheduler.refresh_now().is_none());
        assert_eq!(scheduler.published_count(), 0);

        scheduler.start();
        let forced = scheduler.refresh_now().unwrap();
        assert_eq!(forced.sequence, 2);

        scheduler.stop();
        assert!(scheduler.refresh_now().is_none());
        assert_eq!(scheduler.published_count(), 2);
    }

    #[test]
    fn manual_ticks_publish_in_order() {
        let mut scheduler = scheduler();
        let updates = scheduler.subscribe();
        let (trigger, ticks) = ManualTicks::channel();
        scheduler.start_with(ticks);

        trigger.send(()).unwrap();
        trigger.send(()).unwrap();

        let sequences: Vec<u64> = (0..3)
            .map(|_| updates.recv_timeout(RECV_TIMEOUT).unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        scheduler.stop();
    }

    #[test]
    fn derived_metrics_use_scheduler_policy() {
        let policy = DerivationPolicy {
            agent_count: 1,
            ..DerivationPolicy::default()
        };
        let mut scheduler = scheduler().with_policy(policy);
        scheduler.start();

        let update = scheduler.current().unwrap();
        assert_eq!(
            update.derived.average_actions_per_agent,
            update.derived.total_actions
        );
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut scheduler = scheduler();
        let kept = scheduler.subscribe();
        drop(scheduler.subscribe());

        scheduler.start();
        scheduler.refresh_now();
        assert_eq!(lock(&scheduler.inner).subscribers.len(), 1);
        assert_eq!(kept.try_iter().count(), 2);
    }

    fn wait_until_inactive(scheduler: &RefreshScheduler<RandomSource>) {
        let deadline = std::time::Instant::now() + RECV_TIMEOUT;
        while scheduler.is_active() {
            assert!(std::time::Instant::now() < deadline, "timer thread never exited");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn exhausted_tick_source_deactivates() {
        let mut scheduler = scheduler();
        let (trigger, ticks) = ManualTicks::channel();
        scheduler.start_with(ticks);
        assert!(scheduler.is_active());

        drop(trigger);
        wait_until_inactive(&scheduler);
        assert!(scheduler.refresh_now().is_none());
        assert_eq!(scheduler.published_count(), 1);
    }

    #[test]
    fn restart_after_exhausted_tick_source() {
        let mut scheduler = scheduler();
        let updates = scheduler.subscribe();
        let (trigger, ticks) = ManualTicks::channel();
        scheduler.start_with(ticks);
        drop(trigger);
        wait_until_inactive(&scheduler);

        let (trigger, ticks) = ManualTicks::channel();
        scheduler.start_with(ticks);
        assert!(scheduler.is_active());
        trigger.send(()).unwrap();

        let sequences: Vec<u64> = (0..3)
            .map(|_| updates.recv_timeout(RECV_TIMEOUT).unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        scheduler.stop();
        assert!(!scheduler.is_active());
    }

    #[test]
    fn drop_stops_timer() {
        let (trigger, ticks) = ManualTicks::channel();
        let updates = {
            let mut scheduler = scheduler();
            let updates = scheduler.subscribe();
            scheduler.start_with(ticks);
            updates
        };
        let _ = trigger.send(());
        assert_eq!(updates.try_iter().count(), 1);
        assert!(updates.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
