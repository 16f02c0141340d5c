//! Cancellable countdown
//!
//! Every wait in the agent goes through [`Countdown::wait`]. The wait is a
//! single `sleep_until` on the deadline raced against the process-level
//! cancellation token. A one-second interval runs alongside it only to
//! publish the remaining time; it has no say in when the wait ends. Every
//! tick is traced, and once a minute the remaining time is logged at debug.

use kombat_core::format::format_hms;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const TICK: Duration = Duration::from_secs(1);

/// Ticks between debug-level progress lines
const REPORT_EVERY: u64 = 60;

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration passed
    Elapsed,
    /// Cancellation fired first
    Interrupted,
}

/// Interruptible wait with observable remaining time
pub struct Countdown {
    label: &'static str,
    cancel: CancellationToken,
    remaining: watch::Sender<Duration>,
}

impl Countdown {
    /// Create a countdown that ends early when `cancel` fires
    pub fn new(label: &'static str, cancel: CancellationToken) -> Self {
        let (remaining, _) = watch::channel(Duration::ZERO);
        Self {
            label,
            cancel,
            remaining,
        }
    }

    /// Remaining time of the current wait, zero when idle
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.remaining.subscribe()
    }

    /// Suspend for `duration` unless cancelled first
    pub async fn wait(&self, duration: Duration) -> WaitOutcome {
        if self.cancel.is_cancelled() {
            return WaitOutcome::Interrupted;
        }
        if duration.is_zero() {
            return WaitOutcome::Elapsed;
        }

        let deadline = Instant::now() + duration;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.remaining.send_replace(duration);

        let mut ticks: u64 = 0;
        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break WaitOutcome::Interrupted,
                _ = &mut sleep => break WaitOutcome::Elapsed,
                _ = ticker.tick() => {
                    ticks += 1;
                    let left = deadline.saturating_duration_since(Instant::now());
                    self.remaining.send_replace(left);
                    if report_due(ticks) {
                        debug!(countdown = self.label, remaining = %format_hms(left), "Waiting");
                    } else {
                        trace!(countdown = self.label, remaining = %format_hms(left));
                    }
                }
            }
        };

        self.remaining.send_replace(Duration::ZERO);
        outcome
    }
}

fn report_due(ticks: u64) -> bool {
    ticks % REPORT_EVERY == 0
}
