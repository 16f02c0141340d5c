//! Restart policy for one scheduler
//!
//! [`Supervisor::supervise`] is an explicit loop. Each iteration builds a
//! fresh scheduler future, spawns it, and waits for it to finish. Errors and
//! panics lead to a fixed backoff and another iteration; state never carries
//! over from one run to the next.

use crate::countdown::{Countdown, WaitOutcome};
use kombat_core::{KombatError, Result};
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of a supervised scheduler that ended without a fatal error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub restarts: u32,
}

pub struct Supervisor {
    name: &'static str,
    backoff: Duration,
    cancel: CancellationToken,
    countdown: Countdown,
}

impl Supervisor {
    pub fn new(name: &'static str, backoff: Duration, cancel: CancellationToken) -> Self {
        Self {
            name,
            backoff,
            countdown: Countdown::new(name, cancel.clone()),
            cancel,
        }
    }

    /// Keep a scheduler running until it is interrupted or fails fatally
    ///
    /// `make_run` is called once per run and must build everything from
    /// scratch. A run that returns `Ok(())` was interrupted and ends
    /// supervision. A fatal error is returned to the caller as is.
    pub async fn supervise<F, Fut>(&self, mut make_run: F) -> Result<SupervisorReport>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut report = SupervisorReport::default();

        loop {
            info!(scheduler = self.name, restarts = report.restarts, "Starting scheduler");
            let mut handle = tokio::spawn(make_run());

            let joined = tokio::select! {
                joined = &mut handle => joined,
                _ = self.cancel.cancelled() => {
                    handle.abort();
                    let _ = handle.await;
                    info!(scheduler = self.name, "Scheduler stopped");
                    return Ok(report);
                }
            };

            let failure = match joined {
                Ok(Ok(())) => {
                    info!(scheduler = self.name, "Scheduler stopped");
                    return Ok(report);
                }
                Ok(Err(e)) if e.is_fatal() => {
                    error!(scheduler = self.name, error = %e, "Scheduler failed fatally");
                    return Err(e);
                }
                Ok(Err(e)) => e,
                Err(e) => task_failure(e),
            };
            error!(scheduler = self.name, error = %failure, "Scheduler failed");

            report.restarts += 1;
            warn!(
                scheduler = self.name,
                backoff = ?self.backoff,
                restarts = report.restarts,
                "Restarting scheduler from its initial state after backoff"
            );
            if self.countdown.wait(self.backoff).await == WaitOutcome::Interrupted {
                info!(scheduler = self.name, "Interrupted during restart backoff");
                return Ok(report);
            }
        }
    }
}

/// A scheduler task that panicked or was aborted, as a restartable error
fn task_failure(e: JoinError) -> KombatError {
    if e.is_panic() {
        KombatError::Scheduler(format!("panicked: {}", panic_message(e.into_panic())))
    } else {
        KombatError::Scheduler(format!("task ended unexpectedly: {}", e))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
