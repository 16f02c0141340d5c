//! Hunting scheduler
//!
//! Runs in the background for the life of the process. A session is started,
//! waited out with a single sleep until its end time, then claimed:
//!
//! ```text
//! NotHunting -> InProgress { end_time } -> ReadyToClaim { attempt } -> NotHunting
//! ```
//!
//! The service allows one session per account, and a finished session must be
//! paid out before the next one starts. The scheduler only starts a session
//! after a successful status read that shows none running and none unclaimed.

use crate::clock::time_until;
use crate::countdown::{Countdown, WaitOutcome};
use chrono::{DateTime, Utc};
use kombat_api::GameApi;
use kombat_core::config::HuntingConfig;
use kombat_core::format::{compact_amount, format_hms};
use kombat_core::{HuntingRewardReceipt, HuntingSession, HuntingStatus, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a start the server accepted without describing the session
const SETTLE: Duration = Duration::from_secs(2);

/// Hunting loop state
#[derive(Debug, Clone, PartialEq)]
pub enum HuntingState {
    NotHunting,
    InProgress {
        end_time: DateTime<Utc>,
        location: Option<String>,
    },
    ReadyToClaim {
        location: Option<String>,
        attempt: u32,
    },
    Interrupted,
}

impl HuntingState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotHunting => "not_hunting",
            Self::InProgress { .. } => "in_progress",
            Self::ReadyToClaim { .. } => "ready_to_claim",
            Self::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HuntingStats {
    pub sessions_started: u64,
    pub claims: u64,
    pub stars: f64,
    pub tok: f64,
}

/// The background hunting loop
pub struct HuntingScheduler {
    api: Arc<dyn GameApi>,
    config: HuntingConfig,
    countdown: Countdown,
    stats: HuntingStats,
}

impl HuntingScheduler {
    pub fn new(api: Arc<dyn GameApi>, config: HuntingConfig, cancel: CancellationToken) -> Self {
        Self {
            api,
            config,
            countdown: Countdown::new("hunting", cancel),
            stats: HuntingStats::default(),
        }
    }

    pub fn stats(&self) -> &HuntingStats {
        &self.stats
    }

    /// Run from `NotHunting` until interrupted
    pub async fn run(mut self) -> Result<()> {
        let mut state = HuntingState::NotHunting;
        loop {
            debug!(state = state.name(), "hunting step");
            state = self.step(state).await?;
            if state == HuntingState::Interrupted {
                info!(
                    sessions = self.stats.sessions_started,
                    claims = self.stats.claims,
                    "Hunting loop interrupted"
                );
                return Ok(());
            }
        }
    }

    /// Execute one state and return the next
    pub async fn step(&mut self, state: HuntingState) -> Result<HuntingState> {
        let next = match state {
            HuntingState::NotHunting => self.observe().await,
            HuntingState::InProgress { end_time, location } => {
                self.await_end(end_time, location).await
            }
            HuntingState::ReadyToClaim { location, attempt } => {
                self.claim(location, attempt).await
            }
            HuntingState::Interrupted => HuntingState::Interrupted,
        };
        Ok(next)
    }

    async fn observe(&mut self) -> HuntingState {
        match self.api.hunting_status().await {
            Ok(Some(session)) if session.is_active() => match session.end_time {
                Some(end_time) => {
                    info!(
                        end_time = %end_time,
                        location = session.location.as_deref().unwrap_or("-"),
                        "Hunting session in progress"
                    );
                    HuntingState::InProgress {
                        end_time,
                        location: session.location,
                    }
                }
                None => {
                    warn!("Hunting session has no usable end time, retrying later");
                    self.backoff(HuntingState::NotHunting).await
                }
            },
            Ok(Some(session)) if session.is_claimable() => {
                info!(
                    location = session.location.as_deref().unwrap_or("-"),
                    "Hunting session finished, payout unclaimed"
                );
                HuntingState::ReadyToClaim {
                    location: session.location,
                    attempt: 0,
                }
            }
            Ok(session) => {
                let status = session.map(|s| s.status).unwrap_or_default();
                debug!(status = %status, "No active hunting session");
                self.start().await
            }
            Err(e) => {
                warn!(error = %e, "Hunting status check failed");
                self.backoff(HuntingState::NotHunting).await
            }
        }
    }

    async fn start(&mut self) -> HuntingState {
        let location = self.config.location.clone();
        info!(location = %location, "Starting hunting session");

        match self.api.start_hunting(&location).await {
            Ok(Some(HuntingSession {
                end_time: Some(end_time),
                location: reported,
                ..
            })) => {
                self.stats.sessions_started += 1;
                info!(end_time = %end_time, "Hunting started");
                HuntingState::InProgress {
                    end_time,
                    location: reported,
                }
            }
            Ok(_) => {
                self.stats.sessions_started += 1;
                info!("Hunting start accepted");
                self.after(SETTLE, HuntingState::NotHunting).await
            }
            Err(e) => {
                warn!(error = %e, location = %location, "Starting hunting failed");
                self.backoff(HuntingState::NotHunting).await
            }
        }
    }

    async fn await_end(
        &mut self,
        end_time: DateTime<Utc>,
        location: Option<String>,
    ) -> HuntingState {
        let now = Utc::now();
        if now >= end_time {
            return HuntingState::ReadyToClaim {
                location,
                attempt: 0,
            };
        }

        let remaining = time_until(end_time, now);
        info!(remaining = %format_hms(remaining), "Waiting for hunting to finish");
        if self.countdown.wait(remaining + self.config.wake_grace()).await
            == WaitOutcome::Interrupted
        {
            return HuntingState::Interrupted;
        }

        self.recheck(end_time, location).await
    }

    /// Status after the expected end; the server clock has the final word
    async fn recheck(
        &mut self,
        end_time: DateTime<Utc>,
        location: Option<String>,
    ) -> HuntingState {
        match self.api.hunting_status().await {
            Ok(Some(session)) => match session.status {
                HuntingStatus::InProgress => HuntingState::InProgress {
                    end_time: session.end_time.unwrap_or(end_time),
                    location: session.location.or(location),
                },
                HuntingStatus::Complete => HuntingState::ReadyToClaim {
                    location: session.location.or(location),
                    attempt: 0,
                },
                HuntingStatus::Claimed | HuntingStatus::NotStarted => HuntingState::NotHunting,
            },
            Ok(None) => HuntingState::NotHunting,
            Err(e) => {
                warn!(error = %e, "Hunting status recheck failed, claiming anyway");
                HuntingState::ReadyToClaim {
                    location,
                    attempt: 0,
                }
            }
        }
    }

    async fn claim(&mut self, location: Option<String>, attempt: u32) -> HuntingState {
        let target = location
            .clone()
            .unwrap_or_else(|| self.config.claim_location.clone());

        match self.api.claim_hunting(&target).await {
            Ok(receipt) => {
                self.record_claim(&receipt);
                HuntingState::NotHunting
            }
            Err(e) if attempt + 1 < self.config.claim_attempts => {
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max = self.config.claim_attempts,
                    "Claiming hunting reward failed, retrying"
                );
                self.backoff(HuntingState::ReadyToClaim {
                    location,
                    attempt: attempt + 1,
                })
                .await
            }
            Err(e) => {
                warn!(error = %e, "Claiming hunting reward failed, giving up on this session");
                HuntingState::NotHunting
            }
        }
    }

    fn record_claim(&mut self, receipt: &HuntingRewardReceipt) {
        self.stats.claims += 1;
        self.stats.stars += receipt.stars;
        self.stats.tok += receipt.reward_tok;
        info!(
            stars = %compact_amount(receipt.stars),
            tok = %compact_amount(receipt.reward_tok),
            demons = receipt.total_demon_killed,
            "Hunting reward claimed"
        );
    }

    async fn backoff(&self, next: HuntingState) -> HuntingState {
        self.after(self.config.retry_backoff(), next).await
    }

    async fn after(&self, wait: Duration, next: HuntingState) -> HuntingState {
        match self.countdown.wait(wait).await {
            WaitOutcome::Elapsed => next,
            WaitOutcome::Interrupted => HuntingState::Interrupted,
        }
    }
}
