//! Agent: both schedulers under supervision
//!
//! Hunting runs as a background task under its own supervisor; the battle
//! supervisor runs in the foreground. When the battle side ends the hunting
//! side is cancelled and joined before returning.

use crate::battle::BattleScheduler;
use crate::hunting::HuntingScheduler;
use crate::supervisor::{Supervisor, SupervisorReport};
use kombat_api::GameApi;
use kombat_core::{KombatConfig, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Restart counts observed over one agent run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentReport {
    pub battle_restarts: u32,
    pub hunting_restarts: u32,
}

pub struct Agent {
    api: Arc<dyn GameApi>,
    config: KombatConfig,
    cancel: CancellationToken,
}

impl Agent {
    pub fn new(api: Arc<dyn GameApi>, config: KombatConfig, cancel: CancellationToken) -> Self {
        Self {
            api,
            config,
            cancel,
        }
    }

    /// Run until interrupted or until the battle side fails fatally
    pub async fn run(&self) -> Result<AgentReport> {
        let hunting_cancel = self.cancel.child_token();
        let hunting = self.spawn_hunting(hunting_cancel.clone());

        let battle = self.run_battle().await;

        hunting_cancel.cancel();
        let hunting_restarts = match hunting {
            Some(handle) => match handle.await {
                Ok(Ok(report)) => report.restarts,
                Ok(Err(e)) => {
                    warn!(error = %e, "Hunting supervisor ended with an error");
                    0
                }
                Err(e) => {
                    warn!(error = %e, "Hunting supervisor task failed");
                    0
                }
            },
            None => 0,
        };

        let battle = battle?;
        info!(
            battle_restarts = battle.restarts,
            hunting_restarts, "Agent stopped"
        );
        Ok(AgentReport {
            battle_restarts: battle.restarts,
            hunting_restarts,
        })
    }

    fn spawn_hunting(
        &self,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<Result<SupervisorReport>>> {
        if !self.config.hunting.enabled {
            info!("Hunting disabled");
            return None;
        }

        let api = self.api.clone();
        let config = self.config.hunting.clone();
        let backoff = self.config.supervisor.restart_backoff();

        Some(tokio::spawn(async move {
            let supervisor = Supervisor::new("hunting", backoff, cancel.clone());
            supervisor
                .supervise(move || {
                    HuntingScheduler::new(api.clone(), config.clone(), cancel.clone()).run()
                })
                .await
        }))
    }

    async fn run_battle(&self) -> Result<SupervisorReport> {
        let supervisor = Supervisor::new(
            "battle",
            self.config.supervisor.restart_backoff(),
            self.cancel.clone(),
        );
        supervisor
            .supervise(|| {
                BattleScheduler::new(
                    self.api.clone(),
                    self.config.battle.clone(),
                    self.cancel.clone(),
                )
                .run()
            })
            .await
    }
}
