//! Battle scheduler
//!
//! One cycle, in fixed order:
//!
//! ```text
//! Init -> CheckEnergy -> ClaimDaily -> ClaimRewards -> FindOpponent -> Fight -> Cooldown
//!              ^   |                                        |                      |
//!              |   +-> AwaitRefill                          +---- no opponent ---->|
//!              +---------------+-------------------------------------------------+
//! ```
//!
//! Only a failed profile check at `Init` is fatal. Every other failure is
//! absorbed inside its state and the cycle moves on.

use crate::clock::{EnergyGate, ResourceClock};
use crate::countdown::{Countdown, WaitOutcome};
use chrono::Utc;
use kombat_api::GameApi;
use kombat_core::config::BattleConfig;
use kombat_core::fail_soft::fail_soft;
use kombat_core::format::{compact_amount, format_hms, material_name};
use kombat_core::{
    BattleResult, ClaimOutcome, FightOutcome, KombatError, Opponent, PlayerProfile, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Battle loop state
#[derive(Debug, Clone, PartialEq)]
pub enum BattleState {
    /// Verify the account by fetching its profile
    Init,
    /// Read energy and decide whether to battle
    CheckEnergy,
    /// Out of energy; wait for the refill
    AwaitRefill { wait: Duration },
    ClaimDaily,
    ClaimRewards,
    FindOpponent,
    Fight { opponent: Opponent },
    /// Pause between cycles
    Cooldown,
    /// Cancellation fired during a wait
    Interrupted,
}

impl BattleState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CheckEnergy => "check_energy",
            Self::AwaitRefill { .. } => "await_refill",
            Self::ClaimDaily => "claim_daily",
            Self::ClaimRewards => "claim_rewards",
            Self::FindOpponent => "find_opponent",
            Self::Fight { .. } => "fight",
            Self::Cooldown => "cooldown",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Counters for one scheduler lifetime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleStats {
    pub cycles: u64,
    pub fights: u64,
    pub wins: u64,
    pub losses: u64,
    pub claims: u64,
    pub last_streak: Option<u32>,
}

/// The foreground battle loop
pub struct BattleScheduler {
    api: Arc<dyn GameApi>,
    config: BattleConfig,
    clock: ResourceClock,
    countdown: Countdown,
    stats: BattleStats,
}

impl BattleScheduler {
    pub fn new(api: Arc<dyn GameApi>, config: BattleConfig, cancel: CancellationToken) -> Self {
        let clock = ResourceClock::new(config.energy_retry());
        Self {
            api,
            config,
            clock,
            countdown: Countdown::new("battle", cancel),
            stats: BattleStats::default(),
        }
    }

    pub fn stats(&self) -> &BattleStats {
        &self.stats
    }

    /// Run from `Init` until interrupted
    ///
    /// Returns `Ok(())` on interrupt and `Err` only for a failed profile check.
    pub async fn run(mut self) -> Result<()> {
        let mut state = BattleState::Init;
        loop {
            debug!(state = state.name(), "battle step");
            state = self.step(state).await?;
            if state == BattleState::Interrupted {
                info!(
                    cycles = self.stats.cycles,
                    fights = self.stats.fights,
                    "Battle loop interrupted"
                );
                return Ok(());
            }
        }
    }

    /// Execute one state and return the next
    pub async fn step(&mut self, state: BattleState) -> Result<BattleState> {
        match state {
            BattleState::Init => self.init().await,
            BattleState::CheckEnergy => Ok(self.check_energy().await),
            BattleState::AwaitRefill { wait } => {
                info!(wait = %format_hms(wait), "Waiting for energy refill");
                Ok(self.after(wait, BattleState::CheckEnergy).await)
            }
            BattleState::ClaimDaily => {
                let outcome = self.api.claim_daily().await;
                self.record_claim("daily", outcome);
                Ok(self.paced(BattleState::ClaimRewards).await)
            }
            BattleState::ClaimRewards => {
                let outcome = self.api.claim_rewards().await;
                self.record_claim("battle rewards", outcome);
                Ok(self.paced(BattleState::FindOpponent).await)
            }
            BattleState::FindOpponent => Ok(self.find_opponent().await),
            BattleState::Fight { opponent } => Ok(self.fight(&opponent).await),
            BattleState::Cooldown => {
                self.stats.cycles += 1;
                debug!(cooldown = ?self.config.cooldown(), "Cycle complete");
                Ok(self.after(self.config.cooldown(), BattleState::CheckEnergy).await)
            }
            BattleState::Interrupted => Ok(BattleState::Interrupted),
        }
    }

    async fn init(&mut self) -> Result<BattleState> {
        let profile = self
            .api
            .profile()
            .await
            .map_err(|e| KombatError::Init(format!("Profile check failed: {}", e)))?;
        log_profile(&profile);
        info!("Battle loop initialized");
        Ok(BattleState::CheckEnergy)
    }

    async fn check_energy(&mut self) -> BattleState {
        let gate = match self.api.energy().await {
            Ok(status) => {
                info!(
                    energy = status.current_energy,
                    next_refill = ?status.next_refill,
                    "Energy status"
                );
                self.clock.assess(&status, Utc::now())
            }
            Err(e) => {
                // Unknown energy is retried soon instead of waiting out a refill
                warn!(error = %e, retry = ?self.clock.fallback(), "Energy check failed");
                EnergyGate::Depleted {
                    wait: self.clock.fallback(),
                }
            }
        };

        match gate {
            EnergyGate::Ready { energy } => {
                debug!(energy, "Energy available");
                BattleState::ClaimDaily
            }
            EnergyGate::Depleted { wait } => {
                info!(wait = %format_hms(wait), "No energy left");
                BattleState::AwaitRefill { wait }
            }
        }
    }

    fn record_claim(&mut self, what: &str, outcome: Result<ClaimOutcome>) {
        match outcome {
            Ok(ClaimOutcome::Claimed(_)) => {
                self.stats.claims += 1;
                info!("Claimed {}", what);
            }
            Ok(ClaimOutcome::AlreadyClaimed) => info!("{} already claimed", what),
            Err(e) => warn!(error = %e, "Claiming {} failed, continuing", what),
        }
    }

    async fn find_opponent(&mut self) -> BattleState {
        match fail_soft("find_opponent", || self.api.find_opponent()).await {
            Some(Some(opponent)) => {
                log_opponent(&opponent);
                self.paced(BattleState::Fight { opponent }).await
            }
            Some(None) => {
                info!("No opponent available, skipping fight");
                BattleState::Cooldown
            }
            None => BattleState::Cooldown,
        }
    }

    async fn fight(&mut self, opponent: &Opponent) -> BattleState {
        info!(opponent = %opponent.username, "Fighting");
        if let Some(result) = fail_soft("fight", || self.api.fight()).await {
            self.record_fight(&result);
        }
        BattleState::Cooldown
    }

    fn record_fight(&mut self, result: &BattleResult) {
        self.stats.fights += 1;
        match result.outcome() {
            FightOutcome::Win => self.stats.wins += 1,
            FightOutcome::Lose => self.stats.losses += 1,
        }

        info!(
            outcome = %result.outcome(),
            wins = self.stats.wins,
            losses = self.stats.losses,
            "Battle result"
        );
        for (item, amount) in result.materials() {
            info!("  reward {}: {}", material_name(item), compact_amount(amount));
        }
        if let Some(streak) = &result.win_streak {
            self.stats.last_streak = Some(streak.no);
            info!(
                streak = streak.no,
                bonus = %compact_amount(streak.streak_amount),
                "Win streak"
            );
        }
    }

    async fn paced(&self, next: BattleState) -> BattleState {
        self.after(self.config.pacing(), next).await
    }

    async fn after(&self, wait: Duration, next: BattleState) -> BattleState {
        match self.countdown.wait(wait).await {
            WaitOutcome::Elapsed => next,
            WaitOutcome::Interrupted => BattleState::Interrupted,
        }
    }
}

fn log_profile(profile: &PlayerProfile) {
    info!(
        username = %profile.username,
        rank = %profile.rank,
        attack = %format!("Lv.{} ({} PWR)", profile.attack_level, profile.attack_point),
        health = %format!("Lv.{} ({} HP)", profile.health_level, profile.health_point),
        luck = profile.luck_level,
        "Player profile"
    );
    debug!(
        evade = profile.luck_evade_rate,
        critical = profile.luck_critical_rate,
        reflect = profile.reflect_rate,
        life_steal = profile.life_steal,
        "Battle rates (%)"
    );
    if let Some(pet) = &profile.pet {
        info!(
            pet = %pet.kind,
            skill = %pet.active_skill,
            abilities = %pet.skills.join(", "),
            "Active pet"
        );
    }
}

fn log_opponent(opponent: &Opponent) {
    info!(
        username = %opponent.username,
        rank = %opponent.rank,
        attack = %format!("Lv.{} ({} PWR)", opponent.attack_level, opponent.attack_point),
        health = %format!("Lv.{} ({} HP)", opponent.health_level, opponent.health_point),
        luck = opponent.luck_level,
        pet = opponent.pet.as_ref().map(|p| p.kind.as_str()).unwrap_or("-"),
        "Opponent found"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use kombat_api::{Endpoint, MockGameApi, MockReply};
    use kombat_core::{EnergyStatus, WinStreak};
    use tokio::time::Instant;

    fn profile() -> PlayerProfile {
        PlayerProfile {
            username: "rook".into(),
            rank: "Gold".into(),
            ..Default::default()
        }
    }

    fn opponent() -> Opponent {
        Opponent {
            username: "bishop".into(),
            ..Default::default()
        }
    }

    fn energy(current: u32, refill_in_secs: i64) -> EnergyStatus {
        EnergyStatus {
            current_energy: current,
            next_refill: Some(Utc::now() + TimeDelta::seconds(refill_in_secs)),
        }
    }

    fn win() -> BattleResult {
        BattleResult {
            winner: "attacker".into(),
            drops: None,
            win_streak: Some(WinStreak {
                no: 3,
                streak_amount: 1500.0,
            }),
        }
    }

    /// Service where every action succeeds and energy never runs out
    fn healthy_api() -> MockGameApi {
        MockGameApi::new()
            .with_profile(MockReply::Ok(profile()))
            .with_energy(MockReply::Ok(energy(5, 600)))
            .with_claim_daily(MockReply::Ok(ClaimOutcome::Claimed(serde_json::Value::Null)))
            .with_claim_rewards(MockReply::Ok(ClaimOutcome::AlreadyClaimed))
            .with_opponent(MockReply::Ok(Some(opponent())))
            .with_fight(MockReply::Ok(win()))
    }

    fn scheduler(api: Arc<MockGameApi>) -> BattleScheduler {
        BattleScheduler::new(api, BattleConfig::default(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_success_moves_to_check_energy() {
        let api = Arc::new(healthy_api());
        let mut battle = scheduler(api.clone());

        let next = battle.step(BattleState::Init).await.unwrap();

        assert_eq!(next, BattleState::CheckEnergy);
        assert_eq!(api.endpoints(), vec![Endpoint::Profile]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_failure_is_fatal() {
        let api = Arc::new(MockGameApi::new().with_profile(MockReply::Status(401)));
        let err = scheduler(api.clone()).run().await.unwrap_err();

        assert!(matches!(err, KombatError::Init(_)));
        assert!(err.is_fatal());
        assert_eq!(api.endpoints(), vec![Endpoint::Profile]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_energy_reaches_fight_without_refill_wait() {
        let api = Arc::new(healthy_api());
        let mut battle = scheduler(api.clone());

        let mut state = BattleState::CheckEnergy;
        let mut visited = Vec::new();
        while !matches!(state, BattleState::Cooldown) {
            state = battle.step(state).await.unwrap();
            visited.push(state.name());
        }

        assert_eq!(
            visited,
            vec!["claim_daily", "claim_rewards", "find_opponent", "fight", "cooldown"]
        );
        assert_eq!(
            api.endpoints(),
            vec![
                Endpoint::Energy,
                Endpoint::ClaimDaily,
                Endpoint::ClaimRewards,
                Endpoint::FindOpponent,
                Endpoint::Fight,
            ]
        );
        assert_eq!(battle.stats().fights, 1);
        assert_eq!(battle.stats().wins, 1);
        assert_eq!(battle.stats().last_streak, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_depleted_energy_waits_until_refill() {
        let api = Arc::new(
            MockGameApi::new()
                .with_energy(MockReply::Ok(energy(0, 5)))
                .with_energy(MockReply::Ok(energy(1, 600))),
        );
        let mut battle = scheduler(api.clone());

        let next = battle.step(BattleState::CheckEnergy).await.unwrap();
        let BattleState::AwaitRefill { wait } = next.clone() else {
            panic!("expected AwaitRefill, got {:?}", next);
        };
        assert!(wait <= Duration::from_secs(5));
        assert!(wait >= Duration::from_secs(4));

        let start = Instant::now();
        let next = battle.step(next).await.unwrap();
        assert_eq!(next, BattleState::CheckEnergy);
        assert!(start.elapsed() >= wait);
        assert!(start.elapsed() <= wait + Duration::from_millis(1));

        // Energy is read again rather than assumed refilled
        let next = battle.step(next).await.unwrap();
        assert_eq!(next, BattleState::ClaimDaily);
        assert_eq!(api.count(Endpoint::Energy), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_refill_waits_zero() {
        let api = Arc::new(MockGameApi::new().with_energy(MockReply::Ok(energy(0, -30))));
        let mut battle = scheduler(api);

        let next = battle.step(BattleState::CheckEnergy).await.unwrap();
        assert_eq!(next, BattleState::AwaitRefill { wait: Duration::ZERO });
    }

    #[tokio::test(start_paused = true)]
    async fn test_energy_failure_uses_short_retry() {
        let api = Arc::new(
            MockGameApi::new()
                .with_energy(MockReply::Network)
                .with_energy(MockReply::Ok(EnergyStatus {
                    current_energy: 0,
                    next_refill: None,
                })),
        );
        let mut battle = scheduler(api);
        let retry = BattleConfig::default().energy_retry();

        let next = battle.step(BattleState::CheckEnergy).await.unwrap();
        assert_eq!(next, BattleState::AwaitRefill { wait: retry });

        // Malformed refill timestamp also falls back to the short retry
        let next = battle.step(BattleState::CheckEnergy).await.unwrap();
        assert_eq!(next, BattleState::AwaitRefill { wait: retry });
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_claimed_continues_with_fixed_pacing() {
        let api = Arc::new(
            MockGameApi::new()
                .with_claim_daily(MockReply::Ok(ClaimOutcome::AlreadyClaimed))
                .with_claim_rewards(MockReply::Ok(ClaimOutcome::AlreadyClaimed)),
        );
        let mut battle = scheduler(api.clone());
        let start = Instant::now();

        let next = battle.step(BattleState::ClaimDaily).await.unwrap();

        assert_eq!(next, BattleState::ClaimRewards);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(battle.stats().claims, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claims_treat_every_outcome_alike() {
        let outcomes = [
            MockReply::Ok(ClaimOutcome::Claimed(serde_json::Value::Null)),
            MockReply::Ok(ClaimOutcome::AlreadyClaimed),
            MockReply::Status(500),
            MockReply::Network,
        ];

        for reply in outcomes {
            let api = Arc::new(
                MockGameApi::new()
                    .with_claim_daily(reply.clone())
                    .with_claim_rewards(reply),
            );
            let mut battle = scheduler(api);

            assert_eq!(
                battle.step(BattleState::ClaimDaily).await.unwrap(),
                BattleState::ClaimRewards
            );
            assert_eq!(
                battle.step(BattleState::ClaimRewards).await.unwrap(),
                BattleState::FindOpponent
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_opponent_failure_skips_fight() {
        let api = Arc::new(MockGameApi::new().with_opponent(MockReply::Network));
        let mut battle = scheduler(api.clone());
        let start = Instant::now();

        let next = battle.step(BattleState::FindOpponent).await.unwrap();

        assert_eq!(next, BattleState::Cooldown);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(api.count(Endpoint::Fight), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_opponent_skips_fight() {
        let api = Arc::new(MockGameApi::new().with_opponent(MockReply::Ok(None)));
        let mut battle = scheduler(api);

        assert_eq!(
            battle.step(BattleState::FindOpponent).await.unwrap(),
            BattleState::Cooldown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fight_failure_proceeds_to_cooldown() {
        let api = Arc::new(MockGameApi::new().with_fight(MockReply::Status(502)));
        let mut battle = scheduler(api.clone());

        let next = battle
            .step(BattleState::Fight {
                opponent: opponent(),
            })
            .await
            .unwrap();

        assert_eq!(next, BattleState::Cooldown);
        assert_eq!(api.count(Endpoint::Fight), 1);
        assert_eq!(battle.stats().fights, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_waits_then_rechecks_energy() {
        let api = Arc::new(MockGameApi::new());
        let mut battle = scheduler(api);
        let start = Instant::now();

        let next = battle.step(BattleState::Cooldown).await.unwrap();

        assert_eq!(next, BattleState::CheckEnergy);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(battle.stats().cycles, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_fight_per_cycle() {
        let api = Arc::new(healthy_api());
        let cancel = CancellationToken::new();
        let battle = BattleScheduler::new(api.clone(), BattleConfig::default(), cancel.clone());

        let stopper = tokio::spawn(async move {
            // Three full cycles: 3 x (2s + 2s + 2s pacing + 10s cooldown)
            tokio::time::sleep(Duration::from_secs(47)).await;
            cancel.cancel();
        });

        battle.run().await.unwrap();
        stopper.await.unwrap();

        assert_eq!(api.count(Endpoint::Profile), 1);
        assert_eq!(api.count(Endpoint::Energy), 3);
        assert_eq!(api.count(Endpoint::FindOpponent), 3);
        assert_eq!(api.count(Endpoint::Fight), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_refill_exits_cleanly() {
        let api = Arc::new(
            MockGameApi::new()
                .with_profile(MockReply::Ok(profile()))
                .with_energy(MockReply::Ok(energy(0, 3600))),
        );
        let cancel = CancellationToken::new();
        let battle = BattleScheduler::new(api.clone(), BattleConfig::default(), cancel.clone());

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            cancel.cancel();
        });

        let start = Instant::now();
        assert!(battle.run().await.is_ok());
        stopper.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(api.count(Endpoint::Energy), 1);
        assert_eq!(api.count(Endpoint::ClaimDaily), 0);
    }
}
