//! Game service abstraction

use async_trait::async_trait;
use kombat_core::{
    BattleResult, ClaimOutcome, EnergyStatus, HuntingRewardReceipt, HuntingSession, Opponent,
    PlayerProfile, Result,
};

/// Remote endpoints used by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Profile,
    ClaimDaily,
    ClaimRewards,
    FindOpponent,
    Fight,
    Energy,
    HuntingStatus,
    StartHunting,
    ClaimHunting,
}

impl Endpoint {
    /// Request path relative to the base URL; `{location}` is filled in by the client
    pub fn path(&self) -> &'static str {
        match self {
            Self::Profile => "/combats/me",
            Self::ClaimDaily => "/daily",
            Self::ClaimRewards => "/users/claim",
            Self::FindOpponent => "/combats/find",
            Self::Fight => "/combats/fight",
            Self::Energy => "/combats/energy",
            Self::HuntingStatus => "/hunting/me/hunting",
            Self::StartHunting => "/hunting/start",
            Self::ClaimHunting => "/hunting/claim",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Authenticated access to one game account (allows mocking in tests)
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn profile(&self) -> Result<PlayerProfile>;

    async fn claim_daily(&self) -> Result<ClaimOutcome>;

    async fn claim_rewards(&self) -> Result<ClaimOutcome>;

    /// `None` when matchmaking has nobody to offer
    async fn find_opponent(&self) -> Result<Option<Opponent>>;

    async fn fight(&self) -> Result<BattleResult>;

    async fn energy(&self) -> Result<EnergyStatus>;

    /// `None` when the account has no hunting session at all
    async fn hunting_status(&self) -> Result<Option<HuntingSession>>;

    /// Start a session. The server may or may not echo the new session back.
    async fn start_hunting(&self, location: &str) -> Result<Option<HuntingSession>>;

    async fn claim_hunting(&self, location: &str) -> Result<HuntingRewardReceipt>;
}
