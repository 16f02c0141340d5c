//! Scripted game service for testing
//!
//! Each endpoint has its own reply queue. Replies are consumed in order and the
//! last one repeats forever, so a single scripted reply acts as a steady state.

use crate::api::{Endpoint, GameApi};
use async_trait::async_trait;
use kombat_core::{
    BattleResult, ClaimOutcome, EnergyStatus, HuntingRewardReceipt, HuntingSession, KombatError,
    Opponent, PlayerProfile, Result,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply<T> {
    Ok(T),
    /// Non-2xx answer from the service
    Status(u16),
    /// Transport failure
    Network,
    /// Panic inside the call, standing in for an unexpected failure
    Panic,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub endpoint: Endpoint,
    pub location: Option<String>,
    pub at: Instant,
}

struct Script<T> {
    replies: VecDeque<MockReply<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: VecDeque::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<MockReply<T>> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

#[derive(Default)]
struct Scripts {
    profile: Script<PlayerProfile>,
    claim_daily: Script<ClaimOutcome>,
    claim_rewards: Script<ClaimOutcome>,
    find_opponent: Script<Option<Opponent>>,
    fight: Script<BattleResult>,
    energy: Script<EnergyStatus>,
    hunting_status: Script<Option<HuntingSession>>,
    start_hunting: Script<Option<HuntingSession>>,
    claim_hunting: Script<HuntingRewardReceipt>,
}

/// Mock game service for testing
#[derive(Default)]
pub struct MockGameApi {
    scripts: Mutex<Scripts>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockGameApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, reply: MockReply<PlayerProfile>) -> Self {
        self.script(|s| s.profile.replies.push_back(reply))
    }

    pub fn with_claim_daily(self, reply: MockReply<ClaimOutcome>) -> Self {
        self.script(|s| s.claim_daily.replies.push_back(reply))
    }

    pub fn with_claim_rewards(self, reply: MockReply<ClaimOutcome>) -> Self {
        self.script(|s| s.claim_rewards.replies.push_back(reply))
    }

    pub fn with_opponent(self, reply: MockReply<Option<Opponent>>) -> Self {
        self.script(|s| s.find_opponent.replies.push_back(reply))
    }

    pub fn with_fight(self, reply: MockReply<BattleResult>) -> Self {
        self.script(|s| s.fight.replies.push_back(reply))
    }

    pub fn with_energy(self, reply: MockReply<EnergyStatus>) -> Self {
        self.script(|s| s.energy.replies.push_back(reply))
    }

    pub fn with_hunting_status(self, reply: MockReply<Option<HuntingSession>>) -> Self {
        self.script(|s| s.hunting_status.replies.push_back(reply))
    }

    pub fn with_start_hunting(self, reply: MockReply<Option<HuntingSession>>) -> Self {
        self.script(|s| s.start_hunting.replies.push_back(reply))
    }

    pub fn with_claim_hunting(self, reply: MockReply<HuntingRewardReceipt>) -> Self {
        self.script(|s| s.claim_hunting.replies.push_back(reply))
    }

    /// All calls in the order they were made
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Endpoints in call order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Calls made to one endpoint
    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    fn script(mut self, f: impl FnOnce(&mut Scripts)) -> Self {
        f(self.scripts.get_mut().unwrap());
        self
    }

    fn reply<T: Clone>(
        &self,
        endpoint: Endpoint,
        location: Option<&str>,
        pick: impl FnOnce(&mut Scripts) -> &mut Script<T>,
    ) -> Result<T> {
        self.calls.lock().unwrap().push(MockCall {
            endpoint,
            location: location.map(str::to_string),
            at: Instant::now(),
        });

        // Guard dropped before a scripted panic so the mock stays usable
        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            pick(&mut scripts).next()
        };

        match reply {
            Some(MockReply::Ok(value)) => Ok(value),
            Some(MockReply::Status(status)) => Err(KombatError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: "mock status".to_string(),
            }),
            Some(MockReply::Network) => Err(KombatError::Http(format!(
                "{} request failed: mock network error",
                endpoint
            ))),
            Some(MockReply::Panic) => panic!("mock panic in {}", endpoint),
            None => Err(KombatError::Other(format!(
                "No mock response for: {}",
                endpoint
            ))),
        }
    }
}

#[async_trait]
impl GameApi for MockGameApi {
    async fn profile(&self) -> Result<PlayerProfile> {
        self.reply(Endpoint::Profile, None, |s| &mut s.profile)
    }

    async fn claim_daily(&self) -> Result<ClaimOutcome> {
        self.reply(Endpoint::ClaimDaily, None, |s| &mut s.claim_daily)
    }

    async fn claim_rewards(&self) -> Result<ClaimOutcome> {
        self.reply(Endpoint::ClaimRewards, None, |s| &mut s.claim_rewards)
    }

    async fn find_opponent(&self) -> Result<Option<Opponent>> {
        self.reply(Endpoint::FindOpponent, None, |s| &mut s.find_opponent)
    }

    async fn fight(&self) -> Result<BattleResult> {
        self.reply(Endpoint::Fight, None, |s| &mut s.fight)
    }

    async fn energy(&self) -> Result<EnergyStatus> {
        self.reply(Endpoint::Energy, None, |s| &mut s.energy)
    }

    async fn hunting_status(&self) -> Result<Option<HuntingSession>> {
        self.reply(Endpoint::HuntingStatus, None, |s| &mut s.hunting_status)
    }

    async fn start_hunting(&self, location: &str) -> Result<Option<HuntingSession>> {
        self.reply(Endpoint::StartHunting, Some(location), |s| {
            &mut s.start_hunting
        })
    }

    async fn claim_hunting(&self, location: &str) -> Result<HuntingRewardReceipt> {
        self.reply(Endpoint::ClaimHunting, Some(location), |s| {
            &mut s.claim_hunting
        })
    }
}
