//! Remote game state snapshots
//!
//! Field names follow the wire format of the game service. Every value here is
//! a snapshot taken at request time; nothing is cached between calls.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Equipped companion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub active_skill: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// The account's own combat profile (`GET /combats/me`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub username: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub rank: String,
    #[serde(default)]
    pub attack_level: u32,
    #[serde(default)]
    pub attack_point: f64,
    #[serde(default)]
    pub health_level: u32,
    #[serde(default)]
    pub health_point: f64,
    #[serde(default)]
    pub luck_level: u32,
    #[serde(default)]
    pub luck_evade_rate: f64,
    #[serde(default)]
    pub luck_critical_rate: f64,
    #[serde(default)]
    pub reflect_rate: f64,
    #[serde(default)]
    pub life_steal: f64,
    #[serde(default)]
    pub pet: Option<Pet>,
}

/// A matchmaking opponent (`GET /combats/find`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub username: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub rank: String,
    #[serde(default)]
    pub attack_level: u32,
    #[serde(default)]
    pub attack_point: f64,
    #[serde(default)]
    pub health_level: u32,
    #[serde(default)]
    pub health_point: f64,
    #[serde(default)]
    pub luck_level: u32,
    #[serde(default)]
    pub pet: Option<Pet>,
}

/// Energy pool (`GET /combats/energy`)
///
/// `next_refill` is `None` when the server omits the timestamp or sends one
/// that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyStatus {
    #[serde(default)]
    pub current_energy: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub next_refill: Option<DateTime<Utc>>,
}

impl EnergyStatus {
    /// At least one unit of energy is available
    pub fn can_battle(&self) -> bool {
        self.current_energy >= 1
    }
}

/// Fight outcome from the attacker's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FightOutcome {
    Win,
    Lose,
}

impl std::fmt::Display for FightOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Win => write!(f, "win"),
            Self::Lose => write!(f, "lose"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drops {
    #[serde(default)]
    pub materials: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinStreak {
    #[serde(default)]
    pub no: u32,
    #[serde(default)]
    pub streak_amount: f64,
}

/// Result of a resolved fight (`POST /combats/fight`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    /// "attacker" when this account won
    #[serde(default)]
    pub winner: String,
    #[serde(default)]
    pub drops: Option<Drops>,
    #[serde(default)]
    pub win_streak: Option<WinStreak>,
}

impl BattleResult {
    pub fn outcome(&self) -> FightOutcome {
        if self.winner == "attacker" {
            FightOutcome::Win
        } else {
            FightOutcome::Lose
        }
    }

    /// Dropped materials, empty when nothing dropped
    pub fn materials(&self) -> impl Iterator<Item = (&str, f64)> {
        self.drops
            .iter()
            .flat_map(|d| d.materials.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

/// Outcome of an idempotent reward claim
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// Reward granted, with whatever payload the server returned
    Claimed(serde_json::Value),
    /// Nothing to claim in the current eligibility window
    AlreadyClaimed,
}

/// Hunting session lifecycle as reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HuntingStatus {
    #[default]
    NotStarted,
    InProgress,
    /// Finished, payout not yet claimed
    Complete,
    /// Finished and paid out
    Claimed,
}

impl std::fmt::Display for HuntingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Claimed => write!(f, "claimed"),
        }
    }
}

impl std::str::FromStr for HuntingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hunting" | "in_progress" | "in-progress" | "inprogress" => Ok(Self::InProgress),
            "complete" | "completed" | "done" | "finished" => Ok(Self::Complete),
            "claimed" => Ok(Self::Claimed),
            "not_started" | "not-started" | "idle" | "none" | "" => Ok(Self::NotStarted),
            _ => Err(format!("Invalid hunting status: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for HuntingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        // Unknown statuses mean "no active session" so the scheduler may start one
        Ok(raw
            .and_then(|s| s.parse().ok())
            .unwrap_or(HuntingStatus::NotStarted))
    }
}

/// Current hunting session (`GET /hunting/me/hunting`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HuntingSession {
    #[serde(default)]
    pub status: HuntingStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

impl HuntingSession {
    pub fn is_active(&self) -> bool {
        self.status == HuntingStatus::InProgress
    }

    /// Finished with a payout still waiting to be claimed
    pub fn is_claimable(&self) -> bool {
        self.status == HuntingStatus::Complete
    }
}

/// Payout of a completed hunting session (`POST /hunting/claim/{location}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HuntingRewardReceipt {
    #[serde(default)]
    pub stars: f64,
    #[serde(default)]
    pub reward_tok: f64,
    #[serde(default)]
    pub total_demon_killed: u64,
}

/// Parse a server timestamp into UTC
///
/// Accepts RFC 3339 (with `Z` or an offset) and naive ISO-8601, which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
