//! Configuration management for kombat
//!
//! All settings have defaults, so the agent runs without a config file. When
//! present, `kombat.toml` overrides any subset of them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{KombatError, Result};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "kombat.toml";

/// Agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KombatConfig {
    /// Remote service and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Battle loop pacing
    #[serde(default)]
    pub battle: BattleConfig,

    /// Hunting loop settings
    #[serde(default)]
    pub hunting: HuntingConfig,

    /// Restart policy
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

/// Remote service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_referer")]
    pub referer: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// File holding the account's query token
    #[serde(default = "default_query_file")]
    pub query_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Delay between consecutive actions within one cycle
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,

    /// Delay between cycles
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Wait used when the energy reading is unusable
    #[serde(default = "default_retry_secs")]
    pub energy_retry_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuntingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Where new sessions are started
    #[serde(default = "default_location")]
    pub location: String,

    /// Used for claims when the session does not report its location
    #[serde(default = "default_claim_location")]
    pub claim_location: String,

    #[serde(default = "default_retry_secs")]
    pub retry_backoff_secs: u64,

    /// Claim attempts before giving up and re-observing
    #[serde(default = "default_claim_attempts")]
    pub claim_attempts: u32,

    /// Slack added after the session end time before re-checking
    #[serde(default = "default_wake_grace_secs")]
    pub wake_grace_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_restart_backoff_secs")]
    pub restart_backoff_secs: u64,
}

// Default value providers
fn default_base_url() -> String {
    "https://liyue.tonkombat.com/api/v1".to_string()
}

fn default_origin() -> String {
    "https://staggering.tonkombat.com".to_string()
}

fn default_referer() -> String {
    "https://staggering.tonkombat.com/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        .to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_query_file() -> PathBuf {
    PathBuf::from("query.txt")
}

fn default_pacing_secs() -> u64 {
    2
}

fn default_cooldown_secs() -> u64 {
    10
}

fn default_retry_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_location() -> String {
    "eternal-abyss-gate".to_string()
}

fn default_claim_location() -> String {
    "demonbane-keep".to_string()
}

fn default_claim_attempts() -> u32 {
    3
}

fn default_wake_grace_secs() -> u64 {
    1
}

fn default_restart_backoff_secs() -> u64 {
    60
}

impl KombatConfig {
    /// Load configuration from `path`, failing if it cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KombatError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load `kombat.toml` from `dir`, or use defaults when it does not exist
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| KombatError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `dir/kombat.toml`
    pub fn write_default(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| KombatError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(KombatError::Config("api.base_url must not be empty".into()));
        }
        if self.hunting.location.trim().is_empty() {
            return Err(KombatError::Config("hunting.location must not be empty".into()));
        }
        if self.hunting.claim_attempts == 0 {
            return Err(KombatError::Config(
                "hunting.claim_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl BattleConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn energy_retry(&self) -> Duration {
        Duration::from_secs(self.energy_retry_secs)
    }
}

impl HuntingConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn wake_grace(&self) -> Duration {
        Duration::from_secs(self.wake_grace_secs)
    }
}

impl SupervisorConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            origin: default_origin(),
            referer: default_referer(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            request_timeout_secs: default_request_timeout_secs(),
            query_file: default_query_file(),
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            pacing_secs: default_pacing_secs(),
            cooldown_secs: default_cooldown_secs(),
            energy_retry_secs: default_retry_secs(),
        }
    }
}

impl Default for HuntingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: default_location(),
            claim_location: default_claim_location(),
            retry_backoff_secs: default_retry_secs(),
            claim_attempts: default_claim_attempts(),
            wake_grace_secs: default_wake_grace_secs(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_backoff_secs: default_restart_backoff_secs(),
        }
    }
}
