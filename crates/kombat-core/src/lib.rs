//! # kombat-core
//!
//! Core types for the kombat agent.
//!
//! The agent plays a remote turn-based game on behalf of one account. Everything
//! in this crate is a transient value snapshot of remote state, plus the error
//! taxonomy and configuration shared by the API client and the schedulers.
//!
//! ## Error taxonomy
//!
//! - Fatal errors (`Init`, `Auth`, `Config`) halt the process
//! - Everything else is recoverable: absorbed per action, or by a supervisor restart

pub mod config;
mod error;
pub mod fail_soft;
pub mod format;
mod types;

pub use config::KombatConfig;
pub use error::{KombatError, Result};
pub use types::*;
