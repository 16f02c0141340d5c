//! # kombat-scheduler
//!
//! The dual-loop scheduling layer of the kombat agent.
//!
//! This crate provides:
//! - Resource clock deciding whether energy allows a battle, or how long to wait
//! - A cancellable countdown used for every wait
//! - The battle scheduler (claims, matchmaking, fights, cooldown)
//! - The hunting scheduler (start, wait out the session, claim)
//! - A supervisor that restarts a failed scheduler from its initial state
//! - The agent that runs both schedulers concurrently
//!
//! ## Key Pattern
//!
//! Each scheduler is an explicit state machine driven by `step`. Recoverable
//! failures are absorbed inside a step; anything that escapes `run` (including
//! a panic) is handled by the supervisor, which waits a fixed backoff and then
//! builds a brand-new scheduler. Nothing carries over between restarts.

mod agent;
mod battle;
mod clock;
mod countdown;
mod hunting;
mod supervisor;

pub use agent::{Agent, AgentReport};
pub use battle::{BattleScheduler, BattleState, BattleStats};
pub use clock::{time_until, EnergyGate, ResourceClock};
pub use countdown::{Countdown, WaitOutcome};
pub use hunting::{HuntingScheduler, HuntingState, HuntingStats};
pub use supervisor::{Supervisor, SupervisorReport};
pub use tokio_util::sync::CancellationToken;
