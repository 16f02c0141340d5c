//! # kombat-api
//!
//! Client for the remote game service.
//!
//! The schedulers only ever see the [`GameApi`] trait. [`HttpGameClient`] is the
//! real implementation; [`MockGameApi`] replays scripted replies for tests.
//!
//! ## Status handling
//!
//! - 2xx: the `data` field of the JSON body is decoded
//! - 400 on a claim endpoint: the reward was already claimed
//! - 404 or `data: null` on hunting status: no session exists
//! - anything else: [`kombat_core::KombatError::Status`]

mod api;
mod auth;
mod client;
mod mock;

pub use api::{Endpoint, GameApi};
pub use auth::{auth_header, load_query, QUERY_ENV};
pub use client::HttpGameClient;
pub use mock::{MockCall, MockGameApi, MockReply};
