//! Credentials for the game service
//!
//! The account is identified by an opaque query token. Two sources are supported:
//! 1. The `KOMBAT_QUERY` environment variable
//! 2. A query file (`query.txt` by default)

use kombat_core::{KombatError, Result};
use std::env;
use std::path::Path;

/// Environment variable that overrides the query file
pub const QUERY_ENV: &str = "KOMBAT_QUERY";

/// Load the query token
///
/// Priority:
/// 1. KOMBAT_QUERY
/// 2. `query_file`
pub fn load_query(query_file: &Path) -> Result<String> {
    if let Ok(query) = env::var(QUERY_ENV) {
        let query = query.trim();
        if !query.is_empty() {
            tracing::info!("Using query token from {}", QUERY_ENV);
            return Ok(query.to_string());
        }
    }

    match std::fs::read_to_string(query_file) {
        Ok(content) if !content.trim().is_empty() => {
            tracing::info!("Using query token from {}", query_file.display());
            Ok(content.trim().to_string())
        }
        Ok(_) => Err(KombatError::Auth(format!(
            "{} is empty",
            query_file.display()
        ))),
        Err(e) => Err(KombatError::Auth(format!(
            "No query token found. Set {} or write it to {} ({})",
            QUERY_ENV,
            query_file.display(),
            e
        ))),
    }
}

/// Authorization header value for a query token
pub fn auth_header(query: &str) -> String {
    format!("tma {}", query)
}
