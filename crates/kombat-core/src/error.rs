//! Unified error types for kombat

use thiserror::Error;

/// Unified error type for all kombat operations
#[derive(Error, Debug)]
pub enum KombatError {
    // Fatal errors
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Remote service errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    // A scheduler run that failed or panicked; the supervisor restarts it
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl KombatError {
    /// Fatal errors halt the process instead of triggering a restart
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::Auth(_) | Self::Config(_))
    }

    /// HTTP status code, if the remote service answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using KombatError
pub type Result<T> = std::result::Result<T, KombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(KombatError::Init("profile".into()).is_fatal());
        assert!(KombatError::Auth("missing".into()).is_fatal());
        assert!(KombatError::Config("bad toml".into()).is_fatal());
        assert!(!KombatError::Http("timeout".into()).is_fatal());
        assert!(!KombatError::Scheduler("panic".into()).is_fatal());
    }

    #[test]
    fn test_status_accessor() {
        let err = KombatError::Status {
            endpoint: "/daily".into(),
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "/daily returned status 500: oops");
        assert_eq!(KombatError::Http("x".into()).status(), None);
    }
}
