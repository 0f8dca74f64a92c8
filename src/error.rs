//! Relay error types
//!
//! The taxonomy is deliberately small: transport failures are contained
//! within the affected session, decode failures drop a single chunk, and
//! only configuration errors are fatal at startup.

use crate::session::SessionId;

/// Error type for relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Read, write, or accept failure on a transport
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Inbound chunk was not valid UTF-8
    #[error("invalid payload: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// Session identifier already registered (internal invariant violation)
    #[error("duplicate session {0}")]
    DuplicateSession(SessionId),

    /// Invalid bind address or port
    #[error("invalid bind address '{0}'")]
    Config(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_session_display() {
        let err = RelayError::DuplicateSession(7);
        assert_eq!(err.to_string(), "duplicate session 7");
    }

    #[test]
    fn test_config_display() {
        let err = RelayError::Config("not-an-address:99999".to_string());
        assert_eq!(
            err.to_string(),
            "invalid bind address 'not-an-address:99999'"
        );
    }

    #[test]
    fn test_transport_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: RelayError = io.into();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(err.to_string().starts_with("transport error"));
    }
}
