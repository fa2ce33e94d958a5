//! Error handling module for portal-autologin
//!
//! Provides centralized error types using thiserror. Transport failures have
//! their own type; the prober and submitter recover from them locally and
//! they never abort a run. Configuration files report through `anyhow` in
//! `config_file`.

use crate::controller::RunTransitionError;
use strum::Display;
use thiserror::Error;

/// Main error type for portal-autologin
#[derive(Error, Debug)]
pub enum AutologinError {
    /// IO errors (log file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required credential is not present in the secret store
    #[error("Missing credential in secret store: {service}")]
    MissingCredentials { service: String },

    /// Run state machine transition errors
    #[error("Run state error: {0}")]
    State(#[from] RunTransitionError),
}

/// Result type alias for portal-autologin operations
pub type Result<T> = std::result::Result<T, AutologinError>;

impl AutologinError {
    /// Create a missing credential error for a secret store service
    pub fn missing_credentials(service: impl Into<String>) -> Self {
        Self::MissingCredentials {
            service: service.into(),
        }
    }

    /// True for errors the user fixes in the secret store
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredentials { .. })
    }
}

/// Coarse classification of a failed HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Redirect,
    Body,
    Other,
}

/// A network-level failure (timeout, DNS, refused connection, broken body)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error for {url}: {message}")]
pub struct TransportError {
    pub url: String,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(url: impl Into<String>, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(url, kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::RunState;

    #[test]
    fn test_error_display() {
        let err = AutologinError::missing_credentials("campus_net_pass");
        assert_eq!(
            err.to_string(),
            "Missing credential in secret store: campus_net_pass"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AutologinError = io_err.into();
        assert!(matches!(err, AutologinError::Io(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new(
            "http://clients3.google.com/generate_204",
            TransportErrorKind::Timeout,
            "operation timed out",
        );
        assert_eq!(
            err.to_string(),
            "timeout error for http://clients3.google.com/generate_204: operation timed out"
        );
        assert_eq!(TransportErrorKind::Connect.to_string(), "connect");
        assert_eq!(TransportErrorKind::Other.to_string(), "other");
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AutologinError::missing_credentials("campus_net_user").is_configuration());
        let state: AutologinError = RunTransitionError::FromTerminalState {
            from: RunState::Direct,
        }
        .into();
        assert!(!state.is_configuration());
    }
}
