// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Core error type for Joghd configuration and startup
#[derive(Error, Debug, Diagnostic)]
pub enum JoghdError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(
        code(joghd::config_read),
        help("Check that the file exists and is readable, or pass a different path with --config")
    )]
    ConfigRead {
        #[allow(unused)]
        path: String,
        #[source]
        #[allow(unused)]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has wrongly typed fields
    #[error("Failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(joghd::config_parse),
        help("Durations are written as \"500ms\", \"10s\", \"5m\" or a plain number of seconds")
    )]
    ConfigParse {
        #[allow(unused)]
        path: String,
        #[allow(unused)]
        message: String,
    },

    /// Config parsed but failed validation
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(joghd::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },
}

/// Result type alias for Joghd operations
pub type Result<T> = std::result::Result<T, JoghdError>;

impl JoghdError {
    /// Create a ConfigRead error
    pub fn config_read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Create a ConfigParse error
    pub fn config_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Why a probe or a whole check did not succeed.
///
/// Cloneable so it can travel inside a `CheckResult` into alerts.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// No response within the per-check timeout
    #[error("request timed out after {}ms", .after.as_millis())]
    #[diagnostic(
        code(joghd::probe::timeout),
        help("Raise the target timeout or check whether the endpoint is overloaded")
    )]
    Timeout { after: Duration },

    /// Connection, DNS or TLS failure
    #[error("connection failed: {message}")]
    #[diagnostic(
        code(joghd::probe::connect),
        help("Verify the host resolves and accepts connections on the given port")
    )]
    Connect { message: String },

    /// Any other transport failure after the connection was made
    #[error("request failed: {message}")]
    #[diagnostic(code(joghd::probe::request))]
    Request { message: String },

    /// The request could not even be built (bad method, header or URL)
    #[error("invalid request: {message}")]
    #[diagnostic(
        code(joghd::probe::invalid_request),
        help("Check the target's method, url and headers in the config")
    )]
    InvalidRequest { message: String },

    /// A response arrived but with the wrong status code
    #[error("unexpected status code: got {actual}, expected {expected}")]
    #[diagnostic(code(joghd::probe::status_mismatch))]
    StatusMismatch { expected: u16, actual: u16 },

    /// The governing context was cancelled
    #[error("check cancelled")]
    #[diagnostic(code(joghd::probe::cancelled))]
    Cancelled,
}

impl ProbeError {
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Transport-level errors, as opposed to a completed exchange with the wrong code
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::StatusMismatch { .. } | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = JoghdError::invalid_config("target[0]: url is required", "Set targets.url");
        assert!(matches!(err, JoghdError::InvalidConfig { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: target[0]: url is required"
        );
    }

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::Timeout {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "request timed out after 1500ms");

        let err = ProbeError::StatusMismatch {
            expected: 200,
            actual: 503,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status code: got 503, expected 200"
        );
        assert!(!err.is_transport());
        assert!(ProbeError::connect("refused").is_transport());
    }
}
