// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Alert delivery error type
#[derive(Error, Debug, Diagnostic)]
pub enum AlertError {
    /// The notification request never completed
    #[error("Failed to deliver alert: {message}")]
    #[diagnostic(
        code(joghd::alerter::transport),
        help("Check network connectivity to the notification service")
    )]
    Transport { message: String },

    /// The notification service answered with something other than 200
    #[error("Notification API error: status {status}, body: {body}")]
    #[diagnostic(
        code(joghd::alerter::api_error),
        help("Verify the bot token and chat id. The response body usually names the problem")
    )]
    Api { status: u16, body: String },

    /// One or more sinks failed during fan-out
    #[error("{} alert sink(s) failed: {}", .failures.len(), format_failures(.failures))]
    #[diagnostic(
        code(joghd::alerter::dispatch_failed),
        help("Other sinks still received the alert. Fix or disable the failing sinks")
    )]
    Dispatch { failures: Vec<SinkFailure> },
}

/// A single sink's failure, tagged with the sink's name
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub error: AlertError,
}

/// Result type for alert delivery
pub type Result<T> = std::result::Result<T, AlertError>;

impl AlertError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Names of the sinks that failed, empty unless this is a dispatch error
    pub fn failed_sinks(&self) -> Vec<&str> {
        match self {
            Self::Dispatch { failures } => failures.iter().map(|f| f.sink.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.sink, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
