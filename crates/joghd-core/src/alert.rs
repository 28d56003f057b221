use crate::target::{CheckResult, Target};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Whether an alert reports entering or leaving the unhealthy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Failure,
    Recovery,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Failure => write!(f, "FAILURE"),
            AlertKind::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A notification about a health transition
#[derive(Debug, Clone)]
pub struct Alert {
    pub kind: AlertKind,
    pub target: Arc<Target>,
    pub result: CheckResult,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create a FAILURE alert from a failed check
    pub fn failure(result: CheckResult) -> Self {
        let message = match &result.error {
            Some(e) => e.to_string(),
            None => "Health check failed".to_string(),
        };

        Self {
            kind: AlertKind::Failure,
            target: result.target.clone(),
            result,
            message,
            severity: Severity::Critical,
            timestamp: Utc::now(),
        }
    }

    /// Create a RECOVERY alert from the first successful check after an outage
    pub fn recovery(result: CheckResult) -> Self {
        Self {
            kind: AlertKind::Recovery,
            target: result.target.clone(),
            result,
            message: "Health check recovered".to_string(),
            severity: Severity::Info,
            timestamp: Utc::now(),
        }
    }

    /// Build the alert of the given kind
    pub fn new(kind: AlertKind, result: CheckResult) -> Self {
        match kind {
            AlertKind::Failure => Self::failure(result),
            AlertKind::Recovery => Self::recovery(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::time::Duration;

    fn make_result(success: bool, error: Option<ProbeError>) -> CheckResult {
        CheckResult {
            target: Arc::new(Target::new("api", "https://api.example.com")),
            success,
            status_code: if success { 200 } else { 0 },
            error,
            latency: Duration::from_millis(42),
            timestamp: Utc::now(),
            attempts: 1,
        }
    }

    #[test]
    fn test_failure_alert_uses_error_text() {
        let alert = Alert::failure(make_result(false, Some(ProbeError::connect("refused"))));
        assert_eq!(alert.kind, AlertKind::Failure);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.message, "connection failed: refused");
        assert_eq!(alert.target.name, "api");
    }

    #[test]
    fn test_failure_alert_without_error() {
        let alert = Alert::failure(make_result(false, None));
        assert_eq!(alert.message, "Health check failed");
    }

    #[test]
    fn test_recovery_alert() {
        let alert = Alert::new(AlertKind::Recovery, make_result(true, None));
        assert_eq!(alert.kind, AlertKind::Recovery);
        assert_eq!(alert.severity, Severity::Info);
        assert_eq!(alert.message, "Health check recovered");
        assert_eq!(alert.kind.to_string(), "RECOVERY");
    }
}
