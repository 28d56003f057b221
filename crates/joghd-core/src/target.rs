use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP method for a probe
pub const DEFAULT_METHOD: &str = "GET";
/// Default expected response status
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
/// Default interval between checks in continuous mode
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
/// Default per-check timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An endpoint to be health-checked. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub method: String,
    pub expected_status: u16,
    pub timeout: Duration,
    pub interval: Duration,
    pub headers: BTreeMap<String, String>,
}

impl Target {
    /// Create a target with every optional field defaulted
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Outcome of one logical check, after all retry attempts
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub target: Arc<Target>,
    pub success: bool,
    /// Observed status code, 0 if no response was obtained
    pub status_code: u16,
    /// `None` on success
    pub error: Option<ProbeError>,
    /// Latency of the successful or final attempt
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
    /// Attempts consumed, 1..=max_attempts (0 only if cancelled before starting)
    pub attempts: u32,
}

impl CheckResult {
    /// Result for a target whose check was never started because of cancellation
    pub fn cancelled(target: Arc<Target>) -> Self {
        Self {
            target,
            success: false,
            status_code: 0,
            error: Some(ProbeError::Cancelled),
            latency: Duration::ZERO,
            timestamp: Utc::now(),
            attempts: 0,
        }
    }

    /// The status this result moves its target into
    pub fn health_status(&self) -> HealthStatus {
        if self.success {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Health of a target as seen by the state tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HealthStatus {
    /// No check has completed yet
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
