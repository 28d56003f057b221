//! Joghd Core - Fundamental types for the Joghd health-check daemon
//!
//! This crate provides:
//! - Targets, check results and health status
//! - Alerts raised on health transitions
//! - The retry/backoff policy
//! - Configuration loading and validation
//! - Error types with miette diagnostics

pub mod alert;
pub mod config;
pub mod error;
pub mod retry;
pub mod target;

// Re-export commonly used types
pub use alert::{Alert, AlertKind, Severity};
pub use config::{AppConfig, Config, HttpConfig, RunMode, TargetSpec, TelegramConfig};
pub use error::{JoghdError, ProbeError, Result};
pub use retry::RetryPolicy;
pub use target::{CheckResult, HealthStatus, Target};
