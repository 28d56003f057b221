//! Joghd Scheduler - driving checks and tracking health
//!
//! This crate provides:
//! - The health state store with edge-triggered alert decisions
//! - The continuous-mode scheduler, one periodic loop per target
//! - The one-shot runner

pub mod oneshot;
pub mod scheduler;
pub mod state;

// Re-export commonly used types
pub use oneshot::{run_once, OneshotSummary};
pub use scheduler::Scheduler;
pub use state::{decide, HealthStateStore};
