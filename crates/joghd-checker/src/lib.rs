//! Joghd Checker - probing targets
//!
//! This crate provides:
//! - The `ProbeExecutor` capability and its reqwest implementation
//! - A scripted mock executor for tests
//! - Retry-bounded checks with exponential backoff
//! - A bounded-concurrency batch runner

pub mod checker;
pub mod executor;
pub mod mock;
pub mod pool;

// Re-export commonly used types
pub use checker::{Checker, DEFAULT_CONCURRENCY};
pub use executor::{HttpProbeExecutor, ProbeExecutor, ProbeResult};
pub use mock::MockProbeExecutor;
