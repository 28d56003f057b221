//! Joghd Alerter - delivering alerts
//!
//! This crate provides:
//! - The `AlertSink` capability
//! - A dispatcher that fans alerts out to every sink
//! - The Telegram Bot API sink
//! - A recording sink for tests

pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod sink;
pub mod telegram;

// Re-export commonly used types
pub use dispatcher::AlertDispatcher;
pub use error::{AlertError, Result, SinkFailure};
pub use mock::RecordingSink;
pub use sink::AlertSink;
pub use telegram::{format_message, TelegramSink};
