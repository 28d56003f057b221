use crate::error::{AlertError, Result};
use crate::sink::AlertSink;
use async_trait::async_trait;
use joghd_core::{Alert, AlertKind};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// In-memory sink that records every alert it is given
///
/// Can be told to fail, in which case it still records the alert before
/// returning the error.
pub struct RecordingSink {
    name: String,
    alerts: Mutex<Vec<Alert>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alerts: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A sink whose every delivery fails with `message`
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(name)
        }
    }

    /// Every alert received so far
    pub fn alerts(&self) -> Vec<Alert> {
        lock(&self.alerts).clone()
    }

    /// Kinds of the alerts received, in order
    pub fn kinds(&self) -> Vec<AlertKind> {
        lock(&self.alerts).iter().map(|a| a.kind).collect()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        debug!("Recording {} alert for {}", alert.kind, alert.target.name);
        lock(&self.alerts).push(alert.clone());

        match &self.fail_with {
            Some(message) => Err(AlertError::transport(message.clone())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
