use crate::error::{AlertError, Result, SinkFailure};
use crate::sink::AlertSink;
use joghd_core::Alert;
use std::sync::Arc;
use tracing::{debug, error};

/// Fans an alert out to every registered sink
///
/// A failing sink never stops the others from being tried; all failures
/// are collected into one `AlertError::Dispatch`.
#[derive(Default, Clone)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink
    pub fn add(&mut self, sink: Arc<dyn AlertSink>) {
        debug!("Registered alert sink '{}'", sink.name());
        self.sinks.push(sink);
    }

    /// Builder form of [`AlertDispatcher::add`]
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.add(sink);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver `alert` to every sink
    pub async fn send(&self, alert: &Alert) -> Result<()> {
        let mut failures = Vec::new();

        for sink in &self.sinks {
            match sink.send(alert).await {
                Ok(()) => debug!(
                    "Delivered {} alert for {} via {}",
                    alert.kind,
                    alert.target.name,
                    sink.name()
                ),
                Err(e) => {
                    error!(
                        "Alert sink '{}' failed for {}: {}",
                        sink.name(),
                        alert.target.name,
                        e
                    );
                    failures.push(SinkFailure {
                        sink: sink.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AlertError::Dispatch { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingSink;
    use chrono::Utc;
    use joghd_core::{AlertKind, CheckResult, Target};
    use std::time::Duration;

    fn make_alert() -> Alert {
        Alert::failure(CheckResult {
            target: Arc::new(Target::new("api", "https://api.example.com")),
            success: false,
            status_code: 503,
            error: None,
            latency: Duration::from_millis(12),
            timestamp: Utc::now(),
            attempts: 3,
        })
    }

    #[tokio::test]
    async fn test_no_sinks_is_ok() {
        let dispatcher = AlertDispatcher::new();
        assert!(dispatcher.is_empty());
        assert!(dispatcher.send(&make_alert()).await.is_ok());
    }

    #[tokio::test]
    async fn test_all_sinks_succeed() {
        let a = Arc::new(RecordingSink::new("a"));
        let b = Arc::new(RecordingSink::new("b"));
        let dispatcher = AlertDispatcher::new()
            .with_sink(a.clone())
            .with_sink(b.clone());

        dispatcher.send(&make_alert()).await.unwrap();
        assert_eq!(a.kinds(), vec![AlertKind::Failure]);
        assert_eq!(b.kinds(), vec![AlertKind::Failure]);
        assert_eq!(dispatcher.sink_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_named() {
        let a = Arc::new(RecordingSink::new("A"));
        let b = Arc::new(RecordingSink::failing("B", "bot blocked"));
        let dispatcher = AlertDispatcher::new()
            .with_sink(b.clone())
            .with_sink(a.clone());

        let err = dispatcher.send(&make_alert()).await.unwrap_err();
        assert_eq!(err.failed_sinks(), vec!["B"]);
        assert!(err.to_string().contains("B: Failed to deliver alert: bot blocked"));
        assert!(!err.to_string().contains("A:"));

        // A was still attempted after B failed
        assert_eq!(a.alerts().len(), 1);
        assert_eq!(b.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_every_failure_reported() {
        let dispatcher = AlertDispatcher::new()
            .with_sink(Arc::new(RecordingSink::failing("one", "down")))
            .with_sink(Arc::new(RecordingSink::new("two")))
            .with_sink(Arc::new(RecordingSink::failing("three", "timeout")));

        let err = dispatcher.send(&make_alert()).await.unwrap_err();
        assert_eq!(err.failed_sinks(), vec!["one", "three"]);
    }
}
