use joghd_core::{Alert, AlertKind, CheckResult, HealthStatus, Target};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

/// Latest health status of every target, keyed by URL
///
/// `record` holds the write lock across read, update and alert decision so
/// two concurrent results for one target can never both raise (or both
/// miss) a transition. Readers only take the read lock and never wait on a
/// probe.
#[derive(Debug, Default)]
pub struct HealthStateStore {
    states: RwLock<HashMap<String, HealthStatus>>,
}

impl HealthStateStore {
    /// Create a store with every target in `Unknown`
    pub fn new<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Self {
        let states = targets
            .into_iter()
            .map(|t| (t.url.clone(), HealthStatus::Unknown))
            .collect();

        Self {
            states: RwLock::new(states),
        }
    }

    /// Apply a completed check and return the alert it triggers, if any
    pub fn record(&self, result: &CheckResult) -> Option<Alert> {
        let url = &result.target.url;
        let current = result.health_status();

        let kind = {
            let mut states = self
                .states
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            let Some(status) = states.get_mut(url) else {
                warn!("Ignoring result for unregistered target {}", url);
                return None;
            };

            let previous = std::mem::replace(status, current);
            if previous != current {
                info!(
                    target = %result.target.name,
                    "health changed: {} -> {}", previous, current
                );
            }

            decide(previous, result.success)
        };

        kind.map(|kind| Alert::new(kind, result.clone()))
    }

    /// Latest status for `url`, `Unknown` if it isn't tracked
    pub fn status(&self, url: &str) -> HealthStatus {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    /// Every tracked URL with its status
    pub fn snapshot(&self) -> HashMap<String, HealthStatus> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Edge-triggered alert rule
///
/// Entering `Unhealthy` from anywhere else raises a failure; leaving it
/// raises a recovery. Staying put never alerts.
pub fn decide(previous: HealthStatus, success: bool) -> Option<AlertKind> {
    match (previous, success) {
        (HealthStatus::Unhealthy, false) => None,
        (_, false) => Some(AlertKind::Failure),
        (HealthStatus::Unhealthy, true) => Some(AlertKind::Recovery),
        (_, true) => None,
    }
}
