use joghd_alerter::AlertDispatcher;
use joghd_checker::Checker;
use joghd_core::{Alert, CheckResult, ProbeError, Target};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of a single pass over every target
#[derive(Debug)]
pub struct OneshotSummary {
    pub results: Vec<CheckResult>,
}

impl OneshotSummary {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn any_failed(&self) -> bool {
        self.failed() > 0
    }
}

/// Check every target once and alert on every failure
///
/// There is no health history in this mode, so failures are never
/// deduplicated and successes never raise a recovery.
pub async fn run_once(
    checker: &Checker,
    dispatcher: &AlertDispatcher,
    targets: &[Arc<Target>],
    token: &CancellationToken,
) -> OneshotSummary {
    let results = checker.check_all(targets, token).await;

    for result in &results {
        let target = &result.target;
        if result.success {
            info!(
                "[OK] {}: status={}, latency={:?}",
                target.name, result.status_code, result.latency
            );
            continue;
        }

        warn!(
            "[FAIL] {}: status={}, expected={}, error={}",
            target.name,
            result.status_code,
            target.expected_status,
            result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        );

        if result.error == Some(ProbeError::Cancelled) && token.is_cancelled() {
            continue;
        }

        if let Err(e) = dispatcher.send(&Alert::failure(result.clone())).await {
            error!("Failed to send alert for {}: {}", target.name, e);
        }
    }

    let summary = OneshotSummary { results };
    info!(
        "Checked {} targets, {} failed",
        summary.results.len(),
        summary.failed()
    );
    summary
}
