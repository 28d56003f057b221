use crate::executor::{ProbeExecutor, ProbeResult};
use chrono::Utc;
use joghd_core::{CheckResult, ProbeError, RetryPolicy, Target};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of probes allowed in flight by `check_all`
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Runs retry-bounded checks on top of a [`ProbeExecutor`]
pub struct Checker {
    executor: Arc<dyn ProbeExecutor>,
    retry: RetryPolicy,
    pub(crate) concurrency: usize,
}

impl Checker {
    pub fn new(executor: Arc<dyn ProbeExecutor>, retry: RetryPolicy) -> Self {
        Self {
            executor,
            retry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of probes `check_all` runs at once (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run one logical check: probe, and on failure back off and probe again
    /// until success or `max_attempts` is spent.
    ///
    /// Cancellation during a backoff wait returns the last failed attempt
    /// without probing again.
    pub async fn check(&self, target: &Arc<Target>, token: &CancellationToken) -> CheckResult {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let probe = self.executor.execute(target, token).await;
            let result = judge(target, probe, attempt);

            if result.success {
                debug!(
                    target = %target.name,
                    attempt,
                    status = result.status_code,
                    "check succeeded"
                );
                return result;
            }

            if attempt >= max_attempts {
                return result;
            }

            if token.is_cancelled() || result.error == Some(ProbeError::Cancelled) {
                debug!(target = %target.name, attempt, "check cancelled");
                return result;
            }

            let wait = self.retry.backoff(attempt);
            warn!(
                target = %target.name,
                attempt,
                max_attempts,
                status = result.status_code,
                "attempt failed: {}; retrying in {:?}",
                result
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                wait
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(target = %target.name, attempt, "check cancelled during backoff");
                    return result;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            attempt += 1;
        }
    }
}

/// Success means no transport error and exactly the expected status
fn judge(target: &Arc<Target>, probe: ProbeResult, attempt: u32) -> CheckResult {
    let error = match probe.error {
        Some(e) => Some(e),
        None if probe.status_code == target.expected_status => None,
        None => Some(ProbeError::StatusMismatch {
            expected: target.expected_status,
            actual: probe.status_code,
        }),
    };

    CheckResult {
        target: target.clone(),
        success: error.is_none(),
        status_code: probe.status_code,
        error,
        latency: probe.latency,
        timestamp: Utc::now(),
        attempts: attempt,
    }
}
