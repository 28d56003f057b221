use crate::checker::Checker;
use futures_util::stream::{self, StreamExt};
use joghd_core::{CheckResult, Target};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl Checker {
    /// Check every target once with at most `concurrency` checks in flight.
    ///
    /// Returns exactly one result per target, in completion order. Once
    /// `token` is cancelled no further checks start; targets that never
    /// started get a cancelled result with zero attempts.
    pub async fn check_all(
        &self,
        targets: &[Arc<Target>],
        token: &CancellationToken,
    ) -> Vec<CheckResult> {
        info!(
            "Checking {} targets (concurrency: {})",
            targets.len(),
            self.concurrency
        );

        stream::iter(targets.iter().cloned())
            .map(|target| async move {
                if token.is_cancelled() {
                    debug!(target = %target.name, "skipping check, shutdown in progress");
                    return CheckResult::cancelled(target);
                }
                self.check(&target, token).await
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}
