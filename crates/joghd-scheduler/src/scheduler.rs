use crate::state::HealthStateStore;
use joghd_alerter::AlertDispatcher;
use joghd_checker::Checker;
use joghd_core::target::DEFAULT_INTERVAL;
use joghd_core::{HealthStatus, Target};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Continuous-mode driver: one periodic check loop per target
///
/// Each loop checks immediately, then once per target interval, feeding
/// every result through the shared [`HealthStateStore`] and dispatching
/// whatever transition alert it produces.
#[derive(Clone)]
pub struct Scheduler {
    checker: Arc<Checker>,
    dispatcher: Arc<AlertDispatcher>,
    store: Arc<HealthStateStore>,
    targets: Arc<[Arc<Target>]>,
}

impl Scheduler {
    pub fn new(
        checker: Arc<Checker>,
        dispatcher: AlertDispatcher,
        targets: Vec<Arc<Target>>,
    ) -> Self {
        let store = HealthStateStore::new(targets.iter().map(|t| t.as_ref()));

        Self {
            checker,
            dispatcher: Arc::new(dispatcher),
            store: Arc::new(store),
            targets: targets.into(),
        }
    }

    /// Shared health state, for status queries
    pub fn store(&self) -> &Arc<HealthStateStore> {
        &self.store
    }

    /// Latest status of the target at `url`
    pub fn status(&self, url: &str) -> HealthStatus {
        self.store.status(url)
    }

    /// Run every target loop until `token` is cancelled, then wait for all
    /// of them to exit
    pub async fn run(&self, token: CancellationToken) {
        info!("Starting scheduler for {} targets", self.targets.len());

        let mut tasks = JoinSet::new();
        for target in self.targets.iter() {
            let scheduler = self.clone();
            let target = target.clone();
            let token = token.clone();
            tasks.spawn(async move { scheduler.target_loop(target, token).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Target loop terminated abnormally: {}", e);
            }
        }

        info!("Scheduler stopped");
    }

    async fn target_loop(&self, target: Arc<Target>, token: CancellationToken) {
        let period = if target.interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            target.interval
        };
        debug!(target = %target.name, "check loop started (interval: {:?})", period);

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = self.checker.check(&target, &token).await;
            if token.is_cancelled() {
                break;
            }

            if !result.success {
                warn!(
                    target = %target.name,
                    attempts = result.attempts,
                    status = result.status_code,
                    "check failed: {}",
                    result.error.as_ref().map(ToString::to_string).unwrap_or_default()
                );
            }

            if let Some(alert) = self.store.record(&result) {
                info!(target = %target.name, "raising {} alert", alert.kind);
                if let Err(e) = self.dispatcher.send(&alert).await {
                    error!(target = %target.name, "alert delivery failed: {}", e);
                }
            }
        }

        debug!(target = %target.name, "check loop stopped");
    }
}
