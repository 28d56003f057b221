use crate::executor::{ProbeExecutor, ProbeResult};
use async_trait::async_trait;
use joghd_core::{ProbeError, Target};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Scripted probe executor for tests and dry runs
///
/// Responses are queued per target URL and consumed in order. When a URL's
/// queue is empty the probe answers with the target's expected status. Each
/// probe takes `delay` to complete, which lets tests observe concurrency.
pub struct MockProbeExecutor {
    responses: Mutex<HashMap<String, VecDeque<ProbeResult>>>,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockProbeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbeExecutor {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every probe take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a completed exchange with `status_code`
    pub fn push_status(&self, url: &str, status_code: u16) {
        self.push_result(url, ProbeResult::completed(status_code, self.delay));
    }

    /// Queue a transport failure
    pub fn push_error(&self, url: &str, error: ProbeError) {
        self.push_result(url, ProbeResult::failed(error, self.delay));
    }

    pub fn push_result(&self, url: &str, result: ProbeResult) {
        lock(&self.responses)
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    /// Number of probes executed against `url`
    pub fn call_count(&self, url: &str) -> usize {
        lock(&self.calls).get(url).map_or(0, Vec::len)
    }

    /// Start time of every probe executed against `url`
    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        lock(&self.calls).get(url).cloned().unwrap_or_default()
    }

    /// Highest number of probes observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeExecutor for MockProbeExecutor {
    async fn execute(&self, target: &Target, token: &CancellationToken) -> ProbeResult {
        lock(&self.calls)
            .entry(target.url.clone())
            .or_default()
            .push(Instant::now());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let cancelled = if self.delay.is_zero() {
            false
        } else {
            tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(self.delay) => false,
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            return ProbeResult::failed(ProbeError::Cancelled, self.delay);
        }

        let scripted = lock(&self.responses)
            .get_mut(&target.url)
            .and_then(VecDeque::pop_front);

        let result = scripted
            .unwrap_or_else(|| ProbeResult::completed(target.expected_status, self.delay));
        debug!(
            "Mock: {} {} -> {}",
            target.method, target.url, result.status_code
        );
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
