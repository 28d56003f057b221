use async_trait::async_trait;
use joghd_core::{HttpConfig, JoghdError, ProbeError, Target};
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of a single probe attempt, with no judgment about success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Observed status code, 0 if no response was obtained
    pub status_code: u16,
    pub latency: Duration,
    /// Transport-level error, `None` whenever an HTTP exchange completed
    pub error: Option<ProbeError>,
}

impl ProbeResult {
    /// A completed HTTP exchange
    pub fn completed(status_code: u16, latency: Duration) -> Self {
        Self {
            status_code,
            latency,
            error: None,
        }
    }

    /// A probe that got no response
    pub fn failed(error: ProbeError, latency: Duration) -> Self {
        Self {
            status_code: 0,
            latency,
            error: Some(error),
        }
    }
}

/// Performs one network request against a target. No retries.
///
/// Implementations must abort promptly when `token` is cancelled and report
/// `ProbeError::Cancelled`.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn execute(&self, target: &Target, token: &CancellationToken) -> ProbeResult;
}

/// reqwest-backed HTTP probe executor
pub struct HttpProbeExecutor {
    client: Client,
}

impl HttpProbeExecutor {
    /// Build the shared HTTP client from `[http]` settings
    pub fn new(config: &HttpConfig) -> joghd_core::Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());

        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        if config.skip_tls_verification {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| {
            JoghdError::invalid_config(
                format!("failed to build HTTP client: {}", e),
                "Check the [http] section of the config",
            )
        })?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbeExecutor {
    async fn execute(&self, target: &Target, token: &CancellationToken) -> ProbeResult {
        let method = match Method::from_bytes(target.method.as_bytes()) {
            Ok(m) => m,
            Err(e) => {
                return ProbeResult::failed(
                    ProbeError::invalid_request(format!("method '{}': {}", target.method, e)),
                    Duration::ZERO,
                )
            }
        };

        let mut request = self.client.request(method, &target.url);
        if !target.timeout.is_zero() {
            request = request.timeout(target.timeout);
        }
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!("{} {}", target.method, target.url);
        let start = Instant::now();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return ProbeResult::failed(ProbeError::Cancelled, start.elapsed());
            }
            response = request.send() => response,
        };
        let latency = start.elapsed();

        match response {
            Ok(resp) => ProbeResult::completed(resp.status().as_u16(), latency),
            Err(e) => ProbeResult::failed(classify_error(&e, target.timeout), latency),
        }
    }
}

fn classify_error(err: &reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout { after: timeout }
    } else if err.is_builder() {
        ProbeError::invalid_request(error_chain(err))
    } else if err.is_connect() {
        ProbeError::connect(error_chain(err))
    } else {
        ProbeError::request(error_chain(err))
    }
}

/// reqwest's top-level message hides the cause (refused, DNS, TLS), so
/// append the source chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
