use crate::error::Result;
use async_trait::async_trait;
use joghd_core::Alert;

/// Something that can deliver an alert, e.g. a chat bot
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert
    async fn send(&self, alert: &Alert) -> Result<()>;

    /// Name used in logs and aggregated errors
    fn name(&self) -> &str;
}
