use crate::error::{AlertError, Result};
use crate::sink::AlertSink;
use async_trait::async_trait;
use joghd_core::{Alert, AlertKind, TelegramConfig};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a Bot API `sendMessage` call
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends alerts through the Telegram Bot API
pub struct TelegramSink {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AlertError::transport(format!("building HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let text = format_message(alert);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        // Don't log the endpoint, it contains the bot token
        debug!("POST sendMessage for {} alert on {}", alert.kind, alert.target.name);

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AlertError::transport(format!("sending telegram message: {}", e.without_url()))
            })?;

        if resp.status() != StatusCode::OK {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AlertError::api(status, body));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// Render an alert as Telegram Markdown
pub fn format_message(alert: &Alert) -> String {
    let (icon, status) = match alert.kind {
        AlertKind::Failure => ("🔴", "FAILED"),
        AlertKind::Recovery => ("🟢", "RECOVERED"),
    };

    let mut msg = format!(
        "{} *{}*: {}\n\n\
         *Target:* {}\n\
         *URL:* `{}`\n\
         *Expected:* {}\n\
         *Actual:* {}\n\
         *Latency:* {}ms\n\
         *Attempts:* {}\n\
         *Time:* {}",
        icon,
        status,
        alert.target.name,
        alert.target.name,
        alert.target.url,
        alert.target.expected_status,
        alert.result.status_code,
        alert.result.latency.as_millis(),
        alert.result.attempts,
        alert.timestamp.format("%Y-%m-%d %H:%M:%S %Z"),
    );

    if alert.kind == AlertKind::Failure {
        if let Some(e) = &alert.result.error {
            msg.push_str(&format!("\n*Error:* `{}`", e));
        }
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use joghd_core::{CheckResult, ProbeError, Target};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn make_result(success: bool) -> CheckResult {
        CheckResult {
            target: Arc::new(Target::new("billing", "https://billing.example.com/health")),
            success,
            status_code: if success { 200 } else { 0 },
            error: if success {
                None
            } else {
                Some(ProbeError::connect("connection refused"))
            },
            latency: Duration::from_millis(1234),
            timestamp: Utc::now(),
            attempts: 3,
        }
    }

    fn make_config(api_url: &str) -> TelegramConfig {
        TelegramConfig {
            enabled: true,
            bot_token: "123:abc".to_string(),
            chat_id: "-1001".to_string(),
            api_url: api_url.to_string(),
        }
    }

    /// Read one HTTP request, returning (head, body)
    async fn read_request(stream: &mut TcpStream) -> (String, String) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let head = text[..split].to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                let body = &buf[split + 4..];
                if body.len() >= content_length {
                    return (head, String::from_utf8_lossy(body).to_string());
                }
            }
        }
        (String::from_utf8_lossy(&buf).to_string(), String::new())
    }

    async fn serve_once(
        response: &'static str,
    ) -> (String, tokio::task::JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = stream.write_all(response.as_bytes()).await;
            request
        });

        (url, server)
    }

    fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn test_failure_message() {
        let mut alert = Alert::failure(make_result(false));
        alert.timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();

        let msg = format_message(&alert);
        assert!(msg.starts_with("🔴 *FAILED*: billing\n\n"));
        assert!(msg.contains("*URL:* `https://billing.example.com/health`"));
        assert!(msg.contains("*Expected:* 200"));
        assert!(msg.contains("*Actual:* 0"));
        assert!(msg.contains("*Latency:* 1234ms"));
        assert!(msg.contains("*Attempts:* 3"));
        assert!(msg.contains("*Time:* 2025-03-01 12:30:00 UTC"));
        assert!(msg.ends_with("*Error:* `connection failed: connection refused`"));
    }

    #[test]
    fn test_recovery_message_has_no_error() {
        let alert = Alert::recovery(make_result(true));
        let msg = format_message(&alert);
        assert!(msg.starts_with("🟢 *RECOVERED*: billing"));
        assert!(!msg.contains("*Error:*"));
    }

    #[tokio::test]
    async fn test_send_posts_markdown_message() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}")
                .await;
        let sink = TelegramSink::with_client(client(), &make_config(&url));
        assert_eq!(sink.name(), "telegram");

        sink.send(&Alert::failure(make_result(false))).await.unwrap();

        let (head, body) = server.await.unwrap();
        assert!(head.starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["chat_id"], "-1001");
        assert_eq!(json["parse_mode"], "Markdown");
        assert!(json["text"].as_str().unwrap().contains("*FAILED*: billing"));
    }

    #[tokio::test]
    async fn test_non_200_is_api_error_with_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 400 Bad Request\r\nContent-Length: 22\r\nConnection: close\r\n\r\nBad Request: chat lost",
        )
        .await;
        let sink = TelegramSink::with_client(client(), &make_config(&url));

        let err = sink
            .send(&Alert::recovery(make_result(true)))
            .await
            .unwrap_err();
        match err {
            AlertError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.starts_with("Bad Request: chat"));
            }
            other => panic!("expected API error, got {:?}", other),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let sink = TelegramSink::with_client(client(), &make_config(&url));
        let err = sink
            .send(&Alert::failure(make_result(false)))
            .await
            .unwrap_err();
        assert!(matches!(err, AlertError::Transport { .. }));
        assert!(!err.to_string().contains("123:abc"));
    }
}
