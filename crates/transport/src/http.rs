//! HTTP plan dispatcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use bruno_config::constants::{endpoints, timeouts};
use bruno_config::DispatchSettings;
use bruno_core::{DispatchReceipt, Plan, PlanDispatcher};

use crate::TransportError;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct HttpDispatchConfig {
    /// Actuator command URL
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for HttpDispatchConfig {
    fn default() -> Self {
        Self {
            url: endpoints::ACTUATOR_DEFAULT.to_string(),
            timeout: Duration::from_millis(timeouts::DISPATCH_MS),
        }
    }
}

impl From<&DispatchSettings> for HttpDispatchConfig {
    fn from(settings: &DispatchSettings) -> Self {
        Self {
            url: settings.url.clone(),
            timeout: settings.timeout(),
        }
    }
}

/// POSTs each plan as JSON to the actuator
pub struct HttpDispatcher {
    config: HttpDispatchConfig,
    client: Client,
}

impl HttpDispatcher {
    pub fn new(config: HttpDispatchConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn from_settings(settings: &DispatchSettings) -> Result<Self, TransportError> {
        Self::new(HttpDispatchConfig::from(settings))
    }

    pub fn config(&self) -> &HttpDispatchConfig {
        &self.config
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            TransportError::ConnectionFailed(err.to_string())
        }
    }

    /// Deliver one plan
    pub async fn post(&self, plan: &Plan) -> Result<DispatchReceipt, TransportError> {
        let body = serde_json::to_vec(plan)?;

        let response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(DispatchReceipt {
            status: status.as_u16(),
            body: text,
        })
    }
}

#[async_trait]
impl PlanDispatcher for HttpDispatcher {
    async fn send(&self, plan: &Plan) -> bruno_core::Result<DispatchReceipt> {
        let receipt = self.post(plan).await?;
        tracing::debug!(
            url = %self.config.url,
            status = receipt.status,
            body = %receipt.body,
            "Plan dispatched"
        );
        Ok(receipt)
    }

    fn target(&self) -> &str {
        &self.config.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// One-shot HTTP server: answers a single request and returns what it read
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/command", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn dispatcher(url: String) -> HttpDispatcher {
        HttpDispatcher::new(HttpDispatchConfig {
            url,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_config_from_settings() {
        let settings = DispatchSettings {
            url: "http://robot.local/command".to_string(),
            timeout_ms: 750,
        };
        let config = HttpDispatchConfig::from(&settings);
        assert_eq!(config.url, "http://robot.local/command");
        assert_eq!(config.timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_post_sends_plan_json() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "ok").await;
        let receipt = dispatcher(url).send(&Plan::fallback()).await.unwrap();

        assert_eq!(receipt, DispatchReceipt { status: 200, body: "ok".to_string() });

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /command"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: Plan = serde_json::from_str(body).unwrap();
        assert_eq!(sent, Plan::fallback());
    }

    #[tokio::test]
    async fn test_non_success_is_rejected() {
        let (url, _server) = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let err = dispatcher(url).post(&Plan::fallback()).await.unwrap_err();

        match err {
            TransportError::Rejected { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            },
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_actuator() {
        let dispatcher = dispatcher("http://127.0.0.1:9/command".to_string());
        let err = dispatcher.send(&Plan::fallback()).await.unwrap_err();
        assert!(matches!(err, bruno_core::Error::Dispatch(_) | bruno_core::Error::Timeout(_)));
        assert_eq!(dispatcher.target(), "http://127.0.0.1:9/command");
    }
}
