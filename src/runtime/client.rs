//! HTTP request sender
//!
//! Issues the single `GET` each iteration makes. The trait is the seam the
//! virtual-user loop is tested through; `ReqwestSender` is the real thing.

use crate::error::{AppError, AppResult, RequestError};
use async_trait::async_trait;
use std::time::Duration;

/// Sends one `GET` and reports the response status
///
/// Implementations map any status `>= 400` to `RequestError::Status`.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn get(&self, target: &str) -> Result<u16, RequestError>;
}

/// `reqwest`-backed sender shared by every virtual user
///
/// Uses the client's default connection pool; only the request timeout is set.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSender {
    /// Build a sender whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `AppError::HttpClient` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::HttpClient)?;

        tracing::debug!(
            timeout_ms = timeout.as_millis() as u64,
            "HTTP client initialized"
        );

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn get(&self, target: &str) -> Result<u16, RequestError> {
        let response = self.client.get(target).send().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout {
                    target: target.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                RequestError::Transport {
                    target: target.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();

        // Drain the body so the connection goes back to the pool
        if let Err(e) = response.bytes().await {
            return Err(if e.is_timeout() {
                RequestError::Timeout {
                    target: target.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                RequestError::Transport {
                    target: target.to_string(),
                    reason: format!("failed reading response body: {}", e),
                }
            });
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(RequestError::Status {
                target: target.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_keeps_timeout() {
        let sender = ReqwestSender::new(Duration::from_secs(7)).unwrap();
        assert_eq!(sender.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_unparseable_target_is_transport_error() {
        let sender = ReqwestSender::new(Duration::from_secs(1)).unwrap();
        let err = tokio_test::assert_err!(sender.get("not a url").await);
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.target(), "not a url");
    }
}
