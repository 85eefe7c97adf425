// ABOUTME: Long-poll HTTP queue client implementing NotificationSource.
// ABOUTME: Subscribes once, then drains receive/ack batches per call.

use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{NotificationSource, NotifyError};

/// How to reach the notification queue. Explicit configuration, no ambient
/// state.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// `host:port` of the queue endpoint.
    pub endpoint: String,
    /// Queue to subscribe to stack events.
    pub queue_name: String,
    /// Long-poll wait passed to each receive call.
    pub wait: Duration,
    /// Bearer token, if the endpoint requires one.
    pub token: Option<String>,
}

impl QueueConfig {
    pub fn new(endpoint: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            queue_name: queue_name.into(),
            wait: Duration::from_secs(20),
            token: None,
        }
    }
}

/// Notification source backed by a long-poll message queue.
///
/// `subscribe` must run before the first `receive`; until then the source
/// reports not-ready and waiters fail fast instead of blocking on a channel
/// that will never deliver.
pub struct HttpQueueSource {
    config: QueueConfig,
    subscription: Mutex<Option<String>>,
}

impl HttpQueueSource {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            subscription: Mutex::new(None),
        }
    }

    /// Bind the queue to the provisioning service's stack event feed.
    pub async fn subscribe(&self) -> Result<(), NotifyError> {
        let value = self
            .post(&[
                ("Action", "Subscribe"),
                ("QueueName", self.config.queue_name.as_str()),
            ])
            .await?;
        let response: SubscribeResponse = serde_json::from_value(value)
            .map_err(|e| NotifyError::Transport(format!("bad subscribe response: {e}")))?;
        *self.subscription.lock() = Some(response.subscription_id);
        Ok(())
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<serde_json::Value, NotifyError> {
        let body: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let stream = TcpStream::connect(&self.config.endpoint)
            .await
            .map_err(|e| NotifyError::Transport(format!("connect failed: {e}")))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| NotifyError::Transport(format!("HTTP handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("queue connection error: {}", e);
            }
        });

        let mut builder = hyper::Request::builder()
            .method("POST")
            .uri("/")
            .header("Host", self.config.endpoint.as_str())
            .header("Content-Type", "application/x-www-form-urlencoded");
        if let Some(token) = &self.config.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = builder
            .body(http_body_util::Full::new(bytes::Bytes::from(body)))
            .map_err(|e| NotifyError::Transport(format!("failed to build request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| NotifyError::Transport(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(NotifyError::Transport(format!(
                "queue endpoint answered {}",
                response.status()
            )));
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| NotifyError::Transport(format!("failed to read response: {e}")))?
            .to_bytes();
        serde_json::from_slice(&bytes)
            .map_err(|e| NotifyError::Transport(format!("invalid JSON response: {e}")))
    }

    async fn ack(&self, receipt: &str) -> Result<(), NotifyError> {
        self.post(&[
            ("Action", "DeleteMessage"),
            ("QueueName", self.config.queue_name.as_str()),
            ("Receipt", receipt),
        ])
        .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SubscribeResponse {
    subscription_id: String,
}

#[derive(Debug, Deserialize)]
struct ReceiveResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    receipt: String,
    body: String,
}

#[async_trait]
impl NotificationSource for HttpQueueSource {
    fn is_ready(&self) -> bool {
        self.subscription.lock().is_some()
    }

    async fn receive(&self) -> Result<Vec<String>, NotifyError> {
        if !self.is_ready() {
            return Err(NotifyError::NotReady);
        }

        let wait = self.config.wait.as_secs().to_string();
        let value = self
            .post(&[
                ("Action", "ReceiveMessages"),
                ("QueueName", self.config.queue_name.as_str()),
                ("WaitSeconds", wait.as_str()),
            ])
            .await?;
        let response: ReceiveResponse = serde_json::from_value(value)
            .map_err(|e| NotifyError::Transport(format!("bad receive response: {e}")))?;

        // Ack everything we received; a message redelivered after a crash is
        // harmless (waiters treat notifications as idempotent facts) but an
        // unacked backlog would replay into every later wait.
        futures::future::try_join_all(
            response.messages.iter().map(|m| self.ack(&m.receipt)),
        )
        .await?;

        Ok(response.messages.into_iter().map(|m| m.body).collect())
    }
}
