// ABOUTME: Pull-based source of asynchronous stack status notifications.
// ABOUTME: Trait seam plus the payload parser and the HTTP queue client.

mod parse;
mod queue;

pub use parse::{STACK_RESOURCE_TYPE, StackNotification};
pub use queue::{HttpQueueSource, QueueConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the notification channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The channel was used before its subscription finished initializing.
    #[error("notification channel is not initialized")]
    NotReady,

    #[error("queue transport failure: {0}")]
    Transport(String),
}

/// A source of raw notification payloads.
///
/// `receive` blocks up to the source's own per-call timeout and returns
/// zero or more payloads; an empty batch means nothing arrived in time, not
/// that the channel is closed. Payloads are opaque strings here; matching
/// and interpretation happen in the waiter via [`StackNotification`].
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Whether the channel has finished initializing and can deliver.
    fn is_ready(&self) -> bool;

    /// Drain one batch of pending payloads.
    async fn receive(&self) -> Result<Vec<String>, NotifyError>;
}
