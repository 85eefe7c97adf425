// ABOUTME: StatusWaiter trait: block until a stack operation settles.
// ABOUTME: Two interchangeable strategies, polling and notification-driven.

mod notification;
mod polling;

pub use notification::{EMPTY_BATCH_LIMIT, NotificationWaiter};
pub use polling::{PollConfig, PollingWaiter};

use async_trait::async_trait;
use thiserror::Error;

use crate::delta::{IndexError, IndexStore, PendingDeletionSet};
use crate::gateway::StackError;
use crate::notify::NotifyError;
use crate::types::{ProjectEnv, StackIdentity, StackName, StackOperation, StackStatus};

/// Errors observing a stack operation.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The operation settled in a status other than its success status.
    #[error("stack {identity} reached {actual}, expected {expected}")]
    WrongStatus {
        identity: StackIdentity,
        expected: StackStatus,
        actual: StackStatus,
    },

    /// The notification channel was used before it finished initializing.
    #[error("notification channel is not initialized")]
    NotReady,

    /// A by-name status query matched other than one stack.
    #[error("expected exactly one stack named {name}, API reported {count}")]
    AmbiguousStackCount { name: String, count: usize },

    #[error("gateway failure while waiting: {0}")]
    Gateway(#[from] StackError),

    #[error("notification failure while waiting: {0}")]
    Notify(NotifyError),

    #[error("failed to store watermark after rollback: {0}")]
    Index(#[from] IndexError),
}

impl From<NotifyError> for WatchError {
    fn from(e: NotifyError) -> Self {
        match e {
            NotifyError::NotReady => WatchError::NotReady,
            other => WatchError::Notify(other),
        }
    }
}

impl WatchError {
    /// A waiter that exhausted its budget without seeing a terminal status
    /// reports the generic failure status.
    pub(crate) fn gave_up(identity: &StackIdentity, operation: StackOperation) -> Self {
        WatchError::WrongStatus {
            identity: identity.clone(),
            expected: operation.success(),
            actual: StackStatus::Failed,
        }
    }
}

/// Blocks until a stack operation reaches its terminal status.
///
/// The strategy (polling the gateway vs draining a notification channel) is
/// chosen when the orchestrator is constructed; both implement this trait
/// with no shared state beyond the status tables on [`StackOperation`].
#[async_trait]
pub trait StatusWaiter: Send + Sync {
    /// Wait until `identity` completes `operation`. Returns the success
    /// status, or [`WatchError::WrongStatus`] when the stack settles
    /// anywhere else. Deletion of a stack that no longer exists succeeds.
    async fn wait_for(
        &self,
        identity: &StackIdentity,
        operation: StackOperation,
    ) -> Result<StackStatus, WatchError>;

    /// Wait on a whole batch of in-flight deletions under one shared retry
    /// budget, confirming entries as they complete in any order. The first
    /// abort status observed anywhere stops monitoring of the entire batch.
    /// Whatever was confirmed by the time the batch settles drives a
    /// watermark write through `store`; returns the confirmed names.
    async fn wait_for_deletions(
        &self,
        pending: &mut PendingDeletionSet,
        store: &dyn IndexStore,
        scope: &ProjectEnv,
    ) -> Result<Vec<StackName>, WatchError>;
}

/// Write the derived watermark once a deletion batch has settled. Shared by
/// both strategies; a batch with zero confirmations leaves the stored index
/// untouched.
async fn settle_watermark(
    pending: &PendingDeletionSet,
    store: &dyn IndexStore,
    scope: &ProjectEnv,
) -> Result<(), IndexError> {
    match pending.applied_watermark() {
        Some(watermark) => store.set(scope, watermark).await,
        None => Ok(()),
    }
}
