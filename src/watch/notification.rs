// ABOUTME: Notification-driven status waiter draining a queue in batches.
// ABOUTME: Empty batches consume a retry budget; matches correlate by stack id.

use async_trait::async_trait;

use crate::delta::{IndexStore, PendingDeletionSet};
use crate::gateway::StackOps;
use crate::notify::{NotificationSource, StackNotification};
use crate::types::{ProjectEnv, StackIdentity, StackName, StackOperation, StackStatus};

use super::{StatusWaiter, WatchError, settle_watermark};

/// Consecutive empty receive batches tolerated before a wait gives up.
pub const EMPTY_BATCH_LIMIT: u32 = 50;

/// Status waiter that consumes the asynchronous notification stream.
///
/// Needs the gateway as well: a delete completion event may already have
/// been dropped by the time this waiter attaches, so deletions first check
/// whether the stack is simply gone.
pub struct NotificationWaiter<'a, S, G> {
    source: &'a S,
    gateway: &'a G,
}

impl<'a, S, G> NotificationWaiter<'a, S, G>
where
    S: NotificationSource,
    G: StackOps,
{
    pub fn new(source: &'a S, gateway: &'a G) -> Self {
        Self { source, gateway }
    }

    fn guard_ready(&self) -> Result<(), WatchError> {
        if self.source.is_ready() {
            Ok(())
        } else {
            Err(WatchError::NotReady)
        }
    }
}

#[async_trait]
impl<S, G> StatusWaiter for NotificationWaiter<'_, S, G>
where
    S: NotificationSource,
    G: StackOps,
{
    async fn wait_for(
        &self,
        identity: &StackIdentity,
        operation: StackOperation,
    ) -> Result<StackStatus, WatchError> {
        self.guard_ready()?;

        if operation == StackOperation::Delete && !self.gateway.exists(identity.name()).await? {
            return Ok(StackStatus::DeleteComplete);
        }

        let mut empty_batches = 0;
        loop {
            let batch = self.source.receive().await?;
            if batch.is_empty() {
                empty_batches += 1;
                if empty_batches >= EMPTY_BATCH_LIMIT {
                    return Err(WatchError::gave_up(identity, operation));
                }
                continue;
            }
            empty_batches = 0;

            for payload in &batch {
                let Some(notification) = StackNotification::parse(payload) else {
                    continue;
                };
                // Notifications for other stacks and for child resources
                // interleave freely in the stream; skip them silently.
                if !notification.concerns(identity) {
                    continue;
                }

                if notification.status == operation.success() {
                    return Ok(notification.status);
                }
                if operation.is_abort(notification.status) {
                    tracing::error!(
                        "stack {} aborted {}: {} ({})",
                        identity,
                        operation,
                        notification.status,
                        notification.reason.as_deref().unwrap_or("no reason given"),
                    );
                    return Err(WatchError::WrongStatus {
                        identity: identity.clone(),
                        expected: operation.success(),
                        actual: notification.status,
                    });
                }
            }
        }
    }

    async fn wait_for_deletions(
        &self,
        pending: &mut PendingDeletionSet,
        store: &dyn IndexStore,
        scope: &ProjectEnv,
    ) -> Result<Vec<StackName>, WatchError> {
        self.guard_ready()?;

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        // Completion events for stacks deleted before we attached are gone
        // for good; confirm anything that already does not exist.
        let outstanding: Vec<_> = pending.outstanding().cloned().collect();
        for entry in outstanding {
            if !self.gateway.exists(entry.identity().name()).await? {
                pending.confirm(entry.identity().id());
            }
        }

        let mut empty_batches = 0;
        let mut failure: Option<WatchError> = None;

        // One retry budget shared across the whole batch. Deletions complete
        // out of order, so every payload is matched against every entry
        // still outstanding.
        'monitor: while pending.has_more() {
            let batch = match self.source.receive().await {
                Ok(batch) => batch,
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };

            if batch.is_empty() {
                empty_batches += 1;
                if empty_batches >= EMPTY_BATCH_LIMIT {
                    let first = pending
                        .outstanding()
                        .next()
                        .map(|e| e.identity().clone())
                        .expect("has_more implies an outstanding entry");
                    failure = Some(WatchError::gave_up(&first, StackOperation::Delete));
                    break;
                }
                continue;
            }
            empty_batches = 0;

            for payload in &batch {
                let Some(notification) = StackNotification::parse(payload) else {
                    continue;
                };
                let Some(matched) = pending
                    .outstanding()
                    .find(|e| notification.concerns(e.identity()))
                    .map(|e| e.identity().clone())
                else {
                    continue;
                };

                if notification.status == StackStatus::DeleteComplete {
                    tracing::debug!("deletion of {} confirmed", matched);
                    pending.confirm(matched.id());
                } else if StackOperation::Delete.is_abort(notification.status) {
                    // One abort stops monitoring of the entire batch.
                    failure = Some(WatchError::WrongStatus {
                        identity: matched,
                        expected: StackStatus::DeleteComplete,
                        actual: notification.status,
                    });
                    break 'monitor;
                }
            }
        }

        match settle_watermark(pending, store, scope).await {
            Ok(()) => {}
            Err(e) if failure.is_some() => {
                tracing::warn!("watermark write after failed rollback also failed: {}", e);
            }
            Err(e) => return Err(WatchError::Index(e)),
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(pending.confirmed_names()),
        }
    }
}
