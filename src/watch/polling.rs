// ABOUTME: Polling status waiter: sleep, describe, repeat.
// ABOUTME: Interval grows by a fixed step up to a cap; checks are bounded.

use async_trait::async_trait;
use std::time::Duration;

use crate::delta::{IndexStore, PendingDeletionSet};
use crate::gateway::{StackError, StackOps};
use crate::types::{ProjectEnv, StackIdentity, StackName, StackOperation, StackStatus};

use super::{StatusWaiter, WatchError, settle_watermark};

/// Tuning for the poll loop.
///
/// The interval starts small to catch fast operations, then grows by
/// `step` per check up to `cap` so a slow operation is not hammering the
/// API. `max_checks` bounds the loop; tests rely on that bound.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub initial: Duration,
    pub step: Duration,
    pub cap: Duration,
    pub max_checks: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            step: Duration::from_secs(2),
            cap: Duration::from_secs(30),
            max_checks: 400,
        }
    }
}

/// Status waiter that repeatedly queries the gateway.
pub struct PollingWaiter<'g, G> {
    gateway: &'g G,
    config: PollConfig,
}

impl<'g, G: StackOps> PollingWaiter<'g, G> {
    pub fn new(gateway: &'g G, config: PollConfig) -> Self {
        Self { gateway, config }
    }

    /// One describe, with the delete-of-missing special case folded in.
    /// `Ok(None)` means the stack does not exist.
    async fn current_status(
        &self,
        name: &StackName,
    ) -> Result<Option<StackStatus>, WatchError> {
        match self.gateway.describe(name).await {
            Ok(description) => Ok(Some(description.status)),
            Err(StackError::NotFound(_)) => Ok(None),
            Err(StackError::Ambiguous { name, count }) => {
                Err(WatchError::AmbiguousStackCount { name, count })
            }
            Err(e) => Err(WatchError::Gateway(e)),
        }
    }
}

#[async_trait]
impl<G: StackOps> StatusWaiter for PollingWaiter<'_, G> {
    async fn wait_for(
        &self,
        identity: &StackIdentity,
        operation: StackOperation,
    ) -> Result<StackStatus, WatchError> {
        let mut in_progress = operation.in_progress();
        let mut interval = self.config.initial;

        for _ in 0..self.config.max_checks {
            tokio::time::sleep(interval).await;
            interval = (interval + self.config.step).min(self.config.cap);

            let status = match self.current_status(identity.name()).await? {
                Some(status) => status,
                // Deletions are idempotent: a stack that is already gone is
                // a completed deletion, whether we ever saw it in progress.
                None if operation == StackOperation::Delete => {
                    return Ok(StackStatus::DeleteComplete);
                }
                None => {
                    return Err(WatchError::Gateway(StackError::NotFound(
                        identity.name().to_string(),
                    )));
                }
            };

            if status == in_progress {
                continue;
            }
            // UPDATE settles through a cleanup phase; re-enter the loop with
            // it as the new in-progress status.
            if operation.is_interim(status) {
                in_progress = status;
                continue;
            }
            if status == operation.success() {
                return Ok(status);
            }

            if operation.is_abort(status) {
                tracing::error!("stack {} aborted {}: {}", identity, operation, status);
            }
            return Err(WatchError::WrongStatus {
                identity: identity.clone(),
                expected: operation.success(),
                actual: status,
            });
        }

        Err(WatchError::gave_up(identity, operation))
    }

    async fn wait_for_deletions(
        &self,
        pending: &mut PendingDeletionSet,
        store: &dyn IndexStore,
        scope: &ProjectEnv,
    ) -> Result<Vec<StackName>, WatchError> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut interval = self.config.initial;
        let mut failure: Option<WatchError> = None;

        // One shared check budget for the whole batch, not one per entry.
        'monitor: for _ in 0..self.config.max_checks {
            if !pending.has_more() {
                break;
            }

            tokio::time::sleep(interval).await;
            interval = (interval + self.config.step).min(self.config.cap);

            let outstanding: Vec<_> = pending.outstanding().cloned().collect();
            for entry in outstanding {
                let identity = entry.identity();
                match self.current_status(identity.name()).await {
                    Ok(None) | Ok(Some(StackStatus::DeleteComplete)) => {
                        tracing::debug!("deletion of {} confirmed", identity);
                        pending.confirm(identity.id());
                    }
                    Ok(Some(status)) if StackOperation::Delete.is_abort(status) => {
                        failure = Some(WatchError::WrongStatus {
                            identity: identity.clone(),
                            expected: StackStatus::DeleteComplete,
                            actual: status,
                        });
                        break 'monitor;
                    }
                    Ok(Some(_)) => {}
                    Err(e) => {
                        failure = Some(e);
                        break 'monitor;
                    }
                }
            }
        }

        if failure.is_none() && pending.has_more() {
            let first = pending
                .outstanding()
                .next()
                .map(|e| e.identity().clone())
                .expect("has_more implies an outstanding entry");
            failure = Some(WatchError::gave_up(&first, StackOperation::Delete));
        }

        // Persist whatever was confirmed even on failure; that is what makes
        // a rerun resume instead of repeating completed deletions.
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
