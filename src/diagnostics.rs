// ABOUTME: Failure diagnostics: event history dumps and non-fatal warnings.
// ABOUTME: Best-effort only; must never mask the error being diagnosed.

use crate::gateway::StackOps;
use crate::types::StackName;

/// Fetch and log a stack's event history after an abort was detected.
///
/// Purely diagnostic: a failure fetching the history is logged and
/// swallowed so the original error keeps propagating.
pub async fn dump_stack_events<G: StackOps>(gateway: &G, name: &StackName) {
    match gateway.describe_events(name).await {
        Ok(events) => {
            for event in events {
                tracing::error!(
                    "event history {}: {} {} {} ({})",
                    name,
                    event.timestamp,
                    event.logical_resource_id,
                    event.status,
                    event.reason.as_deref().unwrap_or("-"),
                );
            }
        }
        Err(e) => {
            tracing::warn!("could not fetch event history for {}: {}", name, e);
        }
    }
}

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A rollback target had no live stack to delete.
    pub fn missing_stack(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MissingStack,
            message: message.into(),
        }
    }

    /// The event history fetch after a failure itself failed.
    pub fn event_history(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::EventHistory,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A template at or below the watermark has no matching live stack.
    MissingStack,
    /// Event history could not be fetched for diagnostics.
    EventHistory,
}
