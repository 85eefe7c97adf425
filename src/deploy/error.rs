// ABOUTME: Error types for deployment orchestration.
// ABOUTME: Wraps unit, gateway, watch, and index failures; adds safety stops.

use std::path::PathBuf;

use crate::delta::IndexError;
use crate::gateway::StackError;
use crate::types::StackNameError;
use crate::watch::WatchError;

use super::unit::UnitError;

/// Errors that stop a deployment, rollback, or step-back.
///
/// None of these are retried; the watermark is left at the last fully
/// successful step, so a corrected re-run resumes from there.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Create attempted against a name that is already live. Safety stop
    /// against double-apply.
    #[error("a live stack named {0} already exists")]
    DuplicateStack(String),

    #[error("failed to read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid stack name: {0}")]
    Name(#[from] StackNameError),

    #[error(transparent)]
    Units(#[from] UnitError),

    #[error("gateway failure: {0}")]
    Gateway(#[from] StackError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
