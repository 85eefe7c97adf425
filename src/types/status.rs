// ABOUTME: Stack lifecycle statuses and the per-operation status tables.
// ABOUTME: Each operation knows its in-progress, success, and abort statuses.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a stack as reported by the provisioning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateCompleteCleanupInProgress,
    UpdateRollbackInProgress,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    /// Generic failure reported when a waiter gives up without observing a
    /// terminal status. Never parsed from the wire.
    Failed,
}

impl StackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackStatus::CreateInProgress => "CREATE_IN_PROGRESS",
            StackStatus::CreateComplete => "CREATE_COMPLETE",
            StackStatus::CreateFailed => "CREATE_FAILED",
            StackStatus::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            StackStatus::RollbackComplete => "ROLLBACK_COMPLETE",
            StackStatus::RollbackFailed => "ROLLBACK_FAILED",
            StackStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            StackStatus::UpdateComplete => "UPDATE_COMPLETE",
            StackStatus::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            StackStatus::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            StackStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
            StackStatus::DeleteComplete => "DELETE_COMPLETE",
            StackStatus::DeleteFailed => "DELETE_FAILED",
            StackStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown stack status: {0}")]
pub struct ParseStackStatusError(String);

impl FromStr for StackStatus {
    type Err = ParseStackStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE_IN_PROGRESS" => Ok(StackStatus::CreateInProgress),
            "CREATE_COMPLETE" => Ok(StackStatus::CreateComplete),
            "CREATE_FAILED" => Ok(StackStatus::CreateFailed),
            "ROLLBACK_IN_PROGRESS" => Ok(StackStatus::RollbackInProgress),
            "ROLLBACK_COMPLETE" => Ok(StackStatus::RollbackComplete),
            "ROLLBACK_FAILED" => Ok(StackStatus::RollbackFailed),
            "UPDATE_IN_PROGRESS" => Ok(StackStatus::UpdateInProgress),
            "UPDATE_COMPLETE" => Ok(StackStatus::UpdateComplete),
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Ok(StackStatus::UpdateCompleteCleanupInProgress)
            }
            "UPDATE_ROLLBACK_IN_PROGRESS" => Ok(StackStatus::UpdateRollbackInProgress),
            "DELETE_IN_PROGRESS" => Ok(StackStatus::DeleteInProgress),
            "DELETE_COMPLETE" => Ok(StackStatus::DeleteComplete),
            "DELETE_FAILED" => Ok(StackStatus::DeleteFailed),
            other => Err(ParseStackStatusError(other.to_string())),
        }
    }
}

// Abort tables are plain const data looked up by operation kind, shared by
// both waiter strategies.
const CREATE_ABORTS: &[StackStatus] = &[
    StackStatus::CreateFailed,
    StackStatus::RollbackInProgress,
    StackStatus::RollbackComplete,
    StackStatus::RollbackFailed,
];

const UPDATE_ABORTS: &[StackStatus] = &[StackStatus::UpdateRollbackInProgress];

const DELETE_ABORTS: &[StackStatus] = &[StackStatus::DeleteFailed];

const ROLLBACK_ABORTS: &[StackStatus] = &[StackStatus::RollbackFailed];

/// The kind of stack operation being monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOperation {
    Create,
    Update,
    Delete,
    /// Waiting for a provider-initiated rollback to settle.
    Rollback,
}

impl StackOperation {
    /// The non-terminal status the operation starts in.
    pub fn in_progress(&self) -> StackStatus {
        match self {
            StackOperation::Create => StackStatus::CreateInProgress,
            StackOperation::Update => StackStatus::UpdateInProgress,
            StackOperation::Delete => StackStatus::DeleteInProgress,
            StackOperation::Rollback => StackStatus::RollbackInProgress,
        }
    }

    /// The terminal status that means the operation succeeded.
    pub fn success(&self) -> StackStatus {
        match self {
            StackOperation::Create => StackStatus::CreateComplete,
            StackOperation::Update => StackStatus::UpdateComplete,
            StackOperation::Delete => StackStatus::DeleteComplete,
            StackOperation::Rollback => StackStatus::RollbackComplete,
        }
    }

    /// Statuses that definitively signal the operation did not succeed.
    pub fn aborts(&self) -> &'static [StackStatus] {
        match self {
            StackOperation::Create => CREATE_ABORTS,
            StackOperation::Update => UPDATE_ABORTS,
            StackOperation::Delete => DELETE_ABORTS,
            StackOperation::Rollback => ROLLBACK_ABORTS,
        }
    }

    pub fn is_abort(&self, status: StackStatus) -> bool {
        self.aborts().contains(&status)
    }

    /// True for statuses that are neither success nor abort but mean the
    /// operation is still settling. UPDATE passes through a cleanup phase
    /// after reporting progress; the wait loop must re-enter with it.
    pub fn is_interim(&self, status: StackStatus) -> bool {
        *self == StackOperation::Update && status == StackStatus::UpdateCompleteCleanupInProgress
    }
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StackOperation::Create => "create",
            StackOperation::Update => "update",
            StackOperation::Delete => "delete",
            StackOperation::Rollback => "rollback",
        };
        f.write_str(s)
    }
}
