// ABOUTME: Composable capability traits for the provisioning API.
// ABOUTME: StackOps covers stack lifecycle, TagOps covers anchor tag storage.

use async_trait::async_trait;

use crate::types::{ProjectEnv, ResourceId, StackIdentity, StackName};

use super::error::{StackError, TagError};
use super::types::{AnchorResource, StackDescription, StackEvent, StackRequest};

/// Stack lifecycle operations against the provisioning API.
///
/// `describe` must resolve a name to exactly one stack; implementations
/// report `StackError::Ambiguous` when the API violates that assumption.
#[async_trait]
pub trait StackOps: Send + Sync {
    /// Describe a single stack by name.
    async fn describe(&self, name: &StackName) -> Result<StackDescription, StackError>;

    /// Describe every stack visible to the caller.
    async fn describe_all(&self) -> Result<Vec<StackDescription>, StackError>;

    /// Create a stack. Returns the provider-assigned identity immediately;
    /// completion is observed separately through a status waiter.
    async fn create(&self, request: &StackRequest) -> Result<StackIdentity, StackError>;

    /// Update a stack in place. The identity keeps its id.
    async fn update(&self, request: &StackRequest) -> Result<StackIdentity, StackError>;

    /// Request deletion of a stack.
    async fn delete(&self, name: &StackName) -> Result<(), StackError>;

    /// Fetch the event history of a stack, newest first.
    async fn describe_events(&self, name: &StackName) -> Result<Vec<StackEvent>, StackError>;

    /// Whether a stack with this name currently exists.
    async fn exists(&self, name: &StackName) -> Result<bool, StackError> {
        match self.describe(name).await {
            Ok(_) => Ok(true),
            Err(StackError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Key-value tag storage on long-lived resources.
///
/// This is the only persistence the deployment protocol has; the watermark
/// lives in a tag on the per-environment anchor resource.
#[async_trait]
pub trait TagOps: Send + Sync {
    /// Find the single anchor resource tagged for this scope.
    async fn find_anchor(&self, scope: &ProjectEnv) -> Result<AnchorResource, TagError>;

    /// Read one tag from a resource. `None` when the tag is absent.
    async fn read_tag(&self, resource: &ResourceId, key: &str)
    -> Result<Option<String>, TagError>;

    /// Write one tag on a resource, replacing any existing value.
    async fn write_tag(
        &self,
        resource: &ResourceId,
        key: &str,
        value: &str,
    ) -> Result<(), TagError>;
}
