// ABOUTME: The delta index watermark and its tag-backed persistence.
// ABOUTME: get/set of an integer tag on the per-environment anchor resource.

mod pending;

pub use pending::{DeletionPending, PendingDeletionSet};

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::gateway::{TagError, TagOps};
use crate::tags::INDEX_TAG;
use crate::types::ProjectEnv;

/// The watermark: every template file with index at or below this value has
/// been successfully applied to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeltaIndex(u32);

impl DeltaIndex {
    pub const ZERO: DeltaIndex = DeltaIndex(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn prev(&self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for DeltaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeltaIndex {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

/// Errors from watermark reads and writes.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("stored index is not a number: {0:?}")]
    BadValue(String),

    #[error(transparent)]
    Store(#[from] TagError),
}

/// Durable storage for the watermark, one value per (project, environment).
///
/// This is the only persistence the deployment protocol has. Implementations
/// must read fresh on every `get`; callers never cache across runs.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn get(&self, scope: &ProjectEnv) -> Result<DeltaIndex, IndexError>;

    async fn set(&self, scope: &ProjectEnv, index: DeltaIndex) -> Result<(), IndexError>;

    /// Reset the watermark to zero (fresh environment).
    async fn reset(&self, scope: &ProjectEnv) -> Result<(), IndexError> {
        self.set(scope, DeltaIndex::ZERO).await
    }
}

/// Watermark storage as a tag on the environment's anchor resource.
/// A missing tag reads as zero.
pub struct TagIndexStore<G> {
    gateway: G,
}

impl<G: TagOps> TagIndexStore<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<G: TagOps> IndexStore for TagIndexStore<G> {
    async fn get(&self, scope: &ProjectEnv) -> Result<DeltaIndex, IndexError> {
        let anchor = self.gateway.find_anchor(scope).await?;
        match self.gateway.read_tag(&anchor.id, INDEX_TAG).await? {
            None => Ok(DeltaIndex::ZERO),
            Some(raw) => raw.parse().map_err(|_| IndexError::BadValue(raw)),
        }
    }

    async fn set(&self, scope: &ProjectEnv, index: DeltaIndex) -> Result<(), IndexError> {
        let anchor = self.gateway.find_anchor(scope).await?;
        self.gateway
            .write_tag(&anchor.id, INDEX_TAG, &index.to_string())
            .await?;
        tracing::debug!("watermark for {} set to {}", scope, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_parses_and_displays_as_base_10() {
        let index: DeltaIndex = "42".parse().unwrap();
        assert_eq!(index, DeltaIndex::new(42));
        assert_eq!(index.to_string(), "42");
    }

    #[test]
    fn prev_saturates_at_zero() {
        assert_eq!(DeltaIndex::ZERO.prev(), DeltaIndex::ZERO);
        assert_eq!(DeltaIndex::new(3).prev(), DeltaIndex::new(2));
    }
}
