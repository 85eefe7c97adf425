// ABOUTME: Read-through repository over StackOps with a per-name cache.
// ABOUTME: Resolves stack ownership by tag; safe under single-threaded use only.

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::tags;
use crate::types::{ProjectEnv, StackName};

use super::error::StackError;
use super::traits::StackOps;
use super::types::StackDescription;

/// Caching wrapper over a stack gateway.
///
/// Describe results are cached by name and invalidated whenever the caller
/// knows the stack changed (apply, delete). One orchestration run owns one
/// repository; the cache is not meant to be shared across threads.
pub struct StackRepository<G> {
    gateway: G,
    cache: Mutex<HashMap<String, StackDescription>>,
}

impl<G: StackOps> StackRepository<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Describe a stack, serving repeated lookups from the cache.
    pub async fn describe(&self, name: &StackName) -> Result<StackDescription, StackError> {
        if let Some(cached) = self.cache.lock().get(name.as_str()) {
            return Ok(cached.clone());
        }

        let description = self.gateway.describe(name).await?;
        self.cache
            .lock()
            .insert(name.as_str().to_string(), description.clone());
        Ok(description)
    }

    /// Drop any cached entry for a stack whose state is about to change.
    pub fn invalidate(&self, name: &StackName) {
        self.cache.lock().remove(name.as_str());
    }

    /// All stacks owned by this scope, freshest data. Refreshes the cache
    /// for every stack it returns.
    pub async fn owned_by(&self, scope: &ProjectEnv) -> Result<Vec<StackDescription>, StackError> {
        let all = self.gateway.describe_all().await?;
        let owned: Vec<StackDescription> = all
            .into_iter()
            .filter(|d| tags::owned_by(&d.tags, scope))
            .collect();

        let mut cache = self.cache.lock();
        for description in &owned {
            cache.insert(
                description.identity.name().as_str().to_string(),
                description.clone(),
            );
        }
        Ok(owned)
    }
}
