// ABOUTME: In-flight deletion tracking for rollback.
// ABOUTME: Ordered highest-delta-first; derives the new watermark on settlement.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{StackId, StackIdentity, StackName};

use super::DeltaIndex;

/// One stack slated for deletion, tagged with the watermark value its
/// creation advanced the index to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPending {
    delta: DeltaIndex,
    identity: StackIdentity,
}

impl DeletionPending {
    pub fn new(delta: DeltaIndex, identity: StackIdentity) -> Self {
        Self { delta, identity }
    }

    pub fn delta(&self) -> DeltaIndex {
        self.delta
    }

    pub fn identity(&self) -> &StackIdentity {
        &self.identity
    }
}

// Descending by delta: last applied, first removed. Ties (which a valid
// template directory cannot produce) fall back to the stack id for a total
// order.
impl Ord for DeletionPending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .delta
            .cmp(&self.delta)
            .then_with(|| self.identity.id().as_str().cmp(other.identity.id().as_str()))
    }
}

impl PartialOrd for DeletionPending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The set of deletions one rollback invocation is waiting on.
///
/// Entries are iterated highest delta first. Confirmations arrive in any
/// order; a confirmed entry stays confirmed. Once the batch settles the set
/// derives the new watermark from what actually got confirmed, not from
/// what was asked for.
#[derive(Debug, Default)]
pub struct PendingDeletionSet {
    entries: Vec<DeletionPending>,
    confirmed: HashSet<String>,
}

impl PendingDeletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, delta: DeltaIndex, identity: StackIdentity) {
        self.entries.push(DeletionPending::new(delta, identity));
        self.entries.sort();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, highest delta first.
    pub fn iter(&self) -> impl Iterator<Item = &DeletionPending> {
        self.entries.iter()
    }

    /// Entries not yet confirmed deleted, highest delta first.
    pub fn outstanding(&self) -> impl Iterator<Item = &DeletionPending> {
        self.entries
            .iter()
            .filter(|e| !self.confirmed.contains(e.identity().id().as_str()))
    }

    /// Mark the stack with this id as confirmed deleted. Returns false for
    /// ids that are not members or were already confirmed.
    pub fn confirm(&mut self, id: &StackId) -> bool {
        let known = self
            .entries
            .iter()
            .any(|e| e.identity().id() == id);
        if !known {
            return false;
        }
        self.confirmed.insert(id.as_str().to_string())
    }

    /// True while at least one entry has not been confirmed.
    pub fn has_more(&self) -> bool {
        self.confirmed.len() < self.entries.len()
    }

    /// Names of the stacks confirmed deleted, highest delta first.
    pub fn confirmed_names(&self) -> Vec<StackName> {
        self.entries
            .iter()
            .filter(|e| self.confirmed.contains(e.identity().id().as_str()))
            .map(|e| e.identity().name().clone())
            .collect()
    }

    /// The watermark to store once the batch has settled: one below the
    /// lowest confirmed delta. Deliberately the minimum, not the maximum:
    /// if a higher-delta deletion never confirmed, rolling the watermark
    /// only as far as the lowest confirmed keeps a rerun resumable.
    /// `None` when nothing was confirmed.
    pub fn applied_watermark(&self) -> Option<DeltaIndex> {
        self.entries
            .iter()
            .filter(|e| self.confirmed.contains(e.identity().id().as_str()))
            .map(|e| e.delta())
            .min()
            .map(|lowest| lowest.prev())
    }
}
