// ABOUTME: StackIdentity value type pairing a stack name with its provider id.
// ABOUTME: Equality is by id only; the id is the notification correlation key.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{StackId, StackName};

/// The identity of a remote stack.
///
/// The name is what callers ask for; the id is what the provider assigned.
/// An update never changes the id, a delete-and-recreate does, so the id is
/// the key used for deletion tracking and notification correlation.
#[derive(Debug, Clone)]
pub struct StackIdentity {
    name: StackName,
    id: StackId,
}

impl StackIdentity {
    pub fn new(name: StackName, id: StackId) -> Self {
        Self { name, id }
    }

    pub fn name(&self) -> &StackName {
        &self.name
    }

    pub fn id(&self) -> &StackId {
        &self.id
    }
}

// Equality by id only: two identities with the same name but different ids
// refer to different incarnations of the stack.
impl PartialEq for StackIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StackIdentity {}

impl Hash for StackIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for StackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
