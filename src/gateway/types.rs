// ABOUTME: Wire-facing value types exchanged with the provisioning API.
// ABOUTME: Descriptions, events, requests, and the environment anchor resource.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{EventId, ResourceId, StackIdentity};

/// Snapshot of a remote stack as returned by describe calls.
#[derive(Debug, Clone)]
pub struct StackDescription {
    pub identity: StackIdentity,
    pub status: crate::types::StackStatus,
    pub tags: HashMap<String, String>,
}

impl StackDescription {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// One entry from a stack's event history, used for failure diagnostics.
///
/// The status is kept as the raw wire string: event histories include
/// resource-level statuses that are not part of the stack lifecycle.
#[derive(Debug, Clone)]
pub struct StackEvent {
    pub event_id: EventId,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A template parameter passed to create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything needed to create or update one stack.
#[derive(Debug, Clone)]
pub struct StackRequest {
    pub name: crate::types::StackName,
    pub template_body: String,
    pub parameters: Vec<Parameter>,
    pub tags: HashMap<String, String>,
}

/// The long-lived resource carrying the watermark tag for an environment.
#[derive(Debug, Clone)]
pub struct AnchorResource {
    pub id: ResourceId,
    pub tags: HashMap<String, String>,
}
