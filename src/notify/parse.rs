// ABOUTME: Parser for the line-oriented Key='Value' notification payload.
// ABOUTME: Unparseable payloads become None, never an error.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{StackId, StackIdentity, StackStatus};

/// ResourceType value marking a stack-level notification. Everything else
/// in the stream is noise from child resources.
pub const STACK_RESOURCE_TYPE: &str = "Provision::Stack";

/// A parsed status notification.
#[derive(Debug, Clone)]
pub struct StackNotification {
    pub stack_name: String,
    pub stack_id: StackId,
    pub resource_type: String,
    pub status: StackStatus,
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StackNotification {
    /// Parse a newline-separated `Key='Value'` payload.
    ///
    /// Returns `None` for anything that does not carry a parseable
    /// stack-lifecycle status with a stack id; the stream mixes in child
    /// resource events and other noise, so failure to parse is routine.
    pub fn parse(payload: &str) -> Option<Self> {
        let mut fields = HashMap::new();
        for line in payload.lines() {
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let raw = raw.trim_end_matches('\r');
            let Some(value) = raw.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) else {
                continue;
            };
            fields.insert(key.trim(), value);
        }

        let stack_name = fields.get("StackName")?.to_string();
        let stack_id = StackId::new(*fields.get("StackId")?);
        let resource_type = fields.get("ResourceType")?.to_string();
        let status: StackStatus = fields.get("ResourceStatus")?.parse().ok()?;

        let reason = fields
            .get("ResourceStatusReason")
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string());
        let timestamp = fields
            .get("Timestamp")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(Self {
            stack_name,
            stack_id,
            resource_type,
            status,
            reason,
            timestamp,
        })
    }

    /// Whether this notification is about the stack itself rather than one
    /// of its child resources.
    pub fn is_stack_level(&self) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE
    }

    /// Whether this notification concerns the given stack. Correlation is
    /// by id: a name match alone never qualifies.
    pub fn concerns(&self, identity: &StackIdentity) -> bool {
        self.is_stack_level() && self.stack_id == *identity.id()
    }
}
