// ABOUTME: Test support utilities.
// ABOUTME: In-memory gateway, notification source, and index store fakes.

// Each test binary only uses some of these fakes.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Once;

use strata::delta::{DeltaIndex, IndexError, IndexStore};
use strata::gateway::{
    AnchorResource, StackDescription, StackError, StackEvent, StackOps, StackRequest, TagError,
    TagOps,
};
use strata::notify::{NotificationSource, NotifyError};
use strata::types::{ProjectEnv, ResourceId, StackId, StackIdentity, StackName, StackStatus};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("strata=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One fake stack held by the gateway.
#[derive(Debug, Clone)]
pub struct FakeStack {
    pub id: String,
    pub status: StackStatus,
    pub tags: HashMap<String, String>,
}

#[derive(Default)]
pub struct GatewayState {
    /// Live stacks by name.
    pub stacks: HashMap<String, FakeStack>,
    /// Scripted status sequences consumed by describe, one per name. The
    /// last entry repeats; `None` means "not found".
    pub describe_scripts: HashMap<String, VecDeque<Option<StackStatus>>>,
    /// Terminal status a create settles into (defaults to CreateComplete).
    pub create_outcomes: HashMap<String, StackStatus>,
    /// Status left behind by a delete; absent means the stack vanishes.
    pub delete_outcomes: HashMap<String, StackStatus>,
    /// Event histories served by describe_events.
    pub events: HashMap<String, Vec<StackEvent>>,
    /// Names whose describe violates the one-stack assumption.
    pub ambiguous: HashMap<String, usize>,
    /// Every mutating call, in order, as "op:name".
    pub calls: Vec<String>,
    next_id: u32,
}

/// Scriptable in-memory stack gateway.
#[derive(Default)]
pub struct FakeGateway {
    pub state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_stack(
        &self,
        name: &str,
        id: &str,
        status: StackStatus,
        tags: HashMap<String, String>,
    ) {
        self.state.lock().stacks.insert(
            name.to_string(),
            FakeStack {
                id: id.to_string(),
                status,
                tags,
            },
        );
    }

    /// Script the statuses successive describes of `name` will see.
    pub fn script_describe(&self, name: &str, statuses: Vec<Option<StackStatus>>) {
        self.state
            .lock()
            .describe_scripts
            .insert(name.to_string(), statuses.into());
    }

    pub fn set_create_outcome(&self, name: &str, status: StackStatus) {
        self.state
            .lock()
            .create_outcomes
            .insert(name.to_string(), status);
    }

    pub fn clear_create_outcome(&self, name: &str) {
        self.state.lock().create_outcomes.remove(name);
    }

    pub fn set_delete_outcome(&self, name: &str, status: StackStatus) {
        self.state
            .lock()
            .delete_outcomes
            .insert(name.to_string(), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn stack_id(&self, name: &str) -> Option<String> {
        self.state.lock().stacks.get(name).map(|s| s.id.clone())
    }

    pub fn set_ambiguous(&self, name: &str, count: usize) {
        self.state
            .lock()
            .ambiguous
            .insert(name.to_string(), count);
    }

    fn describe_inner(&self, name: &str) -> Result<StackDescription, StackError> {
        let mut state = self.state.lock();

        if let Some(&count) = state.ambiguous.get(name) {
            return Err(StackError::Ambiguous {
                name: name.to_string(),
                count,
            });
        }

        let scripted = match state.describe_scripts.get_mut(name) {
            Some(script) if script.len() > 1 => Some(script.pop_front().unwrap()),
            Some(script) => script.front().copied(),
            None => None,
        };

        let (status, stack) = match scripted {
            Some(None) => return Err(StackError::NotFound(name.to_string())),
            Some(Some(status)) => {
                let stack = state.stacks.get(name).cloned().unwrap_or(FakeStack {
                    id: format!("id-{name}"),
                    status,
                    tags: HashMap::new(),
                });
                (status, stack)
            }
            None => match state.stacks.get(name) {
                Some(stack) => (stack.status, stack.clone()),
                None => return Err(StackError::NotFound(name.to_string())),
            },
        };

        Ok(StackDescription {
            identity: StackIdentity::new(
                StackName::new(name).expect("fake stack names are valid"),
                StackId::new(stack.id),
            ),
            status,
            tags: stack.tags,
        })
    }
}

#[async_trait]
impl StackOps for FakeGateway {
    async fn describe(&self, name: &StackName) -> Result<StackDescription, StackError> {
        self.describe_inner(name.as_str())
    }

    async fn describe_all(&self) -> Result<Vec<StackDescription>, StackError> {
        let names: Vec<String> = self.state.lock().stacks.keys().cloned().collect();
        let mut all = Vec::new();
        for name in names {
            if let Ok(description) = self.describe_inner(&name) {
                all.push(description);
            }
        }
        Ok(all)
    }

    async fn create(&self, request: &StackRequest) -> Result<StackIdentity, StackError> {
        let mut state = self.state.lock();
        let name = request.name.as_str().to_string();
        state.calls.push(format!("create:{name}"));

        state.next_id += 1;
        let id = format!("id-{}-{}", name, state.next_id);
        let status = state
            .create_outcomes
            .get(&name)
            .copied()
            .unwrap_or(StackStatus::CreateComplete);
        state.stacks.insert(
            name.clone(),
            FakeStack {
                id: id.clone(),
                status,
                tags: request.tags.clone(),
            },
        );
        Ok(StackIdentity::new(request.name.clone(), StackId::new(id)))
    }

    async fn update(&self, request: &StackRequest) -> Result<StackIdentity, StackError> {
        let mut state = self.state.lock();
        let name = request.name.as_str().to_string();
        state.calls.push(format!("update:{name}"));

        let stack = state
            .stacks
            .get_mut(&name)
            .ok_or_else(|| StackError::NotFound(name.clone()))?;
        stack.status = StackStatus::UpdateComplete;
        stack.tags = request.tags.clone();
        let id = stack.id.clone();
        Ok(StackIdentity::new(request.name.clone(), StackId::new(id)))
    }

    async fn delete(&self, name: &StackName) -> Result<(), StackError> {
        let mut state = self.state.lock();
        let name = name.as_str().to_string();
        state.calls.push(format!("delete:{name}"));

        match state.delete_outcomes.get(&name).copied() {
            Some(status) => {
                if let Some(stack) = state.stacks.get_mut(&name) {
                    stack.status = status;
                }
            }
            None => {
                state.stacks.remove(&name);
            }
        }
        Ok(())
    }

    async fn describe_events(&self, name: &StackName) -> Result<Vec<StackEvent>, StackError> {
        Ok(self
            .state
            .lock()
            .events
            .get(name.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted notification source: each receive pops one batch; when the
/// script runs out, batches are empty.
#[derive(Default)]
pub struct FakeSource {
    pub ready: Mutex<bool>,
    pub batches: Mutex<VecDeque<Vec<String>>>,
    pub receives: Mutex<u32>,
}

impl FakeSource {
    pub fn ready() -> Self {
        Self {
            ready: Mutex::new(true),
            ..Default::default()
        }
    }

    pub fn push_batch(&self, batch: Vec<String>) {
        self.batches.lock().push_back(batch);
    }

    pub fn receive_count(&self) -> u32 {
        *self.receives.lock()
    }
}

#[async_trait]
impl NotificationSource for FakeSource {
    fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    async fn receive(&self) -> Result<Vec<String>, NotifyError> {
        if !self.is_ready() {
            return Err(NotifyError::NotReady);
        }
        *self.receives.lock() += 1;
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }
}

/// In-memory watermark store recording every write.
#[derive(Default)]
pub struct MemoryIndexStore {
    values: Mutex<HashMap<String, DeltaIndex>>,
    pub writes: Mutex<Vec<DeltaIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(scope: &ProjectEnv, index: u32) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .insert(scope.to_string(), DeltaIndex::new(index));
        store
    }

    pub fn current(&self, scope: &ProjectEnv) -> DeltaIndex {
        self.values
            .lock()
            .get(&scope.to_string())
            .copied()
            .unwrap_or(DeltaIndex::ZERO)
    }

    pub fn write_log(&self) -> Vec<u32> {
        self.writes.lock().iter().map(|i| i.value()).collect()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn get(&self, scope: &ProjectEnv) -> Result<DeltaIndex, IndexError> {
        Ok(self.current(scope))
    }

    async fn set(&self, scope: &ProjectEnv, index: DeltaIndex) -> Result<(), IndexError> {
        self.values.lock().insert(scope.to_string(), index);
        self.writes.lock().push(index);
        Ok(())
    }
}

/// Anchor-backed tag store fake for TagIndexStore tests.
#[derive(Default)]
pub struct FakeTagGateway {
    pub anchors: Mutex<HashMap<String, String>>,
    pub tags: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl FakeTagGateway {
    pub fn with_anchor(scope: &ProjectEnv, resource_id: &str) -> Self {
        let fake = Self::default();
        fake.anchors
            .lock()
            .insert(scope.to_string(), resource_id.to_string());
        fake
    }

    pub fn tag_value(&self, resource_id: &str, key: &str) -> Option<String> {
        self.tags
            .lock()
            .get(resource_id)
            .and_then(|tags| tags.get(key))
            .cloned()
    }

    pub fn set_tag(&self, resource_id: &str, key: &str, value: &str) {
        self.tags
            .lock()
            .entry(resource_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl TagOps for FakeTagGateway {
    async fn find_anchor(&self, scope: &ProjectEnv) -> Result<AnchorResource, TagError> {
        let anchors = self.anchors.lock();
        let id = anchors
            .get(&scope.to_string())
            .ok_or_else(|| TagError::AnchorNotFound(scope.to_string()))?;
        Ok(AnchorResource {
            id: ResourceId::new(id.clone()),
            tags: HashMap::new(),
        })
    }

    async fn read_tag(
        &self,
        resource: &ResourceId,
        key: &str,
    ) -> Result<Option<String>, TagError> {
        Ok(self.tag_value(resource.as_str(), key))
    }

    async fn write_tag(
        &self,
        resource: &ResourceId,
        key: &str,
        value: &str,
    ) -> Result<(), TagError> {
        self.set_tag(resource.as_str(), key, value);
        Ok(())
    }
}

/// Build a stack-level notification payload in the wire format.
pub fn notification(stack_name: &str, stack_id: &str, status: &str) -> String {
    format!(
        "StackName='{stack_name}'\n\
         StackId='{stack_id}'\n\
         EventId='e-{stack_id}-{status}'\n\
         LogicalResourceId='{stack_name}'\n\
         PhysicalResourceId='{stack_id}'\n\
         ResourceType='Provision::Stack'\n\
         Timestamp='2026-03-01T10:15:30Z'\n\
         ResourceStatus='{status}'\n\
         ResourceStatusReason=''"
    )
}

/// Template directory populated with minimal stack templates.
pub fn template_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        std::fs::write(dir.path().join(file), "{\"resources\": {}}\n").unwrap();
    }
    dir
}

/// Fast poll settings so waiter tests finish in milliseconds.
pub fn fast_poll(max_checks: u32) -> strata::watch::PollConfig {
    strata::watch::PollConfig {
        initial: std::time::Duration::from_millis(1),
        step: std::time::Duration::from_millis(1),
        cap: std::time::Duration::from_millis(5),
        max_checks,
    }
}
