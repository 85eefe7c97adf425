// ABOUTME: Tests for rollback and step-back orchestration.
// ABOUTME: Covers reverse-order deletion, watermark rewind, and delta handling.

mod support;

use support::{FakeGateway, MemoryIndexStore, fast_poll, template_dir};

use strata::deploy::Orchestrator;
use strata::gateway::StackRepository;
use strata::tags;
use strata::types::{ProjectEnv, StackStatus};
use strata::watch::PollingWaiter;

fn scope() -> ProjectEnv {
    ProjectEnv::new("acme", "qa")
}

fn insert_owned(gateway: &FakeGateway, name: &str, id: &str) {
    gateway.insert_stack(
        name,
        id,
        StackStatus::CreateComplete,
        tags::ownership_tags(&scope(), None, None),
    );
}

#[tokio::test]
async fn apply_then_rollback_round_trip() {
    support::init_tracing();
    let dir = template_dir(&["01createSubnet.json", "02createAcls.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(store.current(&scope()).value(), 2);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.rollback(dir.path()).await.unwrap();

    let names: Vec<&str> = deleted.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["acme-createAcls-qa", "acme-createSubnet-qa"]);
    assert_eq!(store.current(&scope()).value(), 0);

    // Deletes are issued highest index first, mirroring apply order.
    let calls = repository.gateway().calls();
    assert_eq!(
        calls,
        vec![
            "create:acme-createSubnet-qa",
            "create:acme-createAcls-qa",
            "delete:acme-createAcls-qa",
            "delete:acme-createSubnet-qa",
        ]
    );
}

#[tokio::test]
async fn rollback_skips_update_only_files() {
    let dir = template_dir(&["01createSubnet.json", "02createSubnet.delta.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    insert_owned(repository.gateway(), "acme-createSubnet-qa", "id-subnet");
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::with_value(&scope(), 2);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.rollback(dir.path()).await.unwrap();

    // Only the creating file's stack is torn down; the delta has no
    // resource of its own.
    let names: Vec<&str> = deleted.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["acme-createSubnet-qa"]);
    assert_eq!(
        repository.gateway().calls(),
        vec!["delete:acme-createSubnet-qa"]
    );
    assert_eq!(store.current(&scope()).value(), 0);
}

#[tokio::test]
async fn rollback_warns_about_missing_stacks_and_continues() {
    let dir = template_dir(&["01createSubnet.json", "02createAcls.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    // Only file 2's stack is live; file 1's was removed out of band.
    insert_owned(repository.gateway(), "acme-createAcls-qa", "id-acls");
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::with_value(&scope(), 2);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.rollback(dir.path()).await.unwrap();

    let names: Vec<&str> = deleted.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["acme-createAcls-qa"]);
    assert!(orchestrator.diagnostics().has_warnings());
    // Watermark rewinds only as far as the lowest confirmed delta.
    assert_eq!(store.current(&scope()).value(), 1);
}

#[tokio::test]
async fn step_back_deletes_only_the_most_recent_creation() {
    let dir = template_dir(&["01createSubnet.json", "02createAcls.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    insert_owned(repository.gateway(), "acme-createSubnet-qa", "id-subnet");
    insert_owned(repository.gateway(), "acme-createAcls-qa", "id-acls");
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::with_value(&scope(), 2);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.step_back(dir.path()).await.unwrap();

    let names: Vec<&str> = deleted.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["acme-createAcls-qa"]);
    assert_eq!(store.current(&scope()).value(), 1);
    // The lower-index stack is untouched.
    assert!(repository.gateway().stack_id("acme-createSubnet-qa").is_some());
}

#[tokio::test]
async fn step_back_on_update_only_file_just_decrements_the_watermark() {
    let dir = template_dir(&["01createSubnet.json", "02createSubnet.delta.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    insert_owned(repository.gateway(), "acme-createSubnet-qa", "id-subnet");
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::with_value(&scope(), 2);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.step_back(dir.path()).await.unwrap();

    assert!(deleted.is_empty());
    assert!(repository.gateway().calls().is_empty());
    assert_eq!(store.current(&scope()).value(), 1);
}

#[tokio::test]
async fn step_back_with_nothing_applied_is_a_no_op() {
    let dir = template_dir(&["01createSubnet.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let deleted = orchestrator.step_back(dir.path()).await.unwrap();

    assert!(deleted.is_empty());
    assert!(store.write_log().is_empty());
}
