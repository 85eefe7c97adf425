// ABOUTME: Tests for ordered apply: watermark filtering, resume, duplicates.
// ABOUTME: Drives the orchestrator against the in-memory gateway fakes.

mod support;

use support::{FakeGateway, MemoryIndexStore, fast_poll, template_dir};

use strata::deploy::{DeployError, Orchestrator, UnitError};
use strata::gateway::StackRepository;
use strata::types::{ProjectEnv, StackStatus};
use strata::watch::PollingWaiter;

fn scope() -> ProjectEnv {
    ProjectEnv::new("acme", "qa")
}

#[tokio::test]
async fn applies_only_files_above_watermark_in_order() {
    support::init_tracing();
    let dir = template_dir(&[
        "01createSubnet.json",
        "02createAcls.json",
        "03createWeb.json",
    ]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::with_value(&scope(), 1);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();

    let names: Vec<&str> = applied.iter().map(|i| i.name().as_str()).collect();
    assert_eq!(names, vec!["acme-createAcls-qa", "acme-createWeb-qa"]);

    let calls = repository.gateway().calls();
    assert_eq!(
        calls,
        vec!["create:acme-createAcls-qa", "create:acme-createWeb-qa"]
    );
    // File 1 is below the watermark and is never attempted.
    assert!(!calls.iter().any(|c| c.contains("createSubnet")));
    assert_eq!(store.write_log(), vec![2, 3]);
}

#[tokio::test]
async fn failure_leaves_watermark_at_last_success_and_resume_applies_the_rest() {
    let dir = template_dir(&[
        "01createSubnet.json",
        "02createAcls.json",
        "03createWeb.json",
    ]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    // The third create rolls back.
    repository
        .gateway()
        .set_create_outcome("acme-createWeb-qa", StackStatus::RollbackComplete);

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let err = orchestrator.apply_outstanding(dir.path()).await.unwrap_err();
    assert!(matches!(err, DeployError::Watch(_)));
    assert_eq!(store.current(&scope()).value(), 2);

    // Fixed template: the re-run clears the rolled-back remnant and applies
    // only file 3.
    repository.gateway().clear_create_outcome("acme-createWeb-qa");
    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();

    let names: Vec<&str> = applied.iter().map(|i| i.name().as_str()).collect();
    assert_eq!(names, vec!["acme-createWeb-qa"]);
    assert_eq!(store.current(&scope()).value(), 3);

    let calls = repository.gateway().calls();
    let rerun = &calls[3..];
    assert_eq!(
        rerun,
        ["delete:acme-createWeb-qa", "create:acme-createWeb-qa"]
    );
}

#[tokio::test]
async fn live_stack_with_target_name_is_a_hard_stop() {
    let dir = template_dir(&["01createSubnet.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    repository.gateway().insert_stack(
        "acme-createSubnet-qa",
        "id-existing",
        StackStatus::CreateComplete,
        Default::default(),
    );
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let err = orchestrator.apply_outstanding(dir.path()).await.unwrap_err();
    assert!(matches!(err, DeployError::DuplicateStack(_)));
    assert!(repository.gateway().calls().is_empty());
    assert!(store.write_log().is_empty());
}

#[tokio::test]
async fn delta_files_update_the_earlier_stack_in_place() {
    let dir = template_dir(&["01createSubnet.json", "02createSubnet.delta.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();

    assert_eq!(applied.len(), 2);
    // Both files target the same stack; the update keeps the original id.
    assert_eq!(applied[0].name(), applied[1].name());
    assert_eq!(applied[0].id(), applied[1].id());

    assert_eq!(
        repository.gateway().calls(),
        vec!["create:acme-createSubnet-qa", "update:acme-createSubnet-qa"]
    );
    assert_eq!(store.current(&scope()).value(), 2);
}

#[tokio::test]
async fn mid_rollback_stack_settles_then_is_replaced() {
    let dir = template_dir(&["01createSubnet.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    let gateway = repository.gateway();
    gateway.insert_stack(
        "acme-createSubnet-qa",
        "id-old",
        StackStatus::RollbackInProgress,
        Default::default(),
    );
    // Rollback settles, the carcass is deleted, the recreate completes.
    gateway.script_describe(
        "acme-createSubnet-qa",
        vec![
            Some(StackStatus::RollbackInProgress),
            Some(StackStatus::RollbackComplete),
            None,
            Some(StackStatus::CreateComplete),
        ],
    );
    let waiter = PollingWaiter::new(gateway, fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(
        repository.gateway().calls(),
        vec!["delete:acme-createSubnet-qa", "create:acme-createSubnet-qa"]
    );
    assert_eq!(store.current(&scope()).value(), 1);
}

#[tokio::test]
async fn builtin_build_parameter_requires_build_number() {
    let dir = template_dir(&["01createSubnet.json"]);
    std::fs::write(
        dir.path().join("01createSubnet.params.yml"),
        "BuildNumber:\n  builtin: build\n",
    )
    .unwrap();

    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    // Without --build the apply refuses before touching the gateway.
    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let err = orchestrator.apply_outstanding(dir.path()).await.unwrap_err();
    assert!(matches!(
        err,
        DeployError::Units(UnitError::MustHaveBuildNumber { .. })
    ));
    assert!(repository.gateway().calls().is_empty());

    // With a build number the stack name carries the qualifier.
    let mut orchestrator =
        Orchestrator::new(&repository, &waiter, &store, scope()).with_build(Some(42));
    let applied = orchestrator.apply_outstanding(dir.path()).await.unwrap();
    assert_eq!(applied[0].name().as_str(), "acme-createSubnet-qa-b42");
}

#[tokio::test]
async fn duplicate_indices_in_directory_are_rejected() {
    let dir = template_dir(&["01createSubnet.json", "01createAcls.json"]);
    let repository = StackRepository::new(FakeGateway::new());
    let waiter = PollingWaiter::new(repository.gateway(), fast_poll(20));
    let store = MemoryIndexStore::new();

    let mut orchestrator = Orchestrator::new(&repository, &waiter, &store, scope());
    let err = orchestrator.apply_outstanding(dir.path()).await.unwrap_err();
    assert!(matches!(
        err,
        DeployError::Units(UnitError::DuplicateIndex { index: 1, .. })
    ));
}
