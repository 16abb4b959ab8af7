//! Unit tests for the allocation workflow.

use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use super::*;
use crate::shard::CapacityExhausted;
use crate::test_support::{BackendCall, ScriptedStorageBackend};

#[fixture]
fn backend() -> ScriptedStorageBackend {
    ScriptedStorageBackend::new()
}

fn allocator(backend: &ScriptedStorageBackend) -> StorageAccountAllocator<ScriptedStorageBackend> {
    StorageAccountAllocator::new(
        backend.clone(),
        ShardLayout::default(),
        ReadinessPolicy {
            interval: Duration::ZERO,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        },
    )
}

fn request() -> AllocationRequest {
    AllocationRequest::new("123", "rg-web", "eastus")
}

#[rstest]
fn allocate_creates_account_in_first_shard(backend: ScriptedStorageBackend) {
    let outcome = allocator(&backend)
        .allocate(&request())
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));

    assert_eq!(outcome.account_name().as_str(), "oostg123eus01");
    assert_eq!(outcome.decision.shard_index, 0);
    assert!(outcome.created);
    assert_eq!(outcome.poll_attempts, 1);
    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::CountVirtualMachines(ResourceGroupName::from("rg-web")),
            BackendCall::CheckNameAvailable(AccountName::from("oostg123eus01")),
            BackendCall::CreateStorageAccount(StorageAccountRequest {
                name: AccountName::from("oostg123eus01"),
                resource_group: ResourceGroupName::from("rg-web"),
                location: Location::from("eastus"),
                sku: StorageSku::StandardLrs,
            }),
            BackendCall::ProvisioningState(AccountName::from("oostg123eus01")),
        ]
    );
}

#[rstest]
#[case(39, "oostg123eus01")]
#[case(40, "oostg123eus02")]
#[case(799, "oostg123eus20")]
fn allocate_follows_vm_count(
    backend: ScriptedStorageBackend,
    #[case] vm_count: u64,
    #[case] expected: &str,
) {
    backend.set_vm_count(vm_count);
    let outcome = allocator(&backend)
        .allocate(&request())
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));
    assert_eq!(outcome.account_name().as_str(), expected);
}

#[rstest]
fn allocate_skips_creation_for_existing_account(backend: ScriptedStorageBackend) {
    backend.name_taken();
    let outcome = allocator(&backend)
        .allocate(&request())
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));
    assert!(!outcome.created);
    assert!(backend.create_requests().is_empty());
}

#[rstest]
fn allocate_uses_premium_sku_for_ds_sizes(backend: ScriptedStorageBackend) {
    allocator(&backend)
        .allocate(&request().vm_size("Standard_DS3_v2"))
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));
    let requests = backend.create_requests();
    assert_eq!(
        requests.first().map(|req| req.sku),
        Some(StorageSku::PremiumLrs)
    );
}

#[rstest]
fn allocate_waits_until_succeeded(backend: ScriptedStorageBackend) {
    backend.ready_after(3);
    let outcome = allocator(&backend)
        .allocate(&request())
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));
    assert_eq!(outcome.poll_attempts, 4);
    assert_eq!(backend.state_queries(), 4);
}

#[rstest]
fn allocate_times_out_after_max_attempts(backend: ScriptedStorageBackend) {
    backend.never_ready();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("allocation should time out");
    assert!(
        matches!(err, AllocationError::Timeout { attempts: 10, ref name } if name.as_str() == "oostg123eus01"),
        "unexpected error: {err:?}"
    );
    assert_eq!(backend.state_queries(), 10);
    assert!(matches!(
        backend.calls().last(),
        Some(BackendCall::ProvisioningState(_))
    ));
}

#[rstest]
fn allocate_treats_missing_account_as_not_ready(backend: ScriptedStorageBackend) {
    backend.never_visible();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("allocation should time out");
    assert!(matches!(err, AllocationError::Timeout { .. }));
}

#[rstest]
fn allocate_rejects_empty_poll_budget_before_backend_calls(backend: ScriptedStorageBackend) {
    let err = StorageAccountAllocator::new(
        backend.clone(),
        ShardLayout::default(),
        ReadinessPolicy {
            interval: Duration::ZERO,
            max_attempts: 0,
        },
    )
    .allocate(&request())
    .expect_err("zero attempts should be rejected");
    assert!(matches!(err, AllocationError::EmptyPollBudget), "unexpected error: {err:?}");
    assert!(backend.calls().is_empty());
}

#[rstest]
fn readiness_sleeps_between_queries_but_not_after_the_last(backend: ScriptedStorageBackend) {
    backend.never_ready();
    let interval = Duration::from_millis(200);
    let allocator = StorageAccountAllocator::new(
        backend.clone(),
        ShardLayout::default(),
        ReadinessPolicy {
            interval,
            max_attempts: 3,
        },
    );

    let started = Instant::now();
    let err = allocator
        .allocate(&request())
        .expect_err("allocation should time out");
    let elapsed = started.elapsed();

    assert!(matches!(err, AllocationError::Timeout { attempts: 3, .. }));
    assert_eq!(backend.state_queries(), 3);
    assert!(elapsed >= interval * 2, "slept too little: {elapsed:?}");
    assert!(elapsed < interval * 3, "slept after the final query: {elapsed:?}");
}

#[rstest]
fn allocate_fails_when_capacity_exhausted(backend: ScriptedStorageBackend) {
    backend.set_vm_count(800);
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("capacity should be exhausted");
    assert!(matches!(
        err,
        AllocationError::CapacityExhausted(CapacityExhausted {
            vm_count: 800,
            capacity: 800
        })
    ));
    assert_eq!(
        backend.calls(),
        vec![BackendCall::CountVirtualMachines(ResourceGroupName::from(
            "rg-web"
        ))]
    );
}

#[rstest]
fn allocate_surfaces_vm_count_failure(backend: ScriptedStorageBackend) {
    backend.fail_vm_count();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("vm count failure should propagate");
    assert!(matches!(err, AllocationError::VmCount { ref resource_group, .. } if resource_group == "rg-web"));
}

#[rstest]
fn allocate_surfaces_availability_failure(backend: ScriptedStorageBackend) {
    backend.fail_availability();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("availability failure should propagate");
    assert!(matches!(err, AllocationError::Availability { .. }));
    assert!(backend.create_requests().is_empty());
    assert_eq!(backend.state_queries(), 0);
}

#[rstest]
fn allocate_surfaces_create_failure_without_polling(backend: ScriptedStorageBackend) {
    backend.fail_create();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("create failure should propagate");
    assert!(matches!(err, AllocationError::Create { .. }));
    assert_eq!(backend.state_queries(), 0);
}

#[rstest]
fn allocate_surfaces_readiness_query_failure(backend: ScriptedStorageBackend) {
    backend.fail_state();
    let err = allocator(&backend)
        .allocate(&request())
        .expect_err("readiness failure should propagate");
    assert!(matches!(err, AllocationError::Readiness { .. }));
    assert_eq!(backend.state_queries(), 1);
}

#[rstest]
#[case(AllocationRequest::new(" ", "rg", "eastus"), "instance_id")]
#[case(AllocationRequest::new("1", "", "eastus"), "resource_group")]
#[case(AllocationRequest::new("1", "rg", " "), "location")]
fn allocate_rejects_blank_request_fields(
    backend: ScriptedStorageBackend,
    #[case] bad_request: AllocationRequest,
    #[case] field: &str,
) {
    let err = allocator(&backend)
        .allocate(&bad_request)
        .expect_err("blank field should be rejected");
    assert!(matches!(err, AllocationError::InvalidRequest(ref missing) if missing == field));
    assert!(backend.calls().is_empty());
}

#[rstest]
fn custom_prefix_changes_account_names(backend: ScriptedStorageBackend) {
    let outcome = allocator(&backend)
        .with_name_prefix("ab")
        .allocate(&request())
        .unwrap_or_else(|err| panic!("allocation should succeed: {err}"));
    assert_eq!(outcome.account_name().as_str(), "ab123eus01");
}

#[rstest]
fn resource_group_context_reports_count(backend: ScriptedStorageBackend) {
    backend.set_vm_count(12);
    let context = allocator(&backend)
        .resource_group_context(&request())
        .unwrap_or_else(|err| panic!("context should load: {err}"));
    assert_eq!(
        context,
        ResourceGroupContext {
            name: ResourceGroupName::from("rg-web"),
            location: Location::from("eastus"),
            vm_count: 12,
        }
    );
}

#[test]
fn plan_selects_without_backend() {
    let decision = plan(
        &ShardLayout::default(),
        DEFAULT_NAME_PREFIX,
        "123",
        &Location::from("eastus"),
        40,
    )
    .unwrap_or_else(|err| panic!("plan should succeed: {err}"));
    assert_eq!(decision.shard_index, 1);
    assert_eq!(decision.account_name.as_str(), "oostg123eus02");
}

#[test]
fn plan_reports_capacity_exhaustion() {
    let err = plan(
        &ShardLayout::default(),
        DEFAULT_NAME_PREFIX,
        "123",
        &Location::from("eastus"),
        800,
    )
    .expect_err("plan should fail");
    assert!(matches!(err, PlanError::CapacityExhausted(_)));
}

#[test]
fn default_readiness_policy_matches_azure_guidance() {
    let policy = ReadinessPolicy::default();
    assert_eq!(policy.interval, Duration::from_secs(30));
    assert_eq!(policy.max_attempts, 10);
}

#[test]
fn timeout_error_names_account() {
    let err: AllocationError<crate::test_support::ScriptedBackendError> =
        AllocationError::Timeout {
            name: AccountName::from("oostg123eus01"),
            attempts: 10,
        };
    assert_eq!(
        err.to_string(),
        "timeout: storage account oostg123eus01 not ready after 10 attempts"
    );
}
