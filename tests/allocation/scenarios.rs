//! BDD scenarios for storage account allocation.

use rstest_bdd_macros::scenario;

use super::test_helpers::{AllocationContext, allocation_context};

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Create the first shard account in an empty resource group"
)]
fn scenario_create_first_shard(allocation_context: AllocationContext) {
    let _ = allocation_context;
}

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Move to the next shard once the first account is full"
)]
fn scenario_next_shard(allocation_context: AllocationContext) {
    let _ = allocation_context;
}

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Reuse an account that already exists"
)]
fn scenario_reuse_existing(allocation_context: AllocationContext) {
    let _ = allocation_context;
}

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Wait for a slow account to finish provisioning"
)]
fn scenario_wait_for_slow_account(allocation_context: AllocationContext) {
    let _ = allocation_context;
}

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Time out when the account never becomes ready"
)]
fn scenario_timeout(allocation_context: AllocationContext) {
    let _ = allocation_context;
}

#[scenario(
    path = "tests/features/allocation.feature",
    name = "Refuse allocation when every shard is full"
)]
fn scenario_capacity_exhausted(allocation_context: AllocationContext) {
    let _ = allocation_context;
}
