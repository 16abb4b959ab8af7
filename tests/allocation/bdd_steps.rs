//! BDD step definitions for allocation behaviour.

use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{AllocationContext, AllocationResult, build_allocator, build_request};
use crate::test_constants::{FIRST_ACCOUNT, INSTANCE_ID};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a resource group \"{group}\" in \"{location}\"")]
fn resource_group(
    mut allocation_context: AllocationContext,
    group: String,
    location: String,
) -> AllocationContext {
    allocation_context.resource_group = group.trim().to_owned();
    allocation_context.location = location.trim().to_owned();
    allocation_context
}

#[given("the resource group holds {count:u64} virtual machines")]
fn resource_group_holds(allocation_context: AllocationContext, count: u64) -> AllocationContext {
    allocation_context.backend.set_vm_count(count);
    allocation_context
}

#[given("the storage account name is already taken")]
fn name_already_taken(allocation_context: AllocationContext) -> AllocationContext {
    allocation_context.backend.name_taken();
    allocation_context
}

#[given("the storage account becomes ready after {pending:usize} pending polls")]
fn ready_after(allocation_context: AllocationContext, pending: usize) -> AllocationContext {
    allocation_context.backend.ready_after(pending);
    allocation_context
}

#[given("the storage account never finishes provisioning")]
fn never_ready(allocation_context: AllocationContext) -> AllocationContext {
    allocation_context.backend.never_ready();
    allocation_context
}

#[when("I allocate storage for the default instance")]
fn allocate_default(allocation_context: AllocationContext) -> AllocationContext {
    run_allocation(allocation_context, INSTANCE_ID)
}

#[when("I allocate a storage account for instance \"{instance}\"")]
fn allocate(allocation_context: AllocationContext, instance: String) -> AllocationContext {
    run_allocation(allocation_context, instance.trim())
}

fn run_allocation(mut allocation_context: AllocationContext, instance_id: &str) -> AllocationContext {
    let request = build_request(&allocation_context, instance_id);
    let allocator = build_allocator(&allocation_context.backend);
    allocation_context.outcome = Some(match allocator.allocate(&request) {
        Ok(outcome) => AllocationResult::Success(outcome),
        Err(err) => AllocationResult::Failure(err.to_string()),
    });
    allocation_context
}

#[then("the first shard account is allocated")]
fn first_shard_allocated(allocation_context: &AllocationContext) -> Result<(), StepError> {
    expect_account(allocation_context, FIRST_ACCOUNT)
}

#[then("the allocated account is \"{name}\"")]
fn allocated_account(allocation_context: &AllocationContext, name: String) -> Result<(), StepError> {
    expect_account(allocation_context, name.trim())
}

fn expect_account(allocation_context: &AllocationContext, name: &str) -> Result<(), StepError> {
    let Some(outcome) = allocation_context.outcome.as_ref() else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };
    let AllocationResult::Success(allocated) = outcome else {
        return Err(StepError::Assertion(format!(
            "expected success, got: {outcome:?}"
        )));
    };
    if allocated.account_name().as_str() == name {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected account {name}, got {}",
            allocated.account_name()
        )))
    }
}

#[then("the account was created with SKU \"{sku}\"")]
fn created_with_sku(allocation_context: &AllocationContext, sku: String) -> Result<(), StepError> {
    let requests = allocation_context.backend.create_requests();
    let [request] = requests.as_slice() else {
        return Err(StepError::Assertion(format!(
            "expected exactly one create request, got {requests:?}"
        )));
    };
    if request.sku.name() == sku.trim() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected SKU {sku}, got {}",
            request.sku
        )))
    }
}

#[then("no storage account is created")]
fn nothing_created(allocation_context: &AllocationContext) -> Result<(), StepError> {
    let requests = allocation_context.backend.create_requests();
    if requests.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no create requests, got {requests:?}"
        )))
    }
}

#[then("the readiness poll ran {count:usize} times")]
fn readiness_polls(allocation_context: &AllocationContext, count: usize) -> Result<(), StepError> {
    let queries = allocation_context.backend.state_queries();
    if queries == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} provisioning state queries, got {queries}"
        )))
    }
}

#[then("the allocation fails with \"{message}\"")]
fn allocation_fails(allocation_context: &AllocationContext, message: String) -> Result<(), StepError> {
    let Some(outcome) = allocation_context.outcome.as_ref() else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };
    let AllocationResult::Failure(error) = outcome else {
        return Err(StepError::Assertion(String::from(
            "expected allocation to fail, got success",
        )));
    };
    if error.contains(message.trim()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected error containing {message:?}, got: {error}"
        )))
    }
}
