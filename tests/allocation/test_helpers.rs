//! Shared fixtures and helpers for allocation BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use stowage::test_support::ScriptedStorageBackend;
use stowage::{
    AllocationOutcome, AllocationRequest, ReadinessPolicy, ShardLayout, StorageAccountAllocator,
};

use crate::test_constants::{LOCATION, RESOURCE_GROUP};

/// Result of the `When` step.
#[derive(Clone, Debug)]
pub enum AllocationResult {
    Success(AllocationOutcome),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct AllocationContext {
    pub backend: ScriptedStorageBackend,
    pub resource_group: String,
    pub location: String,
    pub outcome: Option<AllocationResult>,
}

#[fixture]
pub fn allocation_context() -> AllocationContext {
    AllocationContext {
        backend: ScriptedStorageBackend::new(),
        resource_group: String::from(RESOURCE_GROUP),
        location: String::from(LOCATION),
        outcome: None,
    }
}

/// Allocator over the scripted backend with the default layout and no
/// sleeping between readiness polls.
pub fn build_allocator(
    backend: &ScriptedStorageBackend,
) -> StorageAccountAllocator<ScriptedStorageBackend> {
    StorageAccountAllocator::new(
        backend.clone(),
        ShardLayout::default(),
        ReadinessPolicy {
            interval: Duration::ZERO,
            ..ReadinessPolicy::default()
        },
    )
}

pub fn build_request(context: &AllocationContext, instance_id: &str) -> AllocationRequest {
    AllocationRequest::new(
        instance_id,
        context.resource_group.as_str(),
        context.location.as_str(),
    )
}
