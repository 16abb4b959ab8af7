//! Readiness polling for freshly selected storage accounts.

use std::thread::sleep;

use tracing::{debug, error, info};

use crate::backend::StorageAccountBackend;
use crate::types::{AccountName, ResourceGroupName};

use super::{AllocationError, StorageAccountAllocator};

impl<B> StorageAccountAllocator<B>
where
    B: StorageAccountBackend,
{
    /// Polls the provisioning state until it reads `Succeeded`, returning the
    /// number of queries made. There is no sleep after the final query.
    pub(super) fn wait_until_ready(
        &self,
        resource_group: &ResourceGroupName,
        name: &AccountName,
    ) -> Result<u32, AllocationError<B::Error>> {
        let max_attempts = self.readiness.max_attempts;
        for attempt in 1..=max_attempts {
            let state = self
                .backend
                .provisioning_state(resource_group, name)
                .map_err(|source| AllocationError::Readiness {
                    name: name.clone(),
                    source,
                })?;

            match state {
                Some(current) if current.is_ready() => {
                    info!(account = %name, attempt, "storage account provisioning succeeded");
                    return Ok(attempt);
                }
                Some(current) => {
                    debug!(account = %name, attempt, state = %current, "storage account not ready");
                }
                None => debug!(account = %name, attempt, "storage account not visible yet"),
            }

            if attempt < max_attempts {
                sleep(self.readiness.interval);
            }
        }

        error!(account = %name, attempts = max_attempts, "timeout waiting for storage account");
        Err(AllocationError::Timeout {
            name: name.clone(),
            attempts: max_attempts,
        })
    }
}
