//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::backend::{
    ComputeInventory, ProvisioningState, StorageAccountBackend, StorageAccountRequest,
};
use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::types::{AccountName, ResourceGroupName};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Error returned by [`ScriptedStorageBackend`] when a failure is scripted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted backend failure: {0}")]
pub struct ScriptedBackendError(pub String);

/// Call recorded by [`ScriptedStorageBackend`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackendCall {
    /// `count_virtual_machines` for a resource group.
    CountVirtualMachines(ResourceGroupName),
    /// `check_name_available` for an account.
    CheckNameAvailable(AccountName),
    /// `create_storage_account` with the full request.
    CreateStorageAccount(StorageAccountRequest),
    /// `provisioning_state` for an account.
    ProvisioningState(AccountName),
}

#[derive(Debug)]
struct BackendScript {
    vm_count: u64,
    name_available: bool,
    fail_vm_count: bool,
    fail_availability: bool,
    fail_create: bool,
    fail_state: bool,
    states: VecDeque<Option<ProvisioningState>>,
    fallback_state: Option<ProvisioningState>,
    calls: Vec<BackendCall>,
}

impl Default for BackendScript {
    fn default() -> Self {
        Self {
            vm_count: 0,
            name_available: true,
            fail_vm_count: false,
            fail_availability: false,
            fail_create: false,
            fail_state: false,
            states: VecDeque::new(),
            fallback_state: Some(ProvisioningState::Succeeded),
            calls: Vec::new(),
        }
    }
}

/// In-memory storage backend with scripted answers.
///
/// By default the resource group is empty, every name is available, creation
/// succeeds, and accounts report `Succeeded` immediately.
#[derive(Clone, Debug, Default)]
pub struct ScriptedStorageBackend {
    script: Rc<RefCell<BackendScript>>,
}

impl ScriptedStorageBackend {
    /// Creates a backend with default answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the VM count reported for every resource group.
    pub fn set_vm_count(&self, vm_count: u64) {
        self.script.borrow_mut().vm_count = vm_count;
    }

    /// Reports every candidate name as already claimed.
    pub fn name_taken(&self) {
        self.script.borrow_mut().name_available = false;
    }

    /// Makes the VM count query fail.
    pub fn fail_vm_count(&self) {
        self.script.borrow_mut().fail_vm_count = true;
    }

    /// Makes the availability check fail.
    pub fn fail_availability(&self) {
        self.script.borrow_mut().fail_availability = true;
    }

    /// Makes account creation fail.
    pub fn fail_create(&self) {
        self.script.borrow_mut().fail_create = true;
    }

    /// Makes the provisioning state query fail.
    pub fn fail_state(&self) {
        self.script.borrow_mut().fail_state = true;
    }

    /// Queues `pending` not-ready answers before `Succeeded`.
    pub fn ready_after(&self, pending: usize) {
        let mut script = self.script.borrow_mut();
        script.states.clear();
        script
            .states
            .extend((0..pending).map(|_| Some(ProvisioningState::Creating)));
        script.fallback_state = Some(ProvisioningState::Succeeded);
    }

    /// Reports the account as still creating forever.
    pub fn never_ready(&self) {
        let mut script = self.script.borrow_mut();
        script.states.clear();
        script.fallback_state = Some(ProvisioningState::Creating);
    }

    /// Reports the account as absent forever.
    pub fn never_visible(&self) {
        let mut script = self.script.borrow_mut();
        script.states.clear();
        script.fallback_state = None;
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.script.borrow().calls.clone()
    }

    /// Returns the creation requests recorded so far.
    #[must_use]
    pub fn create_requests(&self) -> Vec<StorageAccountRequest> {
        self.script
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::CreateStorageAccount(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns how many provisioning state queries were made.
    #[must_use]
    pub fn state_queries(&self) -> usize {
        self.script
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::ProvisioningState(_)))
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.script.borrow_mut().calls.push(call);
    }
}

impl ComputeInventory for ScriptedStorageBackend {
    type Error = ScriptedBackendError;

    fn count_virtual_machines(
        &self,
        resource_group: &ResourceGroupName,
    ) -> Result<u64, Self::Error> {
        self.record(BackendCall::CountVirtualMachines(resource_group.clone()));
        let script = self.script.borrow();
        if script.fail_vm_count {
            return Err(ScriptedBackendError(String::from("vm list failed")));
        }
        Ok(script.vm_count)
    }
}

impl StorageAccountBackend for ScriptedStorageBackend {
    fn check_name_available(&self, name: &AccountName) -> Result<bool, Self::Error> {
        self.record(BackendCall::CheckNameAvailable(name.clone()));
        let script = self.script.borrow();
        if script.fail_availability {
            return Err(ScriptedBackendError(String::from("check-name failed")));
        }
        Ok(script.name_available)
    }

    fn create_storage_account(&self, request: &StorageAccountRequest) -> Result<(), Self::Error> {
        self.record(BackendCall::CreateStorageAccount(request.clone()));
        if self.script.borrow().fail_create {
            return Err(ScriptedBackendError(String::from("create failed")));
        }
        Ok(())
    }

    fn provisioning_state(
        &self,
        _resource_group: &ResourceGroupName,
        name: &AccountName,
    ) -> Result<Option<ProvisioningState>, Self::Error> {
        self.record(BackendCall::ProvisioningState(name.clone()));
        let mut script = self.script.borrow_mut();
        if script.fail_state {
            return Err(ScriptedBackendError(String::from("show failed")));
        }
        let fallback = script.fallback_state.clone();
        Ok(script.states.pop_front().unwrap_or(fallback))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    #[must_use]
    pub fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

/// Produces a JSON payload matching `az vm list -o json` with `count` VMs.
#[must_use]
pub fn json_vm_list(count: usize) -> String {
    let items = (0..count)
        .map(|index| format!("{{\"name\":\"vm-{index}\",\"provisioningState\":\"Succeeded\"}}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{items}]")
}

/// Produces a JSON payload matching `az storage account check-name -o json`.
#[must_use]
pub fn json_check_name(available: bool) -> String {
    let reason = if available {
        String::from("null")
    } else {
        String::from("\"AlreadyExists\"")
    };
    format!("{{\"message\":null,\"nameAvailable\":{available},\"reason\":{reason}}}")
}

/// Produces a JSON payload matching `az storage account show -o json`.
#[must_use]
pub fn json_account(name: &str, state: &str) -> String {
    format!(
        "{{\"name\":\"{name}\",\"kind\":\"Storage\",\"provisioningState\":\"{state}\",\"sku\":{{\"name\":\"Standard_LRS\",\"tier\":\"Standard\"}}}}"
    )
}
