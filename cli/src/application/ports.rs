//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `solo_common` — never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;
use solo_common::DeploymentState;

use crate::domain::{CloudError, SoloConfig};

// ── Infrastructure Port ───────────────────────────────────────────────────────

/// Infrastructure (CPI) operations needed to tear a deployment down.
///
/// Every operation fails with a [`CloudError`] whose `kind` tells a
/// resource-specific "not found" apart from every other cause.
#[allow(async_fn_in_trait)]
pub trait Cloud {
    /// Whether the VM still exists on the infrastructure.
    async fn has_vm(&self, vm_cid: &str) -> Result<bool, CloudError>;
    /// Delete a VM.
    async fn delete_vm(&self, vm_cid: &str) -> Result<(), CloudError>;
    /// Delete a persistent disk.
    async fn delete_disk(&self, disk_cid: &str) -> Result<(), CloudError>;
    /// Delete a stemcell image.
    async fn delete_stemcell(&self, stemcell_cid: &str) -> Result<(), CloudError>;
}

// ── Agent Port ────────────────────────────────────────────────────────────────

/// Operations on the agent running inside the deployed VM.
///
/// Implementations do not retry. One failed `ping` means the agent is
/// unresponsive.
#[allow(async_fn_in_trait)]
pub trait AgentClient {
    /// Liveness check. Returns the agent-reported state.
    async fn ping(&self) -> Result<String>;
    /// Stop all jobs on the instance.
    async fn stop(&self) -> Result<()>;
    /// CIDs of the disks currently mounted, in agent-reported order.
    async fn list_disk(&self) -> Result<Vec<String>>;
    /// Unmount one disk.
    async fn unmount_disk(&self, disk_cid: &str) -> Result<()>;
}

// ── Progress Stage Port ───────────────────────────────────────────────────────

/// A named unit of reported progress.
pub trait Step {
    fn start(&self);
    fn finish(&self);
    fn fail(&self, err: &anyhow::Error);
    fn skip(&self, reason: &str);
}

/// Sink for progress steps. Sync trait — reporting never affects control flow.
pub trait Stage {
    type Step: Step;

    /// Create a step. It is not shown until `start` is called.
    fn new_step(&self, name: &str) -> Self::Step;
}

// ── State Port ────────────────────────────────────────────────────────────────

/// Abstracts deployment state persistence (load/save).
#[allow(async_fn_in_trait)]
pub trait DeploymentStateStore {
    /// Load the persisted state, returning `None` if nothing was ever saved.
    async fn load_async(&self) -> Result<Option<DeploymentState>>;
    /// Persist the given state.
    async fn save_async(&self, state: &DeploymentState) -> Result<()>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration file access.
pub trait ConfigStore {
    /// Load the configuration, returning defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<SoloConfig>;
    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program with stdin piped from `stdin` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout the child process must be killed.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}
