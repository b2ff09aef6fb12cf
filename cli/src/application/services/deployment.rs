//! Application service — deployment teardown use-case.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::future::Future;

use anyhow::{Context, Result};
use solo_common::{DiskRecord, ResourceKind, StemcellRecord};
use tracing::{debug, info, warn};

use crate::application::ports::{AgentClient, Cloud, DeploymentStateStore, Stage, Step};
use crate::application::repository::DeploymentRepo;
use crate::domain::{CloudError, Deployment, Instance, TeardownAction, TeardownPhase};

/// A resource removed by [`delete_deployment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedResource {
    pub kind: ResourceKind,
    pub cid: String,
    /// The infrastructure reported the resource as already gone.
    pub already_gone: bool,
}

impl DeletedResource {
    fn new(kind: ResourceKind, cid: &str, already_gone: bool) -> Self {
        Self {
            kind,
            cid: cid.to_string(),
            already_gone,
        }
    }
}

/// Outcome of the `delete_deployment` use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No current VM, disk, or stemcell was recorded.
    NothingToDelete,
    /// Every phase completed, in teardown order.
    Deleted(Vec<DeletedResource>),
}

/// What the agent check before VM deletion found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Responsive,
    Unresponsive,
    VmMissing,
}

/// Build the deployment from the repository's current records.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded.
pub async fn find_current_deployment(
    repo: &DeploymentRepo<impl DeploymentStateStore>,
) -> Result<Option<Deployment>> {
    let state = repo.snapshot().await?;
    Ok(Deployment::from_state(&state))
}

/// Tear down the current deployment: VM, then disk, then stemcell.
///
/// Each phase removes its record only after the infrastructure delete
/// succeeded or reported the resource as already gone, so a failed run can
/// be repeated and resumes where it stopped. A second run on an emptied
/// state makes no calls and reports no steps.
///
/// Current pointers that no longer resolve to a record are cleared first.
///
/// # Errors
///
/// Returns the first fatal error, with the failing step's name as context.
/// Phases after the failing one are not attempted.
pub async fn delete_deployment(
    cloud: &impl Cloud,
    agent: &impl AgentClient,
    repo: &DeploymentRepo<impl DeploymentStateStore>,
    stage: &impl Stage,
) -> Result<DeleteOutcome> {
    repo.clear_dangling_pointers().await?;
    let Some(deployment) = find_current_deployment(repo).await? else {
        debug!("no current deployment records");
        return Ok(DeleteOutcome::NothingToDelete);
    };

    let mut deleted = Vec::new();
    for phase in deployment.teardown_phases() {
        debug!(resource = %phase.resource(), cid = phase.cid(), "starting teardown phase");
        let resource = match phase {
            TeardownPhase::Vm(instance) => {
                delete_vm_phase(cloud, agent, repo, stage, &instance).await?
            }
            TeardownPhase::Disk(disk) => delete_disk_phase(cloud, repo, stage, &disk).await?,
            TeardownPhase::Stemcell(stemcell) => {
                delete_stemcell_phase(cloud, repo, stage, &stemcell).await?
            }
        };
        deleted.push(resource);
    }
    info!(resources = deleted.len(), "deployment deleted");
    Ok(DeleteOutcome::Deleted(deleted))
}

/// Stop the instance if its agent answers, then delete the VM and its record.
///
/// # Errors
///
/// Returns an error if the existence check, any agent call after a
/// successful ping, or the VM delete fails. The record is kept on error.
pub async fn delete_vm_phase(
    cloud: &impl Cloud,
    agent: &impl AgentClient,
    repo: &DeploymentRepo<impl DeploymentStateStore>,
    stage: &impl Stage,
    instance: &Instance,
) -> Result<DeletedResource> {
    let vm_cid = instance.vm.cid.as_str();
    match wait_for_agent(cloud, agent, stage, vm_cid).await? {
        AgentState::Responsive => shut_down_instance(agent, stage, instance).await?,
        AgentState::Unresponsive => {
            warn!(vm_cid, "agent is unresponsive, deleting VM without stopping jobs");
        }
        AgentState::VmMissing => {
            info!(vm_cid, "VM not found on the infrastructure, skipping agent shutdown");
        }
    }

    let already_gone =
        perform_delete(stage, ResourceKind::Vm, vm_cid, cloud.delete_vm(vm_cid)).await?;
    repo.vms().remove_current(&instance.vm).await?;
    Ok(DeletedResource::new(ResourceKind::Vm, vm_cid, already_gone))
}

/// Delete the disk and its record.
///
/// # Errors
///
/// Returns an error if the delete fails with anything but disk-not-found.
pub async fn delete_disk_phase(
    cloud: &impl Cloud,
    repo: &DeploymentRepo<impl DeploymentStateStore>,
    stage: &impl Stage,
    disk: &DiskRecord,
) -> Result<DeletedResource> {
    let already_gone =
        perform_delete(stage, ResourceKind::Disk, &disk.cid, cloud.delete_disk(&disk.cid)).await?;
    repo.disks().remove_current(disk).await?;
    Ok(DeletedResource::new(ResourceKind::Disk, &disk.cid, already_gone))
}

/// Delete the stemcell and its record.
///
/// # Errors
///
/// Returns an error if the delete fails with anything but stemcell-not-found.
pub async fn delete_stemcell_phase(
    cloud: &impl Cloud,
    repo: &DeploymentRepo<impl DeploymentStateStore>,
    stage: &impl Stage,
    stemcell: &StemcellRecord,
) -> Result<DeletedResource> {
    let already_gone = perform_delete(
        stage,
        ResourceKind::Stemcell,
        &stemcell.cid,
        cloud.delete_stemcell(&stemcell.cid),
    )
    .await?;
    repo.stemcells().remove_current(stemcell).await?;
    Ok(DeletedResource::new(
        ResourceKind::Stemcell,
        &stemcell.cid,
        already_gone,
    ))
}

// ── Steps ─────────────────────────────────────────────────────────────────────

/// Check the VM exists, then ping its agent once.
///
/// A failed ping is not an error: the step is marked failed and the VM is
/// deleted without stopping jobs.
async fn wait_for_agent(
    cloud: &impl Cloud,
    agent: &impl AgentClient,
    stage: &impl Stage,
    vm_cid: &str,
) -> Result<AgentState> {
    let name = TeardownAction::WaitForAgent {
        vm_cid: vm_cid.to_string(),
    }
    .step_name();
    let step = stage.new_step(&name);
    step.start();

    let exists = match cloud.has_vm(vm_cid).await {
        Ok(exists) => exists,
        Err(e) => {
            let err = anyhow::Error::new(e).context(name);
            step.fail(&err);
            return Err(err);
        }
    };
    if !exists {
        step.skip("VM not found");
        return Ok(AgentState::VmMissing);
    }

    match agent.ping().await {
        Ok(agent_state) => {
            debug!(vm_cid, %agent_state, "agent responded to ping");
            step.finish();
            Ok(AgentState::Responsive)
        }
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(vm_cid, %reason, "agent did not respond to ping");
            step.fail(&e);
            Ok(AgentState::Unresponsive)
        }
    }
}

/// Stop jobs, then unmount every disk the agent reports as mounted.
async fn shut_down_instance(
    agent: &impl AgentClient,
    stage: &impl Stage,
    instance: &Instance,
) -> Result<()> {
    let stop = TeardownAction::StopJobs {
        instance: instance.display_name(),
    };
    perform(stage, &stop, agent.stop()).await?;

    let mounted = agent
        .list_disk()
        .await
        .with_context(|| format!("listing mounted disks on VM '{}'", instance.vm.cid))?;
    debug!(count = mounted.len(), "agent reported mounted disks");
    for disk_cid in mounted {
        let unmount = TeardownAction::UnmountDisk {
            disk_cid: disk_cid.clone(),
        };
        perform(stage, &unmount, agent.unmount_disk(&disk_cid)).await?;
    }
    Ok(())
}

/// Run one infrastructure delete as a step. Returns `true` when the
/// resource was already gone, in which case the step is skipped.
async fn perform_delete(
    stage: &impl Stage,
    resource: ResourceKind,
    cid: &str,
    call: impl Future<Output = Result<(), CloudError>>,
) -> Result<bool> {
    let name = TeardownAction::delete(resource, cid).step_name();
    let step = stage.new_step(&name);
    step.start();
    match call.await {
        Ok(()) => {
            step.finish();
            Ok(false)
        }
        Err(e) if e.is_not_found(resource) => {
            info!(%resource, cid, "already deleted on the infrastructure");
            step.skip(&format!("{} not found", resource.label()));
            Ok(true)
        }
        Err(e) => {
            warn!(%resource, cid, ok_to_retry = e.ok_to_retry, "infrastructure delete failed");
            let err = anyhow::Error::new(e).context(name);
            step.fail(&err);
            Err(err)
        }
    }
}

/// Report `call` as one step named after `action`.
async fn perform<T>(
    stage: &impl Stage,
    action: &TeardownAction,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    let name = action.step_name();
    let step = stage.new_step(&name);
    step.start();
    match call.await.context(name) {
        Ok(value) => {
            step.finish();
            Ok(value)
        }
        Err(err) => {
            step.fail(&err);
            Err(err)
        }
    }
}
