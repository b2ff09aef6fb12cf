//! Deployment aggregate and the teardown plan derived from it.
//!
//! Pure data in, data out. The application layer executes the plan; this
//! module only decides which phases exist and what each step is called.

use std::fmt;

use solo_common::{DeploymentState, DiskRecord, ResourceKind, StemcellRecord, VmRecord};

/// Job name used when no manifest is available to name the instance.
pub const UNKNOWN_JOB_NAME: &str = "unknown";

/// One running instance of a job, backed by a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub job_name: String,
    pub index: u32,
    pub vm: VmRecord,
}

impl Instance {
    #[must_use]
    pub fn new(job_name: impl Into<String>, index: u32, vm: VmRecord) -> Self {
        Self {
            job_name: job_name.into(),
            index,
            vm,
        }
    }

    /// `"<job>/<index>"`, e.g. `"unknown/0"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.job_name, self.index)
    }
}

/// The aggregate under teardown. Built per invocation, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    instances: Vec<Instance>,
    disks: Vec<DiskRecord>,
    stemcells: Vec<StemcellRecord>,
}

impl Deployment {
    /// Build the deployment from the current records of a state snapshot.
    ///
    /// Returns `None` when no current VM, disk, or stemcell is recorded.
    /// Non-current records are not part of the deployment.
    #[must_use]
    pub fn from_state(state: &DeploymentState) -> Option<Self> {
        if !state.has_current_resources() {
            return None;
        }
        let instances = state
            .vms
            .current()
            .map(|vm| Instance::new(UNKNOWN_JOB_NAME, 0, vm.clone()))
            .into_iter()
            .collect();
        Some(Self {
            instances,
            disks: state.disks.current().cloned().into_iter().collect(),
            stemcells: state.stemcells.current().cloned().into_iter().collect(),
        })
    }

    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[must_use]
    pub fn disks(&self) -> &[DiskRecord] {
        &self.disks
    }

    #[must_use]
    pub fn stemcells(&self) -> &[StemcellRecord] {
        &self.stemcells
    }

    /// Phases in execution order: every instance's VM, then disks, then stemcells.
    #[must_use]
    pub fn teardown_phases(&self) -> Vec<TeardownPhase> {
        let vms = self.instances.iter().cloned().map(TeardownPhase::Vm);
        let disks = self.disks.iter().cloned().map(TeardownPhase::Disk);
        let stemcells = self.stemcells.iter().cloned().map(TeardownPhase::Stemcell);
        vms.chain(disks).chain(stemcells).collect()
    }
}

/// One resource's teardown: its infrastructure delete plus record removal.
#[derive(Debug, Clone, PartialEq)]
pub enum TeardownPhase {
    Vm(Instance),
    Disk(DiskRecord),
    Stemcell(StemcellRecord),
}

impl TeardownPhase {
    #[must_use]
    pub fn resource(&self) -> ResourceKind {
        match self {
            TeardownPhase::Vm(_) => ResourceKind::Vm,
            TeardownPhase::Disk(_) => ResourceKind::Disk,
            TeardownPhase::Stemcell(_) => ResourceKind::Stemcell,
        }
    }

    #[must_use]
    pub fn cid(&self) -> &str {
        match self {
            TeardownPhase::Vm(instance) => &instance.vm.cid,
            TeardownPhase::Disk(disk) => &disk.cid,
            TeardownPhase::Stemcell(stemcell) => &stemcell.cid,
        }
    }

}

/// A single reported teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownAction {
    WaitForAgent { vm_cid: String },
    StopJobs { instance: String },
    UnmountDisk { disk_cid: String },
    DeleteVm { vm_cid: String },
    DeleteDisk { disk_cid: String },
    DeleteStemcell { stemcell_cid: String },
}

impl TeardownAction {
    /// The delete action for a resource kind.
    #[must_use]
    pub fn delete(resource: ResourceKind, cid: &str) -> Self {
        let cid = cid.to_string();
        match resource {
            ResourceKind::Vm => TeardownAction::DeleteVm { vm_cid: cid },
            ResourceKind::Disk => TeardownAction::DeleteDisk { disk_cid: cid },
            ResourceKind::Stemcell => TeardownAction::DeleteStemcell { stemcell_cid: cid },
        }
    }

    /// Name reported to the progress stage.
    #[must_use]
    pub fn step_name(&self) -> String {
        match self {
            TeardownAction::WaitForAgent { vm_cid } => {
                format!("Waiting for the agent on VM '{vm_cid}'")
            }
            TeardownAction::StopJobs { instance } => {
                format!("Stopping jobs on instance '{instance}'")
            }
            TeardownAction::UnmountDisk { disk_cid } => format!("Unmounting disk '{disk_cid}'"),
            TeardownAction::DeleteVm { vm_cid } => format!("Deleting VM '{vm_cid}'"),
            TeardownAction::DeleteDisk { disk_cid } => format!("Deleting disk '{disk_cid}'"),
            TeardownAction::DeleteStemcell { stemcell_cid } => {
                format!("Deleting stemcell '{stemcell_cid}'")
            }
        }
    }
}

impl fmt::Display for TeardownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.step_name())
    }
}
