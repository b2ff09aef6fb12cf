use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of infrastructure resource tracked by the deployment state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vm,
    Disk,
    Stemcell,
}

impl ResourceKind {
    /// Label used in step names and error messages ("VM", "disk", "stemcell").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Vm => "VM",
            ResourceKind::Disk => "disk",
            ResourceKind::Stemcell => "stemcell",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised by record-set operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("no {kind} record with id '{id}'")]
    NotFound { kind: ResourceKind, id: String },
}

/// Persisted VM record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VmRecord {
    pub id: String,
    pub cid: String,
}

/// Persisted persistent-disk record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskRecord {
    pub id: String,
    pub cid: String,
    /// Size in MiB as requested at creation.
    pub size: u64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Persisted stemcell record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StemcellRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub cid: String,
}

/// Attributes of a disk record before an id is assigned
#[derive(Debug, Clone, PartialEq)]
pub struct DiskAttributes {
    pub cid: String,
    pub size: u64,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Attributes of a stemcell record before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemcellAttributes {
    pub name: String,
    pub version: String,
    pub cid: String,
}

/// A record kind stored in [`DeploymentState`].
///
/// Ties each record type to its [`ResourceKind`] and to the record set that
/// holds it, so repositories can be written once for all three kinds.
pub trait ResourceRecord: Clone {
    const KIND: ResourceKind;

    /// Everything needed to build the record except its local id.
    type Attributes;

    fn from_attributes(id: String, attributes: Self::Attributes) -> Self;
    fn id(&self) -> &str;
    fn cid(&self) -> &str;
    fn records(state: &DeploymentState) -> &RecordSet<Self>;
    fn records_mut(state: &mut DeploymentState) -> &mut RecordSet<Self>;
}

impl ResourceRecord for VmRecord {
    const KIND: ResourceKind = ResourceKind::Vm;
    type Attributes = String;

    fn from_attributes(id: String, cid: String) -> Self {
        Self { id, cid }
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn cid(&self) -> &str {
        &self.cid
    }
    fn records(state: &DeploymentState) -> &RecordSet<Self> {
        &state.vms
    }
    fn records_mut(state: &mut DeploymentState) -> &mut RecordSet<Self> {
        &mut state.vms
    }
}

impl ResourceRecord for DiskRecord {
    const KIND: ResourceKind = ResourceKind::Disk;
    type Attributes = DiskAttributes;

    fn from_attributes(id: String, attributes: DiskAttributes) -> Self {
        Self {
            id,
            cid: attributes.cid,
            size: attributes.size,
            metadata: attributes.metadata,
        }
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn cid(&self) -> &str {
        &self.cid
    }
    fn records(state: &DeploymentState) -> &RecordSet<Self> {
        &state.disks
    }
    fn records_mut(state: &mut DeploymentState) -> &mut RecordSet<Self> {
        &mut state.disks
    }
}

impl ResourceRecord for StemcellRecord {
    const KIND: ResourceKind = ResourceKind::Stemcell;
    type Attributes = StemcellAttributes;

    fn from_attributes(id: String, attributes: StemcellAttributes) -> Self {
        Self {
            id,
            name: attributes.name,
            version: attributes.version,
            cid: attributes.cid,
        }
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn cid(&self) -> &str {
        &self.cid
    }
    fn records(state: &DeploymentState) -> &RecordSet<Self> {
        &state.stemcells
    }
    fn records_mut(state: &mut DeploymentState) -> &mut RecordSet<Self> {
        &mut state.stemcells
    }
}

/// All records of one kind plus the "current" pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSet<R> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_id: Option<String>,
    #[serde(default = "Vec::new")]
    pub records: Vec<R>,
}

impl<R> Default for RecordSet<R> {
    fn default() -> Self {
        Self {
            current_id: None,
            records: Vec::new(),
        }
    }
}

impl<R: ResourceRecord> RecordSet<R> {
    /// Append a record. Ids are assigned by the caller.
    pub fn insert(&mut self, record: R) {
        self.records.push(record);
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// The current record, if the pointer is set and still resolves.
    #[must_use]
    pub fn current(&self) -> Option<&R> {
        self.current_id.as_deref().and_then(|id| self.find(id))
    }

    /// Point "current" at an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if no record has the given id.
    pub fn set_current(&mut self, id: &str) -> Result<(), RecordError> {
        if self.find(id).is_none() {
            return Err(RecordError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            });
        }
        self.current_id = Some(id.to_string());
        Ok(())
    }

    /// Unset the current pointer. No-op when already unset.
    pub fn clear_current(&mut self) {
        self.current_id = None;
    }

    /// Remove a record by id, returning it. Removing an absent id is a no-op.
    ///
    /// The current pointer is left untouched; callers clear it explicitly.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let idx = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(idx))
    }

    #[must_use]
    pub fn all(&self) -> &[R] {
        &self.records
    }

    /// Unset the pointer if it names a record that no longer exists.
    /// Returns whether it was cleared.
    pub fn clear_dangling(&mut self) -> bool {
        let dangling = self.current_id.is_some() && self.current().is_none();
        if dangling {
            self.clear_current();
        }
        dangling
    }
}

/// Deployment state persisted between invocations.
///
/// Holds the VM, disk and stemcell record sets of the single deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeploymentState {
    #[serde(default)]
    pub vms: RecordSet<VmRecord>,
    #[serde(default)]
    pub disks: RecordSet<DiskRecord>,
    #[serde(default)]
    pub stemcells: RecordSet<StemcellRecord>,
    /// Last time any record or pointer changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeploymentState {
    /// Whether any of the three current pointers resolves to a record.
    #[must_use]
    pub fn has_current_resources(&self) -> bool {
        self.vms.current().is_some()
            || self.disks.current().is_some()
            || self.stemcells.current().is_some()
    }

    /// Stamp the state as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Record totals per kind, current or not.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordCounts {
    pub vms: usize,
    pub disks: usize,
    pub stemcells: usize,
}

/// Status output for `solo status --json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusOutput {
    pub vm: Option<VmRecord>,
    pub disk: Option<DiskRecord>,
    pub stemcell: Option<StemcellRecord>,
    pub records: RecordCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusOutput {
    /// Current records and totals of a state snapshot.
    #[must_use]
    pub fn from_state(state: &DeploymentState) -> Self {
        Self {
            vm: state.vms.current().cloned(),
            disk: state.disks.current().cloned(),
            stemcell: state.stemcells.current().cloned(),
            records: RecordCounts {
                vms: state.vms.all().len(),
                disks: state.disks.all().len(),
                stemcells: state.stemcells.all().len(),
            },
            updated_at: state.updated_at,
        }
    }

    /// Whether any current record exists.
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        self.vm.is_some() || self.disk.is_some() || self.stemcell.is_some()
    }
}
