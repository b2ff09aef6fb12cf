//! Resource repository over the `DeploymentStateStore` port.
//!
//! `DeploymentRepo` is the only writer of deployment state. It exposes typed
//! VM, disk and stemcell views; every mutation through a view is a
//! load → modify → save cycle serialized behind one async mutex, and a
//! mutation that changes nothing is not written back.

use std::marker::PhantomData;

use anyhow::{Context, Result};
use solo_common::{DeploymentState, DiskRecord, ResourceRecord, StemcellRecord, VmRecord};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::ports::DeploymentStateStore;

/// Persisted-state manager for one deployment.
pub struct DeploymentRepo<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: DeploymentStateStore> DeploymentRepo<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current persisted state, or an empty state if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn snapshot(&self) -> Result<DeploymentState> {
        Ok(self
            .store
            .load_async()
            .await
            .context("loading deployment state")?
            .unwrap_or_default())
    }

    /// VM records.
    pub fn vms(&self) -> RecordRepo<'_, S, VmRecord> {
        RecordRepo::new(self)
    }

    /// Persistent disk records.
    pub fn disks(&self) -> RecordRepo<'_, S, DiskRecord> {
        RecordRepo::new(self)
    }

    /// Stemcell records.
    pub fn stemcells(&self) -> RecordRepo<'_, S, StemcellRecord> {
        RecordRepo::new(self)
    }

    /// Clear every current pointer that no longer resolves to a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved.
    pub async fn clear_dangling_pointers(&self) -> Result<()> {
        let cleared = self
            .mutate(|state| {
                Ok([
                    state.vms.clear_dangling(),
                    state.disks.clear_dangling(),
                    state.stemcells.clear_dangling(),
                ])
            })
            .await?;
        if cleared.iter().any(|c| *c) {
            debug!(?cleared, "cleared dangling current pointers");
        }
        Ok(())
    }

    async fn mutate<T>(&self, f: impl FnOnce(&mut DeploymentState) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.snapshot().await?;
        let before = state.clone();
        let out = f(&mut state)?;
        if state != before {
            state.touch();
            self.store
                .save_async(&state)
                .await
                .context("saving deployment state")?;
        }
        Ok(out)
    }
}

/// Typed view over one record kind of a [`DeploymentRepo`].
pub struct RecordRepo<'a, S, R> {
    repo: &'a DeploymentRepo<S>,
    _record: PhantomData<R>,
}

impl<'a, S, R> RecordRepo<'a, S, R> {
    fn new(repo: &'a DeploymentRepo<S>) -> Self {
        Self {
            repo,
            _record: PhantomData,
        }
    }
}

impl<S: DeploymentStateStore, R: ResourceRecord> RecordRepo<'_, S, R> {
    /// Store a new record under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved.
    pub async fn save(&self, attributes: R::Attributes) -> Result<R> {
        let record = R::from_attributes(uuid::Uuid::new_v4().to_string(), attributes);
        let saved = record.clone();
        self.repo
            .mutate(move |state| {
                R::records_mut(state).insert(record);
                Ok(())
            })
            .await?;
        let kind = R::KIND;
        debug!(%kind, id = saved.id(), cid = saved.cid(), "saved record");
        Ok(saved)
    }

    /// The current record, or `None` if no current pointer is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub async fn find_current(&self) -> Result<Option<R>> {
        let state = self.repo.snapshot().await?;
        Ok(R::records(&state).current().cloned())
    }

    /// Point "current" at the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if no record has that id, or on store failure.
    pub async fn update_current(&self, id: &str) -> Result<()> {
        self.repo
            .mutate(|state| R::records_mut(state).set_current(id).map_err(Into::into))
            .await
    }

    /// Unset the current pointer. No-op when already unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved.
    pub async fn clear_current(&self) -> Result<()> {
        self.repo
            .mutate(|state| {
                R::records_mut(state).clear_current();
                Ok(())
            })
            .await
    }

    /// Remove the record and, if it is current, clear the pointer, in one
    /// write.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved.
    pub async fn remove_current(&self, record: &R) -> Result<()> {
        let id = record.id().to_string();
        self.repo
            .mutate(move |state| {
                let records = R::records_mut(state);
                records.remove(&id);
                if records.current_id.as_deref() == Some(id.as_str()) {
                    records.clear_current();
                }
                Ok(())
            })
            .await?;
        let kind = R::KIND;
        debug!(%kind, id = record.id(), "removed current record");
        Ok(())
    }

    /// All records of this kind in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub async fn all(&self) -> Result<Vec<R>> {
        let state = self.repo.snapshot().await?;
        Ok(R::records(&state).all().to_vec())
    }

    /// Remove a record. Removing an absent record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved.
    pub async fn delete(&self, record: &R) -> Result<()> {
        let id = record.id().to_string();
        self.repo
            .mutate(move |state| {
                R::records_mut(state).remove(&id);
                Ok(())
            })
            .await?;
        let kind = R::KIND;
        debug!(%kind, id = record.id(), "deleted record");
        Ok(())
    }
}
