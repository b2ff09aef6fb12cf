//! Human-readable terminal renderer.

use solo_common::StatusOutput;

use crate::application::services::deployment::DeleteOutcome;
use crate::output::OutputContext;

/// Renders command results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("solo {version}");
        }
    }

    /// Render the current deployment records.
    pub fn render_status(&self, status: &StatusOutput) {
        if !status.is_deployed() {
            self.ctx.info("No deployment recorded.");
            return;
        }
        self.ctx.header("Deployment:");
        self.ctx.kv("VM:      ", status.vm.as_ref().map_or("-", |vm| vm.cid.as_str()));
        let disk = status
            .disk
            .as_ref()
            .map_or_else(|| "-".to_string(), |d| format!("{} ({} MB)", d.cid, d.size));
        self.ctx.kv("Disk:    ", &disk);
        let stemcell = status.stemcell.as_ref().map_or_else(
            || "-".to_string(),
            |s| format!("{} ({}/{})", s.cid, s.name, s.version),
        );
        self.ctx.kv("Stemcell:", &stemcell);
        let records = status.records;
        self.ctx.kv(
            "Records: ",
            &format!(
                "{} VM, {} disk, {} stemcell",
                records.vms, records.disks, records.stemcells
            ),
        );
        if let Some(updated_at) = status.updated_at {
            self.ctx.kv("Updated: ", &updated_at.to_rfc3339());
        }
    }

    /// Render the result of a delete run.
    pub fn render_delete(&self, outcome: &DeleteOutcome) {
        match outcome {
            DeleteOutcome::NothingToDelete => self.ctx.info("Nothing to delete."),
            DeleteOutcome::Deleted(resources) => {
                let drifted = resources.iter().filter(|r| r.already_gone).count();
                if drifted > 0 {
                    self.ctx.warn(&format!(
                        "{drifted} resource(s) were already gone from the infrastructure"
                    ));
                }
                self.ctx.success("Deployment deleted.");
            }
        }
    }
}
