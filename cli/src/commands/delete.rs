//! `solo delete [--yes]` — tear the deployment down.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::deployment::{
    DeleteOutcome, delete_deployment, find_current_deployment,
};
use crate::domain::Deployment;
use crate::output::{OutputContext, TerminalStage};

/// Run `solo delete`.
///
/// Nothing is prompted for, and no CPI is required, when the state holds no
/// current records.
///
/// # Errors
///
/// Returns an error if the CPI is not configured or any teardown step fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let Some(deployment) = find_current_deployment(&app.repo).await? else {
        return app.renderer().render_delete(&DeleteOutcome::NothingToDelete);
    };

    describe(&app.output, &deployment);
    if !app.confirm("Continue?")? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let cloud = app.cloud()?;
    let agent = app.agent()?;
    let stage = TerminalStage::new(&app.output);
    let outcome = delete_deployment(&cloud, &agent, &app.repo, &stage).await?;
    app.renderer().render_delete(&outcome)
}

fn describe(ctx: &OutputContext, deployment: &Deployment) {
    if ctx.quiet {
        return;
    }
    println!();
    println!("This will permanently delete:");
    for instance in deployment.instances() {
        println!(
            "  • VM {} (instance {})",
            instance.vm.cid,
            instance.display_name()
        );
    }
    for disk in deployment.disks() {
        println!("  • Disk {} ({} MB)", disk.cid, disk.size);
    }
    for stemcell in deployment.stemcells() {
        println!(
            "  • Stemcell {} ({}/{})",
            stemcell.cid, stemcell.name, stemcell.version
        );
    }
    println!();
}
