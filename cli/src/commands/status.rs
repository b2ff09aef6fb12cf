//! `solo status` — show the recorded deployment.

use anyhow::Result;
use solo_common::StatusOutput;

use crate::app::AppContext;

/// Run `solo status`.
///
/// # Errors
///
/// Returns an error if the state file cannot be read.
pub async fn run(app: &AppContext) -> Result<()> {
    let state = app.repo.snapshot().await?;
    let status = StatusOutput::from_state(&state);
    app.renderer().render_status(&status)?;
    if !app.is_json() {
        app.output
            .kv("State:   ", &app.state_path.display().to_string());
    }
    Ok(())
}
