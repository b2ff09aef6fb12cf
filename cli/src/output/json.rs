//! JSON output helpers.
//!
//! `JsonRenderer` prints command results as pretty JSON on stdout;
//! `format_error` builds the error object every `--json` path prints when a
//! command fails.

use anyhow::{Context, Result};
use serde_json::json;
use solo_common::StatusOutput;

use crate::application::services::deployment::DeleteOutcome;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        print_pretty(&json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_status(&self, status: &StatusOutput) -> Result<()> {
        let value = serde_json::to_value(status).context("serializing status")?;
        print_pretty(&value)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_delete(&self, outcome: &DeleteOutcome) -> Result<()> {
        print_pretty(&delete_outcome_json(outcome))
    }
}

/// JSON shape of a delete outcome.
#[must_use]
pub fn delete_outcome_json(outcome: &DeleteOutcome) -> serde_json::Value {
    match outcome {
        DeleteOutcome::NothingToDelete => json!({ "deleted": [] }),
        DeleteOutcome::Deleted(resources) => {
            let deleted: Vec<_> = resources
                .iter()
                .map(|r| {
                    json!({
                        "kind": r.kind,
                        "cid": r.cid,
                        "already_gone": r.already_gone,
                    })
                })
                .collect();
            json!({ "deleted": deleted })
        }
    }
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}
