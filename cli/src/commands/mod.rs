//! Command implementations

pub mod delete;
pub mod status;
pub mod version;

use clap::Args;

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
