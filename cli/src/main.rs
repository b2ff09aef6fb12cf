//! solo CLI - tear down a single-instance deployment

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use solo_cli::cli::Cli;
use solo_cli::output::json::format_error;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SOLO_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match format_error(&message, "COMMAND_FAILED") {
            Ok(obj) if json => println!("{obj}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        filter = filter.add_directive(LevelFilter::DEBUG.into());
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
