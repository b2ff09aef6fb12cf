//! Application context — unified state passed to every command handler.
//!
//! `AppContext` merges the config file with command-line overrides once and
//! owns the deployment repository, so command handlers take a single
//! `&AppContext` instead of loose parameters.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::application::repository::DeploymentRepo;
use crate::domain::{ConfigError, SoloConfig};
use crate::infra::agent::ConfiguredAgent;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::cpi::CpiCloud;
use crate::infra::state::{StateManager, default_state_path};
use crate::output::{OutputContext, Renderer};

/// Environment variable that skips confirmation prompts.
pub const YES_ENV: &str = "SOLO_YES";

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by the `SOLO_YES` env var).
    pub yes: bool,
}

/// Command-line values that take precedence over the config file.
#[derive(Default)]
pub struct ConfigOverrides {
    pub state_path: Option<PathBuf>,
    pub cpi_path: Option<PathBuf>,
    pub mbus_url: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
    /// Config-file overrides.
    pub overrides: ConfigOverrides,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Effective configuration after overrides.
    pub config: SoloConfig,
    /// Location of the deployment state file.
    pub state_path: PathBuf,
    /// Deployment records.
    pub repo: DeploymentRepo<StateManager>,
    /// When `true`, confirmation prompts are answered "yes".
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, the effective
    /// configuration is invalid, or no state path can be determined.
    pub fn new(flags: AppFlags, config_store: &impl ConfigStore) -> Result<Self> {
        let AppFlags {
            output,
            behaviour,
            overrides,
        } = flags;

        let mut config = config_store.load()?;
        if let Ok(path) = config_store.path() {
            debug!(config = %path.display(), "loaded configuration");
        }
        apply_overrides(&mut config, overrides);
        config.validate()?;

        let state_path = match &config.state_path {
            Some(path) => path.clone(),
            None => default_state_path()?,
        };
        debug!(state_path = %state_path.display(), "using deployment state file");

        let mode = if output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            // JSON mode keeps stdout for the JSON document alone.
            output: OutputContext::new(output.no_color, output.quiet || output.json),
            mode,
            config,
            repo: DeploymentRepo::new(StateManager::with_path(state_path.clone())),
            state_path,
            non_interactive: behaviour.yes || std::env::var(YES_ENV).is_ok(),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.output, self.is_json())
    }

    /// CPI-backed infrastructure client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no CPI executable is configured.
    pub fn cloud(&self) -> Result<CpiCloud<TokioCommandRunner>> {
        let Some(path) = self.config.cpi.path.clone() else {
            return Err(ConfigError::Missing {
                key: "cpi.path".to_string(),
                hint: "Pass --cpi or set cpi.path in the config file.".to_string(),
            }
            .into());
        };
        let runner = TokioCommandRunner::new(Duration::from_secs(self.config.cpi.timeout_secs));
        Ok(CpiCloud::new(runner, path, uuid::Uuid::new_v4().to_string()))
    }

    /// Agent client for the deployed VM.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured message-bus URL is invalid.
    pub fn agent(&self) -> Result<ConfiguredAgent> {
        ConfiguredAgent::from_config(self.config.agent.mbus_url.as_deref(), &self.config.agent)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (`--yes` flag or `SOLO_YES` env),
    /// returns `true` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Overlay command-line values onto the loaded configuration.
pub fn apply_overrides(config: &mut SoloConfig, overrides: ConfigOverrides) {
    if let Some(path) = overrides.state_path {
        config.state_path = Some(path);
    }
    if let Some(path) = overrides.cpi_path {
        config.cpi.path = Some(path);
    }
    if let Some(url) = overrides.mbus_url {
        config.agent.mbus_url = Some(url);
    }
}
