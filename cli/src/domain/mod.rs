//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod deployment;
pub mod error;

pub use config::{AgentConfig, CpiConfig, SoloConfig, validate_mbus_url};
pub use deployment::{Deployment, Instance, TeardownAction, TeardownPhase, UNKNOWN_JOB_NAME};
pub use error::{AgentError, CloudError, CloudErrorKind, ConfigError};
