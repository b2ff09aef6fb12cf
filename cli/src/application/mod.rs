//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` — never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod repository;
pub mod services;


pub use ports::{
    AgentClient, Cloud, CommandRunner, ConfigStore, DeploymentStateStore, Stage, Step,
};
pub use repository::{DeploymentRepo, RecordRepo};
