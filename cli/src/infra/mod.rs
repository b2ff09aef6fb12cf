//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the CPI
//! protocol, agent HTTP calls, and state/config files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod agent;
pub mod command_runner;
pub mod config;
pub mod cpi;
pub mod state;
