//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use solo_common::ResourceKind;
use thiserror::Error;

// ── Cloud errors ──────────────────────────────────────────────────────────────

/// Classification of a failed infrastructure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudErrorKind {
    VmNotFound,
    DiskNotFound,
    StemcellNotFound,
    /// Any other error type reported by the CPI, carried verbatim.
    Cpi(String),
    /// The CPI could not be invoked or its response could not be read.
    Transport,
}

impl CloudErrorKind {
    /// The not-found kind for a resource.
    #[must_use]
    pub fn not_found(resource: ResourceKind) -> Self {
        match resource {
            ResourceKind::Vm => CloudErrorKind::VmNotFound,
            ResourceKind::Disk => CloudErrorKind::DiskNotFound,
            ResourceKind::Stemcell => CloudErrorKind::StemcellNotFound,
        }
    }
}

/// Error returned by every `Cloud` port operation.
///
/// `kind` is the only part callers match on; `message` and `source` are
/// opaque detail for humans.
#[derive(Debug, Error)]
#[error("CPI '{method}' failed: {message}")]
pub struct CloudError {
    pub method: String,
    pub kind: CloudErrorKind,
    pub message: String,
    pub ok_to_retry: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CloudError {
    #[must_use]
    pub fn new(method: &str, kind: CloudErrorKind, message: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            kind,
            message: message.into(),
            ok_to_retry: false,
            source: None,
        }
    }

    /// Wrap a failure to reach the CPI at all.
    #[must_use]
    pub fn transport(method: &str, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            method: method.to_string(),
            kind: CloudErrorKind::Transport,
            message: "could not complete request".to_string(),
            ok_to_retry: false,
            source: Some(err.into()),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, ok_to_retry: bool) -> Self {
        self.ok_to_retry = ok_to_retry;
        self
    }

    /// Whether this is the not-found error for `resource`.
    ///
    /// A `DiskNotFound` returned while deleting a VM does not count.
    #[must_use]
    pub fn is_not_found(&self, resource: ResourceKind) -> bool {
        self.kind == CloudErrorKind::not_found(resource)
    }
}

// ── Agent errors ──────────────────────────────────────────────────────────────

/// Errors reported by the in-VM agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent responded to '{method}' with exception: {message}")]
    Exception { method: String, message: String },

    #[error("agent task '{task_id}' for '{method}' still running after {timeout:?}")]
    TaskTimedOut {
        method: String,
        task_id: String,
        timeout: std::time::Duration,
    },

    #[error("unexpected agent response to '{method}': {detail}")]
    UnexpectedResponse { method: String, detail: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\n{reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Missing setting: {key}\n\n{hint}")]
    Missing { key: String, hint: String },
}
