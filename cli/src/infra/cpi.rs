//! Infrastructure implementation of the `Cloud` port over a CPI executable.
//!
//! Each call runs the CPI once through the `CommandRunner` port, writing one
//! JSON request to its stdin and reading one JSON response from its stdout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::application::ports::{Cloud, CommandRunner};
use crate::domain::{CloudError, CloudErrorKind};

/// CPI error type for a VM that does not exist.
pub const VM_NOT_FOUND_ERROR: &str = "Bosh::Clouds::VMNotFound";
/// CPI error type for a disk that does not exist.
pub const DISK_NOT_FOUND_ERROR: &str = "Bosh::Clouds::DiskNotFound";
/// CPI error type for a stemcell that does not exist.
pub const STEMCELL_NOT_FOUND_ERROR: &str = "Bosh::Clouds::StemcellNotFound";

#[derive(Debug, Serialize)]
struct CpiRequest<'a> {
    method: &'a str,
    arguments: Vec<Value>,
    context: CpiContext<'a>,
}

#[derive(Debug, Serialize)]
struct CpiContext<'a> {
    director_uuid: &'a str,
}

#[derive(Debug, Deserialize)]
struct CpiResponse {
    #[serde(default)]
    result: Value,
    error: Option<CpiResponseError>,
    #[serde(default)]
    log: String,
}

#[derive(Debug, Deserialize)]
struct CpiResponseError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
    #[serde(default)]
    ok_to_retry: bool,
}

/// `Cloud` backed by a CPI executable.
pub struct CpiCloud<R> {
    runner: R,
    cpi_path: PathBuf,
    director_uuid: String,
}

impl<R: CommandRunner> CpiCloud<R> {
    #[must_use]
    pub fn new(runner: R, cpi_path: PathBuf, director_uuid: String) -> Self {
        Self {
            runner,
            cpi_path,
            director_uuid,
        }
    }

    async fn call(&self, method: &str, arguments: Vec<Value>) -> Result<Value, CloudError> {
        let request = CpiRequest {
            method,
            arguments,
            context: CpiContext {
                director_uuid: &self.director_uuid,
            },
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| CloudError::transport(method, e))?;
        let program = self.cpi_path.to_string_lossy();
        debug!(%program, method, "invoking CPI");

        let output = self
            .runner
            .run_with_stdin(&program, &[], &payload)
            .await
            .map_err(|e| CloudError::transport(method, e))?;
        let response = parse_response(method, &output.stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(method, status = %output.status, stderr = %stderr.trim(), "unreadable CPI response");
            e
        })?;
        if !response.log.is_empty() {
            debug!(method, log = %response.log, "CPI log");
        }

        match response.error {
            Some(err) => Err(CloudError::new(method, classify(&err.error_type), err.message)
                .with_retry(err.ok_to_retry)),
            None => Ok(response.result),
        }
    }
}

fn parse_response(method: &str, stdout: &[u8]) -> Result<CpiResponse, CloudError> {
    serde_json::from_slice(stdout).map_err(|e| CloudError::transport(method, e))
}

/// Map a CPI error type string to its classified kind.
#[must_use]
pub fn classify(error_type: &str) -> CloudErrorKind {
    match error_type {
        VM_NOT_FOUND_ERROR => CloudErrorKind::VmNotFound,
        DISK_NOT_FOUND_ERROR => CloudErrorKind::DiskNotFound,
        STEMCELL_NOT_FOUND_ERROR => CloudErrorKind::StemcellNotFound,
        other => CloudErrorKind::Cpi(other.to_string()),
    }
}

impl<R: CommandRunner> Cloud for CpiCloud<R> {
    async fn has_vm(&self, vm_cid: &str) -> Result<bool, CloudError> {
        let result = self.call("has_vm", vec![json!(vm_cid)]).await?;
        result.as_bool().ok_or_else(|| {
            CloudError::new(
                "has_vm",
                CloudErrorKind::Cpi("InvalidResult".to_string()),
                format!("expected a boolean result, got {result}"),
            )
        })
    }

    async fn delete_vm(&self, vm_cid: &str) -> Result<(), CloudError> {
        self.call("delete_vm", vec![json!(vm_cid)]).await.map(drop)
    }

    async fn delete_disk(&self, disk_cid: &str) -> Result<(), CloudError> {
        self.call("delete_disk", vec![json!(disk_cid)]).await.map(drop)
    }

    async fn delete_stemcell(&self, stemcell_cid: &str) -> Result<(), CloudError> {
        self.call("delete_stemcell", vec![json!(stemcell_cid)])
            .await
            .map(drop)
    }
}
