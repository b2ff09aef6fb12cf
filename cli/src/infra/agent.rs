//! Infrastructure implementation of the `AgentClient` port over HTTP.
//!
//! The agent accepts `POST <mbus>/agent` with a `{method, arguments, reply_to}`
//! body and answers `{value}` or `{exception: {message}}`. Long-running
//! methods answer with a task handle that is polled with `get_task`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::ports::AgentClient;
use crate::domain::{AgentConfig, AgentError, ConfigError};

#[derive(Debug, Serialize)]
struct AgentRequest<'a> {
    method: &'a str,
    arguments: Vec<Value>,
    reply_to: &'a str,
}

/// State of an agent task as reported by `get_task`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Running { task_id: String },
    Done(Value),
}

/// HTTP client for the agent's message-bus endpoint.
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: Client,
    endpoint: Url,
    credentials: Option<(String, String)>,
    reply_to: String,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl HttpAgentClient {
    /// Create a client for the agent reachable at `mbus_url`.
    ///
    /// Credentials embedded in the URL are sent as basic auth instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(mbus_url: &str, config: &AgentConfig) -> Result<Self> {
        let (endpoint, credentials) = agent_endpoint(mbus_url)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("building agent HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            credentials,
            reply_to: uuid::Uuid::new_v4().to_string(),
            poll_interval: config.task_poll_interval(),
            task_timeout: config.task_timeout(),
        })
    }

    async fn send(&self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        let request = AgentRequest {
            method,
            arguments,
            reply_to: &self.reply_to,
        };
        debug!(method, endpoint = %self.endpoint, "sending agent request");

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password));
        }
        let response = builder
            .send()
            .await
            .with_context(|| format!("sending '{method}' to agent"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("agent returned HTTP {status} for '{method}'");
        }
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("reading agent response to '{method}'"))?;
        Ok(response_value(method, body)?)
    }

    /// Send a task method and wait for the task to finish.
    async fn run_task(&self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        let first = task_status(self.send(method, arguments).await?);
        let poller = TaskPoller {
            method,
            interval: self.poll_interval,
            timeout: self.task_timeout,
        };
        poller
            .wait(first, |task_id| async move {
                Ok::<_, anyhow::Error>(task_status(
                    self.send("get_task", vec![json!(task_id)]).await?,
                ))
            })
            .await
    }
}

/// Polls a running agent task until it is done or `timeout` has passed.
struct TaskPoller<'a> {
    method: &'a str,
    interval: Duration,
    timeout: Duration,
}

impl TaskPoller<'_> {
    async fn wait<F, Fut>(&self, first: TaskStatus, mut poll: F) -> Result<Value>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<TaskStatus>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut status = first;
        loop {
            let task_id = match status {
                TaskStatus::Done(value) => return Ok(value),
                TaskStatus::Running { task_id } => task_id,
            };
            if Instant::now() + self.interval > deadline {
                warn!(method = self.method, %task_id, "gave up waiting for agent task");
                return Err(AgentError::TaskTimedOut {
                    method: self.method.to_string(),
                    task_id,
                    timeout: self.timeout,
                }
                .into());
            }
            debug!(method = self.method, %task_id, "agent task running");
            tokio::time::sleep(self.interval).await;
            status = poll(task_id).await?;
        }
    }
}

impl AgentClient for HttpAgentClient {
    async fn ping(&self) -> Result<String> {
        let value = self.send("ping", Vec::new()).await?;
        Ok(value_as_string(&value))
    }

    async fn stop(&self) -> Result<()> {
        self.run_task("stop", Vec::new()).await.map(drop)
    }

    async fn list_disk(&self) -> Result<Vec<String>> {
        let value = self.send("list_disk", Vec::new()).await?;
        Ok(disk_cids("list_disk", &value)?)
    }

    async fn unmount_disk(&self, disk_cid: &str) -> Result<()> {
        self.run_task("unmount_disk", vec![json!(disk_cid)])
            .await
            .map(drop)
    }
}

/// Agent used when no message-bus URL is configured.
///
/// Every call fails, so teardown treats the agent as unresponsive and deletes
/// the VM without stopping jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAgent;

impl UnconfiguredAgent {
    fn missing() -> anyhow::Error {
        ConfigError::Missing {
            key: "agent.mbus_url".to_string(),
            hint: "Pass --mbus-url or set agent.mbus_url in the config file.".to_string(),
        }
        .into()
    }
}

impl AgentClient for UnconfiguredAgent {
    async fn ping(&self) -> Result<String> {
        Err(Self::missing())
    }

    async fn stop(&self) -> Result<()> {
        Err(Self::missing())
    }

    async fn list_disk(&self) -> Result<Vec<String>> {
        Err(Self::missing())
    }

    async fn unmount_disk(&self, _disk_cid: &str) -> Result<()> {
        Err(Self::missing())
    }
}

/// Either a reachable HTTP agent or none at all.
pub enum ConfiguredAgent {
    Http(HttpAgentClient),
    Unconfigured(UnconfiguredAgent),
}

impl ConfiguredAgent {
    /// Build from an optional message-bus URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is present but invalid.
    pub fn from_config(mbus_url: Option<&str>, config: &AgentConfig) -> Result<Self> {
        Ok(match mbus_url {
            Some(url) => Self::Http(HttpAgentClient::new(url, config)?),
            None => Self::Unconfigured(UnconfiguredAgent),
        })
    }
}

impl AgentClient for ConfiguredAgent {
    async fn ping(&self) -> Result<String> {
        match self {
            Self::Http(agent) => agent.ping().await,
            Self::Unconfigured(agent) => agent.ping().await,
        }
    }

    async fn stop(&self) -> Result<()> {
        match self {
            Self::Http(agent) => agent.stop().await,
            Self::Unconfigured(agent) => agent.stop().await,
        }
    }

    async fn list_disk(&self) -> Result<Vec<String>> {
        match self {
            Self::Http(agent) => agent.list_disk().await,
            Self::Unconfigured(agent) => agent.list_disk().await,
        }
    }

    async fn unmount_disk(&self, disk_cid: &str) -> Result<()> {
        match self {
            Self::Http(agent) => agent.unmount_disk(disk_cid).await,
            Self::Unconfigured(agent) => agent.unmount_disk(disk_cid).await,
        }
    }
}

// ── Wire helpers ──────────────────────────────────────────────────────────────

/// Split a message-bus URL into the `/agent` endpoint and its credentials.
///
/// # Errors
///
/// Returns an error if the URL does not parse.
pub fn agent_endpoint(mbus_url: &str) -> Result<(Url, Option<(String, String)>)> {
    let mut url = Url::parse(mbus_url)
        .with_context(|| format!("parsing message-bus URL '{mbus_url}'"))?;
    let credentials = (!url.username().is_empty()).then(|| {
        (
            url.username().to_string(),
            url.password().unwrap_or_default().to_string(),
        )
    });
    // Both only fail for URLs that cannot carry credentials at all.
    let _ = url.set_password(None);
    let _ = url.set_username("");
    let path = format!("{}/agent", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok((url, credentials))
}

/// Extract `value` from an agent response, turning `exception` into an error.
///
/// # Errors
///
/// Returns [`AgentError::Exception`] or [`AgentError::UnexpectedResponse`].
pub fn response_value(method: &str, mut body: Value) -> Result<Value, AgentError> {
    if let Some(exception) = body.get("exception").filter(|e| !e.is_null()) {
        let message = exception
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown agent exception")
            .to_string();
        return Err(AgentError::Exception {
            method: method.to_string(),
            message,
        });
    }
    match body.get_mut("value") {
        Some(value) => Ok(value.take()),
        None => Err(AgentError::UnexpectedResponse {
            method: method.to_string(),
            detail: format!("missing 'value' in {body}"),
        }),
    }
}

/// Classify a task method's value as still running or finished.
#[must_use]
pub fn task_status(value: Value) -> TaskStatus {
    let running = value.get("state").and_then(Value::as_str) == Some("running");
    let task_id = value
        .get("agent_task_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    match task_id {
        Some(task_id) if running => TaskStatus::Running { task_id },
        _ => TaskStatus::Done(value),
    }
}

fn disk_cids(method: &str, value: &Value) -> Result<Vec<String>, AgentError> {
    let unexpected = || AgentError::UnexpectedResponse {
        method: method.to_string(),
        detail: format!("expected a list of disk CIDs, got {value}"),
    };
    value
        .as_array()
        .ok_or_else(unexpected)?
        .iter()
        .map(|cid| cid.as_str().map(str::to_string).ok_or_else(unexpected))
        .collect()
}

fn value_as_string(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}
