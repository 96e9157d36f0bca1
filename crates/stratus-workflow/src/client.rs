//! REST client for an Argo-workflow-server-style API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use stratus_core::{WorkflowPhase, WorkflowSnapshot};

use crate::error::WorkflowError;
use crate::WorkflowStatusSource;

/// Settings for the workflow engine client.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct WorkflowClientConfig {
    /// Base URL of the workflow server, e.g. `http://argo-server:2746`.
    pub base_url: String,

    /// Namespace the platform submits runs into.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_namespace() -> String {
    "argo".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for WorkflowClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2746".into(),
            namespace: default_namespace(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowResponse {
    #[serde(default)]
    spec: WorkflowSpec,
    #[serde(default)]
    status: WorkflowStatus,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowSpec {
    #[serde(default)]
    suspend: bool,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowStatus {
    #[serde(default)]
    phase: String,
    #[serde(default)]
    progress: String,
    #[serde(default)]
    message: String,
}

/// Workflow status source backed by the Argo server REST API.
#[derive(Clone)]
pub struct ArgoWorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArgoWorkflowClient {
    /// Builds the client. Failing here is a startup error; the process should
    /// not come up without a working workflow source.
    pub fn new(config: &WorkflowClientConfig) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WorkflowError::config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WorkflowStatusSource for ArgoWorkflowClient {
    async fn get_status(
        &self,
        namespace: &str,
        run_ref: &str,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        let url = format!(
            "{}/api/v1/workflows/{}/{}",
            self.base_url, namespace, run_ref
        );

        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(WorkflowError::RunNotFound {
                    namespace: namespace.to_string(),
                    run_ref: run_ref.to_string(),
                });
            }
            status => {
                return Err(WorkflowError::UnexpectedStatus {
                    status: status.as_u16(),
                });
            }
        }

        let workflow: WorkflowResponse = response.json().await?;

        let snapshot = WorkflowSnapshot {
            phase: WorkflowPhase::parse(&workflow.status.phase),
            progress: workflow.status.progress,
            message: workflow.status.message,
            suspended: workflow.spec.suspend,
        };

        debug!(
            run_ref = %run_ref,
            phase = %snapshot.phase,
            progress = %snapshot.progress,
            "Fetched workflow status"
        );

        Ok(snapshot)
    }
}
