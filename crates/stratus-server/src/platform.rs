//! Client for the platform's own REST API.
//!
//! The bootstrap watcher needs two things from the platform API: the
//! registration state of a BYOH cluster's agent nodes, and the install
//! endpoints that kick off the actual installation workflow. The API is
//! session-authenticated; the client logs in with a service account and
//! re-verifies its token before each call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Node status reported once an agent has fully joined.
pub const NODE_COMPLETED: &str = "COMPLETED";

/// Settings for the platform API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform API, e.g. `http://platform-api:9110`.
    pub base_url: String,

    /// Service account used to log in.
    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub password: String,

    /// Organization the service account belongs to.
    #[serde(default = "default_organization")]
    pub organization_id: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_organization() -> String {
    "master".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9110".into(),
            account_id: String::new(),
            password: String::new(),
            organization_id: default_organization(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Errors from the platform API.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform API returned status {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },

    #[error("platform authentication failed: {message}")]
    Auth { message: String },

    #[error("platform client configuration error: {message}")]
    Config { message: String },
}

impl PlatformError {
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// One agent node of a BYOH cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub name: String,
    pub status: String,
}

impl NodeStatus {
    /// True once the agent has registered and finished joining.
    pub fn is_completed(&self) -> bool {
        self.status == NODE_COMPLETED
    }
}

/// The platform API operations the bootstrap watcher depends on.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn cluster_nodes(&self, cluster_id: &str) -> Result<Vec<NodeStatus>, PlatformError>;

    /// Starts installation of a standalone cluster.
    async fn install_cluster(&self, cluster_id: &str) -> Result<(), PlatformError>;

    /// Starts installation of a cluster that was created as part of a stack.
    async fn install_stack(
        &self,
        organization_id: &str,
        stack_id: &str,
    ) -> Result<(), PlatformError>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct NodesResponse {
    #[serde(default)]
    nodes: Vec<NodePayload>,
}

#[derive(Debug, Deserialize)]
struct NodePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
}

/// [`PlatformApi`] over the platform's REST API.
pub struct RestPlatformApi {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    password: String,
    organization_id: String,
    token: Mutex<Option<String>>,
}

impl RestPlatformApi {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PlatformError::config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            password: config.password.clone(),
            organization_id: config.organization_id.clone(),
            token: Mutex::new(None),
        })
    }

    /// Returns a verified session token, logging in again when the cached one
    /// is missing or has expired.
    async fn token(&self) -> Result<String, PlatformError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if self.verify(token).await? {
                return Ok(token.clone());
            }
            debug!("Cached platform token rejected, logging in again");
        }

        let fresh = self.login().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    async fn verify(&self, token: &str) -> Result<bool, PlatformError> {
        let url = format!("{}/auth/verify-token", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        Ok(response.status().is_success())
    }

    async fn login(&self) -> Result<String, PlatformError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = serde_json::json!({
            "accountId": self.account_id,
            "password": self.password,
            "organizationId": self.organization_id,
        });

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(PlatformError::auth(format!(
                "login rejected with status {}",
                response.status().as_u16()
            )));
        }

        let login: LoginResponse = response.json().await?;
        debug!(account_id = %self.account_id, "Logged in to platform API");
        Ok(login.user.token)
    }

    fn check_status(status: StatusCode, path: &str) -> Result<(), PlatformError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(PlatformError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }
}

#[async_trait]
impl PlatformApi for RestPlatformApi {
    async fn cluster_nodes(&self, cluster_id: &str) -> Result<Vec<NodeStatus>, PlatformError> {
        let token = self.token().await?;
        let path = format!("/clusters/{cluster_id}/nodes");
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.get(&url).bearer_auth(&token).send().await?;
        Self::check_status(response.status(), &path)?;

        let payload: NodesResponse = response.json().await?;
        Ok(payload
            .nodes
            .into_iter()
            .map(|n| NodeStatus {
                name: n.name,
                status: n.status,
            })
            .collect())
    }

    async fn install_cluster(&self, cluster_id: &str) -> Result<(), PlatformError> {
        let token = self.token().await?;
        let path = format!("/clusters/{cluster_id}/install");
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.post(&url).bearer_auth(&token).send().await?;
        Self::check_status(response.status(), &path)?;

        debug!(cluster_id = %cluster_id, "Requested cluster installation");
        Ok(())
    }

    async fn install_stack(
        &self,
        organization_id: &str,
        stack_id: &str,
    ) -> Result<(), PlatformError> {
        let token = self.token().await?;
        let path = format!("/organizations/{organization_id}/stacks/{stack_id}/install");
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.post(&url).bearer_auth(&token).send().await?;
        Self::check_status(response.status(), &path)?;

        debug!(
            organization_id = %organization_id,
            stack_id = %stack_id,
            "Requested stack installation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> PlatformConfig {
        PlatformConfig {
            base_url: server.uri(),
            account_id: "svc-stratus".into(),
            password: "secret".into(),
            organization_id: "master".into(),
            timeout_ms: 2000,
        }
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "token": "tok-1" }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn logs_in_and_lists_nodes() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/clusters/c-byoh/nodes"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nodes": [
                    { "name": "node-0", "status": "COMPLETED" },
                    { "name": "node-1", "status": "REGISTERING" }
                ]
            })))
            .mount(&server)
            .await;

        let api = RestPlatformApi::new(&config_for(&server)).unwrap();
        let nodes = api.cluster_nodes("c-byoh").await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_completed());
        assert!(!nodes[1].is_completed());
    }

    #[tokio::test]
    async fn cached_token_is_verified_before_reuse() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/auth/verify-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/clusters/c-1/install"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let api = RestPlatformApi::new(&config_for(&server)).unwrap();
        api.install_cluster("c-1").await.unwrap();
        api.install_cluster("c-1").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_login_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = RestPlatformApi::new(&config_for(&server)).unwrap();
        let err = api.cluster_nodes("c-1").await.unwrap_err();
        assert!(matches!(err, PlatformError::Auth { .. }));
    }

    #[tokio::test]
    async fn stack_install_hits_the_stack_endpoint() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/organizations/o-1/stacks/c-stack/install"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = RestPlatformApi::new(&config_for(&server)).unwrap();
        api.install_stack("o-1", "c-stack").await.unwrap();
    }

    #[tokio::test]
    async fn failing_install_surfaces_status() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/clusters/c-1/install"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = RestPlatformApi::new(&config_for(&server)).unwrap();
        let err = api.install_cluster("c-1").await.unwrap_err();
        assert!(matches!(err, PlatformError::UnexpectedStatus { status: 500, .. }));
    }
}
