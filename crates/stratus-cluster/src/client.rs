//! REST implementation of [`ClusterConfigApi`].
//!
//! Talks to each cluster's API server directly over HTTPS with a bearer
//! token. The endpoint registry is static configuration: this daemon only
//! ever touches the handful of primary clusters that host monitoring stacks.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{ClusterConfigApi, ConfigMap, Secret, Service, ServicePort};
use crate::error::ClusterApiError;

/// One cluster's API server address and credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    /// Base URL of the API server, e.g. `https://10.0.0.1:6443`.
    pub server: String,
    /// Bearer token presented on every request.
    pub token: String,
}

/// Registry of reachable clusters, keyed by cluster id.
pub type ClusterEndpoints = HashMap<String, ClusterEndpoint>;

#[derive(Debug, Deserialize)]
struct ConfigMapPayload {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePayload {
    #[serde(default)]
    spec: ServiceSpec,
    #[serde(default)]
    status: ServiceStatus,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceSpec {
    #[serde(rename = "type", default)]
    service_type: String,
    #[serde(default)]
    ports: Vec<ServicePortPayload>,
}

#[derive(Debug, Deserialize)]
struct ServicePortPayload {
    #[serde(default)]
    name: String,
    port: i32,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceStatus {
    #[serde(rename = "loadBalancer", default)]
    load_balancer: LoadBalancerStatus,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancerStatus {
    #[serde(default)]
    ingress: Vec<IngressPoint>,
}

#[derive(Debug, Deserialize)]
struct IngressPoint {
    #[serde(default)]
    hostname: String,
}

/// [`ClusterConfigApi`] over plain REST.
#[derive(Clone)]
pub struct RestClusterApi {
    http: reqwest::Client,
    endpoints: ClusterEndpoints,
}

impl RestClusterApi {
    pub fn new(endpoints: ClusterEndpoints, timeout: Duration) -> Result<Self, ClusterApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(ClusterApiError::Http)?;

        Ok(Self { http, endpoints })
    }

    fn endpoint(&self, cluster_id: &str) -> Result<&ClusterEndpoint, ClusterApiError> {
        self.endpoints
            .get(cluster_id)
            .ok_or_else(|| ClusterApiError::UnknownCluster {
                cluster_id: cluster_id.to_string(),
            })
    }

    fn object_url(endpoint: &ClusterEndpoint, namespace: &str, kind_path: &str, name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/{}/{}",
            endpoint.server.trim_end_matches('/'),
            namespace,
            kind_path,
            name
        )
    }

    fn check_status(
        status: StatusCode,
        kind: &'static str,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterApiError> {
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(ClusterApiError::not_found(kind, namespace, name)),
            other => Err(ClusterApiError::UnexpectedStatus {
                status: other.as_u16(),
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ClusterConfigApi for RestClusterApi {
    async fn get_config_map(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigMap, ClusterApiError> {
        let endpoint = self.endpoint(cluster_id)?;
        let url = Self::object_url(endpoint, namespace, "configmaps", name);

        let response = self.http.get(&url).bearer_auth(&endpoint.token).send().await?;
        Self::check_status(response.status(), "configmap", namespace, name)?;

        let payload: ConfigMapPayload = response.json().await?;
        Ok(ConfigMap { data: payload.data })
    }

    async fn update_config_map(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterApiError> {
        let endpoint = self.endpoint(cluster_id)?;
        let url = Self::object_url(endpoint, namespace, "configmaps", name);

        let body = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name, "namespace": namespace },
            "data": config_map.data,
        });

        let response = self
            .http
            .put(&url)
            .bearer_auth(&endpoint.token)
            .json(&body)
            .send()
            .await?;
        Self::check_status(response.status(), "configmap", namespace, name)?;

        debug!(cluster_id = %cluster_id, namespace = %namespace, name = %name, "Updated config map");
        Ok(())
    }

    async fn delete_pod(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterApiError> {
        let endpoint = self.endpoint(cluster_id)?;
        let url = Self::object_url(endpoint, namespace, "pods", name);

        let response = self.http.delete(&url).bearer_auth(&endpoint.token).send().await?;
        Self::check_status(response.status(), "pod", namespace, name)?;

        debug!(cluster_id = %cluster_id, namespace = %namespace, name = %name, "Deleted pod");
        Ok(())
    }

    async fn get_secret(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Secret, ClusterApiError> {
        let endpoint = self.endpoint(cluster_id)?;
        let url = Self::object_url(endpoint, namespace, "secrets", name);

        let response = self.http.get(&url).bearer_auth(&endpoint.token).send().await?;
        Self::check_status(response.status(), "secret", namespace, name)?;

        let payload: SecretPayload = response.json().await?;
        let mut data = BTreeMap::new();
        for (key, encoded) in payload.data {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(&encoded)
                .map_err(|e| ClusterApiError::decode(format!("secret {namespace}/{name} key {key}: {e}")))?;
            let value = String::from_utf8(decoded).map_err(|e| {
                ClusterApiError::decode(format!("secret {namespace}/{name} key {key}: {e}"))
            })?;
            data.insert(key, value);
        }

        Ok(Secret { data })
    }

    async fn get_service(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Service, ClusterApiError> {
        let endpoint = self.endpoint(cluster_id)?;
        let url = Self::object_url(endpoint, namespace, "services", name);

        let response = self.http.get(&url).bearer_auth(&endpoint.token).send().await?;
        Self::check_status(response.status(), "service", namespace, name)?;

        let payload: ServicePayload = response.json().await?;
        Ok(Service {
            service_type: payload.spec.service_type,
            ports: payload
                .spec
                .ports
                .into_iter()
                .map(|p| ServicePort {
                    name: p.name,
                    port: p.port,
                })
                .collect(),
            ingress_hostnames: payload
                .status
                .load_balancer
                .ingress
                .into_iter()
                .map(|i| i.hostname)
                .filter(|h| !h.is_empty())
                .collect(),
        })
    }
}
