//! Ruler endpoint resolution and reload.
//!
//! Two deployment generations exist. Newer stacks publish the ruler address in
//! a well-known secret on the admin cluster; older ones expose the ruler
//! through a load-balancer service on the organization's primary cluster.
//! Resolution tries the secret first and falls back to the service.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::ClusterConfigApi;
use crate::error::ClusterApiError;

/// Namespace the monitoring stack lives in on every primary cluster.
pub const MONITORING_NAMESPACE: &str = "monitoring";
/// Config map holding the ruler configuration document.
pub const RULER_CONFIGMAP: &str = "thanos-ruler-configmap";
/// Key of the document inside the config map.
pub const RULER_CONFIG_KEY: &str = "ruler.yml";
/// Ruler pod deleted when propagating by restart.
pub const RULER_POD: &str = "thanos-ruler-0";
/// Ruler service consulted for the load-balancer fallback.
pub const RULER_SERVICE: &str = "thanos-ruler";
/// Well-known secret on the admin cluster carrying pre-configured endpoints.
pub const ENDPOINT_SECRET: &str = "stratus-endpoint-secret";
/// Key of the ruler address inside the endpoint secret.
pub const RULER_SECRET_KEY: &str = "thanos-ruler";

/// How a configuration change reaches the running ruler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// POST the ruler's reload endpoint.
    #[default]
    Reload,
    /// Delete the ruler pod and let the controller restart it.
    RestartPod,
}

/// Resolves ruler endpoints and triggers reloads.
pub struct RulerLocator {
    api: Arc<dyn ClusterConfigApi>,
    /// Cluster hosting the per-cluster endpoint secrets.
    admin_cluster: String,
    http: reqwest::Client,
}

impl RulerLocator {
    pub fn new(
        api: Arc<dyn ClusterConfigApi>,
        admin_cluster: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClusterApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClusterApiError::Http)?;

        Ok(Self {
            api,
            admin_cluster: admin_cluster.into(),
            http,
        })
    }

    /// Resolves the base URL of the ruler serving `primary_cluster_id`.
    pub async fn ruler_url(&self, primary_cluster_id: &str) -> Result<String, ClusterApiError> {
        match self
            .api
            .get_secret(&self.admin_cluster, primary_cluster_id, ENDPOINT_SECRET)
            .await
        {
            Ok(secret) => {
                if let Some(address) = secret.data.get(RULER_SECRET_KEY) {
                    debug!(cluster_id = %primary_cluster_id, "Resolved ruler from endpoint secret");
                    return Ok(format!("http://{address}"));
                }
                debug!(
                    cluster_id = %primary_cluster_id,
                    "Endpoint secret has no ruler entry, falling back to load balancer"
                );
            }
            Err(err) if err.is_not_found() => {
                debug!(
                    cluster_id = %primary_cluster_id,
                    "No endpoint secret, falling back to load balancer"
                );
            }
            Err(err) => return Err(err),
        }

        self.load_balancer_url(primary_cluster_id).await
    }

    async fn load_balancer_url(&self, primary_cluster_id: &str) -> Result<String, ClusterApiError> {
        let service = self
            .api
            .get_service(primary_cluster_id, MONITORING_NAMESPACE, RULER_SERVICE)
            .await?;

        if service.service_type != "LoadBalancer" {
            return Err(ClusterApiError::endpoint_unresolved(
                primary_cluster_id,
                format!("ruler service type is {}, not LoadBalancer", service.service_type),
            ));
        }

        let host = service.ingress_hostnames.first().ok_or_else(|| {
            ClusterApiError::endpoint_unresolved(primary_cluster_id, "load balancer has no ingress hostname")
        })?;
        let port = service.ports.first().ok_or_else(|| {
            ClusterApiError::endpoint_unresolved(primary_cluster_id, "ruler service exposes no ports")
        })?;

        Ok(format!("http://{}:{}", host, port.port))
    }

    /// Tells the ruler at `ruler_url` to re-read its configuration.
    pub async fn reload(&self, ruler_url: &str) -> Result<(), ClusterApiError> {
        let url = format!("{}/-/reload", ruler_url.trim_end_matches('/'));

        let response = self.http.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClusterApiError::UnexpectedStatus {
                status: response.status().as_u16(),
                kind: "reload",
                namespace: String::new(),
                name: url,
            });
        }

        info!(url = %ruler_url, "Triggered ruler reload");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::{ConfigMap, Secret, Service, ServicePort};

    /// Fake cluster API serving canned secrets and services.
    struct FakeApi {
        secret: Option<Secret>,
        service: Option<Service>,
    }

    #[async_trait]
    impl ClusterConfigApi for FakeApi {
        async fn get_config_map(
            &self,
            _cluster_id: &str,
            namespace: &str,
            name: &str,
        ) -> Result<ConfigMap, ClusterApiError> {
            Err(ClusterApiError::not_found("configmap", namespace, name))
        }

        async fn update_config_map(
            &self,
            _cluster_id: &str,
            _namespace: &str,
            _name: &str,
            _config_map: &ConfigMap,
        ) -> Result<(), ClusterApiError> {
            Ok(())
        }

        async fn delete_pod(
            &self,
            _cluster_id: &str,
            _namespace: &str,
            _name: &str,
        ) -> Result<(), ClusterApiError> {
            Ok(())
        }

        async fn get_secret(
            &self,
            _cluster_id: &str,
            namespace: &str,
            name: &str,
        ) -> Result<Secret, ClusterApiError> {
            self.secret
                .clone()
                .ok_or_else(|| ClusterApiError::not_found("secret", namespace, name))
        }

        async fn get_service(
            &self,
            _cluster_id: &str,
            namespace: &str,
            name: &str,
        ) -> Result<Service, ClusterApiError> {
            self.service
                .clone()
                .ok_or_else(|| ClusterApiError::not_found("service", namespace, name))
        }
    }

    fn locator(api: FakeApi) -> RulerLocator {
        RulerLocator::new(Arc::new(api), "c-admin", Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn secret_wins_over_service() {
        let api = FakeApi {
            secret: Some(Secret {
                data: BTreeMap::from([(
                    RULER_SECRET_KEY.to_string(),
                    "ruler.example.com:10903".to_string(),
                )]),
            }),
            service: None,
        };

        let url = locator(api).ruler_url("c-primary").await.unwrap();
        assert_eq!(url, "http://ruler.example.com:10903");
    }

    #[tokio::test]
    async fn falls_back_to_load_balancer() {
        let api = FakeApi {
            secret: None,
            service: Some(Service {
                service_type: "LoadBalancer".into(),
                ports: vec![ServicePort {
                    name: "http".into(),
                    port: 10903,
                }],
                ingress_hostnames: vec!["lb-123.elb.example.com".into()],
            }),
        };

        let url = locator(api).ruler_url("c-primary").await.unwrap();
        assert_eq!(url, "http://lb-123.elb.example.com:10903");
    }

    #[tokio::test]
    async fn non_load_balancer_service_is_unresolved() {
        let api = FakeApi {
            secret: None,
            service: Some(Service {
                service_type: "ClusterIP".into(),
                ports: vec![ServicePort {
                    name: "http".into(),
                    port: 10903,
                }],
                ingress_hostnames: vec![],
            }),
        };

        let err = locator(api).ruler_url("c-primary").await.unwrap_err();
        assert!(matches!(err, ClusterApiError::EndpointUnresolved { .. }));
    }

    #[tokio::test]
    async fn reload_posts_the_reload_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/-/reload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = FakeApi {
            secret: None,
            service: None,
        };
        locator(api).reload(&server.uri()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_reload_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/-/reload"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let api = FakeApi {
            secret: None,
            service: None,
        };
        let err = locator(api).reload(&server.uri()).await.unwrap_err();
        assert!(matches!(err, ClusterApiError::UnexpectedStatus { status: 503, .. }));
    }
}
