//! The cluster config API trait and the objects it moves.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ClusterApiError;

/// A config map: named string data in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    pub data: BTreeMap<String, String>,
}

/// A secret with its values already base64-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secret {
    pub data: BTreeMap<String, String>,
}

/// One exposed service port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    pub name: String,
    pub port: i32,
}

/// A service, reduced to what endpoint resolution needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Service {
    /// Service type, e.g. `"LoadBalancer"` or `"ClusterIP"`.
    pub service_type: String,
    pub ports: Vec<ServicePort>,
    /// External hostnames of the load balancer, when provisioned.
    pub ingress_hostnames: Vec<String>,
}

/// Config-level operations against one cluster's API server.
///
/// Every method is scoped by `cluster_id`; the implementation resolves the
/// cluster's endpoint and credentials itself. All calls are stateless and
/// safe to retry.
#[async_trait]
pub trait ClusterConfigApi: Send + Sync {
    async fn get_config_map(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigMap, ClusterApiError>;

    async fn update_config_map(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterApiError>;

    async fn delete_pod(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterApiError>;

    async fn get_secret(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Secret, ClusterApiError>;

    async fn get_service(
        &self,
        cluster_id: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Service, ClusterApiError>;
}
