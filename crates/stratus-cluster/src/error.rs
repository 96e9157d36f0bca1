//! Error types for the cluster config API.

/// Errors from talking to a cluster's API server.
#[derive(Debug, thiserror::Error)]
pub enum ClusterApiError {
    /// The addressed object does not exist.
    #[error("{kind} not found: {namespace}/{name}")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// No API endpoint is registered for the cluster.
    #[error("unknown cluster: {cluster_id}")]
    UnknownCluster { cluster_id: String },

    /// Transport-level failure.
    #[error("cluster API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API server answered with an unexpected HTTP status.
    #[error("cluster API returned status {status} for {kind} {namespace}/{name}")]
    UnexpectedStatus {
        status: u16,
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// A payload did not decode (bad base64 in a secret, malformed JSON).
    #[error("cluster API payload error: {message}")]
    Decode { message: String },

    /// The ruler endpoint could not be resolved from secret or service.
    #[error("ruler endpoint unresolved for cluster {cluster_id}: {message}")]
    EndpointUnresolved { cluster_id: String, message: String },
}

impl ClusterApiError {
    #[must_use]
    pub fn not_found(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn endpoint_unresolved(
        cluster_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::EndpointUnresolved {
            cluster_id: cluster_id.into(),
            message: message.into(),
        }
    }

    /// True when the object simply is not there, as opposed to a transport
    /// or server failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
