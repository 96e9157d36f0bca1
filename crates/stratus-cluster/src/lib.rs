//! Cluster config API boundary.
//!
//! The rule distributor needs five operations against a cluster's API server:
//! read and write a config map, read a secret, read a service, and delete a
//! pod. [`ClusterConfigApi`] is that boundary; [`RestClusterApi`] implements
//! it over plain HTTPS with per-cluster endpoints and bearer tokens. The
//! [`ruler`] module resolves where a given organization's ruler listens and
//! triggers its reload.

pub mod api;
pub mod client;
pub mod error;
pub mod ruler;

pub use api::{ClusterConfigApi, ConfigMap, Secret, Service, ServicePort};
pub use client::{ClusterEndpoint, ClusterEndpoints, RestClusterApi};
pub use error::ClusterApiError;
pub use ruler::{Propagation, RulerLocator};
