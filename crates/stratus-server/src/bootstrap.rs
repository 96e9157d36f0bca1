//! BYOH bootstrap watcher.
//!
//! Bring-your-own-host clusters finish their bootstrap run and then sit in
//! BOOTSTRAPPED with no workflow attached, waiting for their agent nodes to
//! register with the platform. Each cycle this watcher polls node state and,
//! once every node reports completed, flips the cluster to INSTALLING and
//! asks the platform API to start the installation. The status write happens
//! before the install request so a second cycle cannot start a second install.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stratus_core::ClusterStatus;
use stratus_store::{ClusterStore, StatusStore, StoreError};

use crate::platform::{NodeStatus, PlatformApi};

/// Counters for one watcher pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Clusters waiting for node registration at the start of the pass.
    pub examined: usize,
    /// Clusters whose installation was kicked off.
    pub started: usize,
}

/// Watches bootstrapped BYOH clusters and starts installation when ready.
pub struct BootstrapWatcher<C: ClusterStore> {
    clusters: Arc<C>,
    platform: Arc<dyn PlatformApi>,
}

impl<C: ClusterStore> BootstrapWatcher<C> {
    pub fn new(clusters: Arc<C>, platform: Arc<dyn PlatformApi>) -> Self {
        Self { clusters, platform }
    }

    /// Runs one pass over every waiting cluster.
    ///
    /// # Errors
    ///
    /// Only the initial listing can fail the pass.
    pub async fn run_once(&self) -> Result<BootstrapOutcome, StoreError> {
        let waiting = self.clusters.list_bootstrapped_byoh().await?;
        let mut outcome = BootstrapOutcome {
            examined: waiting.len(),
            ..BootstrapOutcome::default()
        };

        for cluster in waiting {
            let nodes = match self.platform.cluster_nodes(&cluster.id).await {
                Ok(nodes) => nodes,
                Err(err) => {
                    warn!(cluster_id = %cluster.id, error = %err, "Node state fetch failed");
                    continue;
                }
            };

            // An empty node list means no agent has registered at all yet.
            if nodes.is_empty() || !nodes.iter().all(NodeStatus::is_completed) {
                let completed = nodes.iter().filter(|n| n.is_completed()).count();
                debug!(
                    cluster_id = %cluster.id,
                    completed,
                    total = nodes.len(),
                    "Agent nodes still registering"
                );
                continue;
            }

            if let Err(err) = self
                .clusters
                .update_status(&cluster.id, ClusterStatus::Installing, "", "")
                .await
            {
                warn!(cluster_id = %cluster.id, error = %err, "Could not flip cluster to installing");
                continue;
            }

            let result = if cluster.is_stack {
                self.platform
                    .install_stack(&cluster.organization_id, &cluster.id)
                    .await
            } else {
                self.platform.install_cluster(&cluster.id).await
            };

            match result {
                Ok(()) => {
                    info!(
                        cluster_id = %cluster.id,
                        organization_id = %cluster.organization_id,
                        stack = cluster.is_stack,
                        "Started installation of bootstrapped cluster"
                    );
                    outcome.started += 1;
                }
                Err(err) => {
                    warn!(cluster_id = %cluster.id, error = %err, "Install request failed");
                }
            }
        }

        Ok(outcome)
    }
}
