//! PostgreSQL accessor for clusters.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::debug;

use stratus_core::transition::{Clusters, ReconcileKind};
use stratus_core::ClusterStatus;

use crate::error::{Result, StoreError};
use crate::traits::{ByohCluster, ClusterStore, ResourceRow, StatusStore};

/// Cluster accessor backed by the `clusters` table.
#[derive(Clone)]
pub struct PgClusterStore {
    pool: PgPool,
}

impl PgClusterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgClusterStore {
    type Status = ClusterStatus;

    async fn list_transitional(&self) -> Result<Vec<ResourceRow<ClusterStatus>>> {
        let in_flight: Vec<String> = Clusters::in_flight()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows: Vec<(String, String, String, String)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, workflow_id, status, status_desc
            FROM clusters
            WHERE status = ANY($1)
            "#,
        )
        .bind(in_flight)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, workflow_ref, status, status_desc)| {
                Ok(ResourceRow {
                    id,
                    workflow_ref,
                    status: status.parse()?,
                    status_desc,
                })
            })
            .collect()
    }

    async fn update_status(
        &self,
        id: &str,
        status: ClusterStatus,
        status_desc: &str,
        workflow_ref: &str,
    ) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE clusters
            SET status = $2, status_desc = $3, workflow_id = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(status_desc)
        .bind(workflow_ref)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cluster", id));
        }

        debug!(cluster_id = %id, status = %status, "Updated cluster status");
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for PgClusterStore {
    async fn list_bootstrapped_byoh(&self) -> Result<Vec<ByohCluster>> {
        let rows: Vec<(String, String, bool)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, organization_id, is_stack
            FROM clusters
            WHERE status = $1 AND is_byoh
            "#,
        )
        .bind(ClusterStatus::Bootstrapped.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, organization_id, is_stack)| ByohCluster {
                id,
                organization_id,
                is_stack,
            })
            .collect())
    }
}
