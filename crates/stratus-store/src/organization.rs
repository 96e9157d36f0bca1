//! PostgreSQL accessor for organizations.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::debug;
use uuid::Uuid;

use stratus_core::transition::{Organizations, ReconcileKind};
use stratus_core::OrganizationStatus;

use crate::error::{Result, StoreError};
use crate::traits::{OrganizationRecord, OrganizationStore, ResourceRow, StatusStore};

/// Organization accessor backed by the `organizations` table.
#[derive(Clone)]
pub struct PgOrganizationStore {
    pool: PgPool,
}

impl PgOrganizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgOrganizationStore {
    type Status = OrganizationStatus;

    async fn list_transitional(&self) -> Result<Vec<ResourceRow<OrganizationStatus>>> {
        let in_flight: Vec<String> = Organizations::in_flight()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows: Vec<(String, String, String, String)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, workflow_id, status, status_desc
            FROM organizations
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
        status: OrganizationStatus,
        status_desc: &str,
        workflow_ref: &str,
    ) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE organizations
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
            return Err(StoreError::not_found("organization", id));
        }

        debug!(organization_id = %id, status = %status, "Updated organization status");
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for PgOrganizationStore {
    async fn get(&self, id: &str) -> Result<OrganizationRecord> {
        let row: Option<(String, String, Option<Uuid>)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, primary_cluster_id, admin_id
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, primary_cluster_id, admin_id)| OrganizationRecord {
            id,
            primary_cluster_id,
            admin_id,
        })
        .ok_or_else(|| StoreError::not_found("organization", id))
    }

    async fn set_admin(&self, id: &str, admin_id: Uuid) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE organizations
            SET admin_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("organization", id));
        }

        debug!(organization_id = %id, admin_id = %admin_id, "Recorded organization admin");
        Ok(())
    }
}
