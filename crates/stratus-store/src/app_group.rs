//! PostgreSQL accessor for application groups.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::debug;

use stratus_core::transition::{AppGroups, ReconcileKind};
use stratus_core::AppGroupStatus;

use crate::error::{Result, StoreError};
use crate::traits::{ResourceRow, StatusStore};

/// Application group accessor backed by the `app_groups` table.
#[derive(Clone)]
pub struct PgAppGroupStore {
    pool: PgPool,
}

impl PgAppGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgAppGroupStore {
    type Status = AppGroupStatus;

    async fn list_transitional(&self) -> Result<Vec<ResourceRow<AppGroupStatus>>> {
        let in_flight: Vec<String> = AppGroups::in_flight()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows: Vec<(String, String, String, String)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, workflow_id, status, status_desc
            FROM app_groups
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
        status: AppGroupStatus,
        status_desc: &str,
        workflow_ref: &str,
    ) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE app_groups
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
            return Err(StoreError::not_found("app_group", id));
        }

        debug!(app_group_id = %id, status = %status, "Updated app group status");
        Ok(())
    }
}
