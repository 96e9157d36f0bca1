//! PostgreSQL accessor for cloud accounts.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::debug;

use stratus_core::transition::{CloudAccounts, ReconcileKind};
use stratus_core::CloudAccountStatus;

use crate::error::{Result, StoreError};
use crate::traits::{CloudAccountStore, ResourceRow, StatusStore};

/// Cloud account accessor backed by the `cloud_accounts` table.
#[derive(Clone)]
pub struct PgCloudAccountStore {
    pool: PgPool,
}

impl PgCloudAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgCloudAccountStore {
    type Status = CloudAccountStatus;

    async fn list_transitional(&self) -> Result<Vec<ResourceRow<CloudAccountStatus>>> {
        let in_flight: Vec<String> = CloudAccounts::in_flight()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows: Vec<(String, String, String, String)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, workflow_id, status, status_desc
            FROM cloud_accounts
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
        status: CloudAccountStatus,
        status_desc: &str,
        workflow_ref: &str,
    ) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE cloud_accounts
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
            return Err(StoreError::not_found("cloud_account", id));
        }

        debug!(cloud_account_id = %id, status = %status, "Updated cloud account status");
        Ok(())
    }
}

#[async_trait]
impl CloudAccountStore for PgCloudAccountStore {
    async fn set_iam_created(&self, id: &str, created: bool) -> Result<()> {
        let result = sqlx_core::query::query(
            r#"
            UPDATE cloud_accounts
            SET created_iam = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(created)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cloud_account", id));
        }

        debug!(cloud_account_id = %id, created_iam = created, "Updated IAM flag");
        Ok(())
    }
}
