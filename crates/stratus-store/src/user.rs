//! PostgreSQL accessor for users.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::{UserRecord, UserStore};

/// User accessor backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn organization_admin(&self, organization_id: &str) -> Result<Option<UserRecord>> {
        let row: Option<(Uuid, String)> = sqlx_core::query_as::query_as(
            r#"
            SELECT id, account_id
            FROM users
            WHERE organization_id = $1 AND role = 'admin'
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, account_id)| UserRecord { id, account_id }))
    }
}
