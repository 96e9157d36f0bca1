//! PostgreSQL accessor for system notification rules.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::debug;
use uuid::Uuid;

use stratus_core::rules::{ConditionParameter, MetricParameter, PendingRule, RuleStatus};
use stratus_core::{AppGroupStatus, ClusterStatus};

use crate::error::{Result, StoreError};
use crate::traits::NotificationRuleStore;

/// Notification rule accessor.
///
/// `list_pending` joins rules with their condition, their metric template, and
/// the owning organization's primary cluster. Only organizations whose primary
/// cluster and monitoring app group are RUNNING are eligible; distribution to
/// anything else would fail anyway.
#[derive(Clone)]
pub struct PgNotificationRuleStore {
    pool: PgPool,
}

impl PgNotificationRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type PendingRuleRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    serde_json::Value,
    String,
    serde_json::Value,
    String,
    String,
    String,
);

#[async_trait]
impl NotificationRuleStore for PgNotificationRuleStore {
    async fn list_pending(&self) -> Result<Vec<PendingRule>> {
        let rows: Vec<PendingRuleRow> = sqlx_core::query_as::query_as(
            r#"
            SELECT r.id, r.organization_id, o.primary_cluster_id, r.name,
                   c.severity, c.duration, c.parameters,
                   t.metric_query,
                   COALESCE(mp.parameters, '[]'::jsonb),
                   r.message_title, r.message_content, r.message_action_proposal
            FROM system_notification_rules r
            JOIN organizations o ON o.id = r.organization_id
            JOIN clusters cl ON cl.id = o.primary_cluster_id AND cl.status = $2
            JOIN system_notification_conditions c ON c.rule_id = r.id
            JOIN system_notification_templates t ON t.id = r.template_id
            LEFT JOIN LATERAL (
                SELECT jsonb_agg(
                           jsonb_build_object('order', p.ord, 'key', p.key, 'value', p.value)
                           ORDER BY p.ord
                       ) AS parameters
                FROM system_notification_metric_parameters p
                WHERE p.template_id = t.id
            ) mp ON true
            WHERE r.status = $1
              AND EXISTS (
                  SELECT 1 FROM app_groups ag
                  WHERE ag.cluster_id = cl.id AND ag.status = $3
              )
            ORDER BY r.organization_id, r.id
            "#,
        )
        .bind(RuleStatus::Pending.as_str())
        .bind(ClusterStatus::Running.as_str())
        .bind(AppGroupStatus::Running.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(
                    id,
                    organization_id,
                    primary_cluster_id,
                    name,
                    severity,
                    duration,
                    parameters,
                    metric_query,
                    metric_parameters,
                    message_title,
                    message_content,
                    message_action_proposal,
                )| {
                    let parameters: Vec<ConditionParameter> = serde_json::from_value(parameters)
                        .map_err(|e| {
                            StoreError::decode(format!("rule {id} condition parameters: {e}"))
                        })?;
                    let metric_parameters: Vec<MetricParameter> =
                        serde_json::from_value(metric_parameters).map_err(|e| {
                            StoreError::decode(format!("rule {id} metric parameters: {e}"))
                        })?;

                    Ok(PendingRule {
                        id,
                        organization_id,
                        primary_cluster_id,
                        name,
                        severity,
                        duration,
                        parameters,
                        metric_query,
                        metric_parameters,
                        message_title,
                        message_content,
                        message_action_proposal,
                    })
                },
            )
            .collect()
    }

    async fn mark_applied(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let result = sqlx_core::query::query(
            r#"
            UPDATE system_notification_rules
            SET status = $2, updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .bind(RuleStatus::Applied.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("system_notification_rule", format!("{ids:?}")));
        }

        debug!(count = result.rows_affected(), "Marked notification rules applied");
        Ok(())
    }
}
