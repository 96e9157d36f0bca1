//! Store traits.
//!
//! Every collaborator the reconcile loop and the rule distributor touch is
//! behind one of these traits, constructed with its pool at startup and
//! swapped for an in-memory fake in tests.

use async_trait::async_trait;
use uuid::Uuid;

use stratus_core::rules::PendingRule;

use crate::error::Result;

/// One transitional resource as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow<S> {
    pub id: String,
    /// Reference to the in-flight workflow run; empty when none is attached.
    pub workflow_ref: String,
    pub status: S,
    pub status_desc: String,
}

/// Generic per-kind status store: select in-flight rows, write status fields.
///
/// `update_status` is unconditional (last-writer-wins); callers only invoke it
/// when the translated status or description differs from the stored values,
/// which keeps repeated cycles idempotent.
#[async_trait]
pub trait StatusStore: Send + Sync {
    type Status: Copy + Send + Sync + 'static;

    /// Lists rows whose status is in the kind's in-flight set.
    async fn list_transitional(&self) -> Result<Vec<ResourceRow<Self::Status>>>;

    /// Updates status, description, and workflow reference for one row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] when zero rows were affected.
    async fn update_status(
        &self,
        id: &str,
        status: Self::Status,
        status_desc: &str,
        workflow_ref: &str,
    ) -> Result<()>;
}

/// A BYOH cluster waiting for its agent nodes to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByohCluster {
    pub id: String,
    pub organization_id: String,
    /// True when the cluster was created as part of a stack; installation
    /// then goes through the stack endpoint.
    pub is_stack: bool,
}

/// Cluster store: the generic status contract plus the bootstrap listing.
#[async_trait]
pub trait ClusterStore: StatusStore<Status = stratus_core::ClusterStatus> {
    /// Lists BYOH clusters that finished bootstrapping and await installation.
    async fn list_bootstrapped_byoh(&self) -> Result<Vec<ByohCluster>>;
}

/// Cloud account store: status contract plus the IAM flag side effect.
#[async_trait]
pub trait CloudAccountStore: StatusStore<Status = stratus_core::CloudAccountStatus> {
    /// Marks whether the account's IAM role has been created.
    async fn set_iam_created(&self, id: &str, created: bool) -> Result<()>;
}

/// A single organization row, as needed by side effects and rule distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    pub id: String,
    pub primary_cluster_id: String,
    pub admin_id: Option<Uuid>,
}

/// Organization store: status contract plus lookup and admin propagation.
#[async_trait]
pub trait OrganizationStore: StatusStore<Status = stratus_core::OrganizationStatus> {
    async fn get(&self, id: &str) -> Result<OrganizationRecord>;

    /// Records the organization's admin user after creation completes.
    async fn set_admin(&self, id: &str, admin_id: Uuid) -> Result<()>;
}

/// A user row, reduced to what admin propagation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub account_id: String,
}

/// Read-only user lookups.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// The first admin user of an organization, if any exists yet.
    async fn organization_admin(&self, organization_id: &str) -> Result<Option<UserRecord>>;
}

/// Notification rule store.
#[async_trait]
pub trait NotificationRuleStore: Send + Sync {
    /// All pending rules whose organization has a running monitoring target,
    /// joined with everything the aggregator needs, ordered by organization.
    async fn list_pending(&self) -> Result<Vec<PendingRule>>;

    /// Marks the given rules applied after a successful distribution.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] when zero rows were affected.
    async fn mark_applied(&self, ids: &[Uuid]) -> Result<()>;
}
