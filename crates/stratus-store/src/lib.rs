//! PostgreSQL store adapters for the stratus reconciler.
//!
//! One accessor per resource kind, each behind an async trait so the
//! reconcile loop and the rule distributor can be exercised against fakes.
//! The implementations are thin: "list rows in a transitional status" and
//! "update status fields", in last-writer-wins style. A write that affects
//! zero rows surfaces as [`StoreError::NotFound`] and is never fatal to a
//! cycle.

pub mod app_group;
pub mod cloud_account;
pub mod cluster;
pub mod config;
pub mod error;
pub mod notification_rule;
pub mod organization;
pub mod pool;
pub mod stack;
pub mod traits;
pub mod user;

pub use app_group::PgAppGroupStore;
pub use cloud_account::PgCloudAccountStore;
pub use cluster::PgClusterStore;
pub use config::PostgresConfig;
pub use error::{Result, StoreError};
pub use notification_rule::PgNotificationRuleStore;
pub use organization::PgOrganizationStore;
pub use pool::create_pool;
pub use stack::PgStackStore;
pub use traits::{
    ByohCluster, CloudAccountStore, ClusterStore, NotificationRuleStore, OrganizationRecord,
    OrganizationStore, ResourceRow, StatusStore, UserRecord, UserStore,
};
pub use user::PgUserStore;
