//! Core domain model for the stratus reconciler.
//!
//! This crate holds everything that is pure data and pure logic: the per-kind
//! lifecycle status enums, the status transition tables driven by workflow run
//! phases, the notification-rule model, and the ruler configuration document
//! that gets distributed to each organization's monitoring stack. No I/O
//! happens here; the store, workflow, and cluster crates plug into these types.

pub mod ruler;
pub mod rules;
pub mod status;
pub mod transition;
pub mod workflow;

pub use ruler::{MANAGED_GROUP, RuleAnnotations, RuleGroup, RuleLabels, RulerDocument, RulerRule};
pub use rules::{ConditionParameter, MetricParameter, PendingRule, RuleStatus};
pub use status::{
    AppGroupStatus, CloudAccountStatus, ClusterStatus, InvalidStatus, OrganizationStatus,
    StackStatus,
};
pub use transition::{
    AppGroups, CloudAccounts, Clusters, EmptyRunPolicy, Organizations, ReconcileKind, Stacks,
    TransitionTable,
};
pub use workflow::{WorkflowPhase, WorkflowSnapshot};
