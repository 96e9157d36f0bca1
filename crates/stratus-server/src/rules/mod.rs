//! Alerting-rule distribution.
//!
//! Pending rules are grouped per organization, translated into the managed
//! rule group, written into the ruler config map on the organization's
//! primary cluster, and only marked applied after the running ruler has been
//! told to pick them up. A failure anywhere leaves the whole organization's
//! rules pending for the next cycle.

pub mod aggregator;
pub mod distributor;

pub use aggregator::{OrgRuleSet, aggregate};
pub use distributor::{DistributionOutcome, RuleDistributor};
