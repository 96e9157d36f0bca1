//! Grouping pending rules into per-organization rule sets.

use tracing::warn;
use uuid::Uuid;

use stratus_core::ruler::{RuleGroup, RulerRule};
use stratus_core::rules::PendingRule;

/// Everything needed to distribute one organization's rules: the target
/// cluster, the translated managed group, and the ids to mark applied on
/// success.
#[derive(Debug, Clone)]
pub struct OrgRuleSet {
    pub organization_id: String,
    pub primary_cluster_id: String,
    pub group: RuleGroup,
    pub rule_ids: Vec<Uuid>,
}

/// Groups pending rules by organization, keeping input order within each set.
///
/// The input must arrive grouped by organization, as the store returns it.
/// Rules whose organization has no resolvable primary cluster are dropped
/// with a log and stay pending.
pub fn aggregate(rules: &[PendingRule]) -> Vec<OrgRuleSet> {
    let mut sets: Vec<OrgRuleSet> = Vec::new();

    for rule in rules {
        if rule.primary_cluster_id.is_empty() {
            warn!(
                organization_id = %rule.organization_id,
                rule = %rule.name,
                "No primary cluster for organization, rule stays pending"
            );
            continue;
        }

        match sets.last_mut() {
            Some(set) if set.organization_id == rule.organization_id => {
                set.group.rules.push(RulerRule::from(rule));
                set.rule_ids.push(rule.id);
            }
            _ => {
                let mut group = RuleGroup::managed();
                group.rules.push(RulerRule::from(rule));
                sets.push(OrgRuleSet {
                    organization_id: rule.organization_id.clone(),
                    primary_cluster_id: rule.primary_cluster_id.clone(),
                    group,
                    rule_ids: vec![rule.id],
                });
            }
        }
    }

    sets
}
