//! The ruler configuration document distributed to each monitoring stack.
//!
//! The document is owned by the monitoring stack; we own exactly one named
//! group inside it. Parsing keeps every top-level key we do not model so a
//! write-back never drops foreign content.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rules::{self, PendingRule};

/// Name of the rule group this system owns inside the document.
pub const MANAGED_GROUP: &str = "stratus";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLabels {
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAnnotations {
    #[serde(rename = "CheckPoint")]
    pub check_point: String,
    pub description: String,
    pub discriminative: String,
    pub message: String,
}

/// One translated alerting-rule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulerRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for")]
    pub duration: String,
    pub labels: RuleLabels,
    pub annotations: RuleAnnotations,
}

impl From<&PendingRule> for RulerRule {
    fn from(rule: &PendingRule) -> Self {
        Self {
            alert: rule.name.clone(),
            expr: rules::build_expression(&rule.name, &rule.metric_query, &rule.parameters),
            duration: rule.duration.clone(),
            labels: RuleLabels {
                severity: rule.severity.clone(),
            },
            annotations: RuleAnnotations {
                check_point: rules::render_template(
                    &rule.metric_parameters,
                    &rule.message_action_proposal,
                ),
                description: rules::render_template(&rule.metric_parameters, &rule.message_content),
                discriminative: rules::discriminative(&rule.metric_parameters),
                message: rules::render_template(&rule.metric_parameters, &rule.message_title),
            },
        }
    }
}

/// An ordered, named collection of rule records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<RulerRule>,
}

impl RuleGroup {
    /// An empty managed group.
    pub fn managed() -> Self {
        Self {
            name: MANAGED_GROUP.to_string(),
            rules: Vec::new(),
        }
    }
}

/// The full ruler document.
///
/// `extra` captures any top-level content the monitoring stack put there; it
/// round-trips untouched through parse and serialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulerDocument {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RulerDocument {
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Replaces the managed group in place, preserving every other group and
    /// all foreign top-level content.
    pub fn replace_managed_group(&mut self, group: RuleGroup) {
        self.groups.retain(|g| g.name != group.name);
        self.groups.push(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule(alert: &str) -> RulerRule {
        RulerRule {
            alert: alert.into(),
            expr: "up == 0".into(),
            duration: "3m".into(),
            labels: RuleLabels {
                severity: "critical".into(),
            },
            annotations: RuleAnnotations {
                check_point: "check".into(),
                description: "desc".into(),
                discriminative: "$labels.instance".into(),
                message: "msg".into(),
            },
        }
    }

    #[test]
    fn replace_keeps_foreign_groups_and_keys() {
        let yaml = r#"
groups:
  - name: upstream
    rules:
      - alert: UpstreamDown
        expr: up == 0
        for: 1m
        labels:
          severity: warning
        annotations:
          CheckPoint: cp
          description: d
          discriminative: x
          message: m
  - name: stratus
    rules: []
evaluation_interval: 30s
"#;
        let mut doc = RulerDocument::parse(yaml).unwrap();
        assert_eq!(doc.groups.len(), 2);

        let mut managed = RuleGroup::managed();
        managed.rules.push(sample_rule("NodeDown"));
        doc.replace_managed_group(managed);

        assert_eq!(doc.groups.len(), 2);
        assert!(doc.groups.iter().any(|g| g.name == "upstream"));
        let stratus = doc.groups.iter().find(|g| g.name == "stratus").unwrap();
        assert_eq!(stratus.rules.len(), 1);

        let out = doc.to_yaml().unwrap();
        assert!(out.contains("evaluation_interval"));
        assert!(out.contains("UpstreamDown"));
        assert!(out.contains("NodeDown"));
    }

    #[test]
    fn empty_document_parses_to_default() {
        let doc = RulerDocument::parse("").unwrap();
        assert!(doc.groups.is_empty());
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn duration_serializes_as_for() {
        let mut doc = RulerDocument::default();
        let mut group = RuleGroup::managed();
        group.rules.push(sample_rule("A"));
        doc.replace_managed_group(group);

        let out = doc.to_yaml().unwrap();
        assert!(out.contains("for: 3m"));
        assert!(out.contains("CheckPoint: check"));
    }

    #[test]
    fn round_trip_preserves_rule_order() {
        let mut group = RuleGroup::managed();
        group.rules.push(sample_rule("first"));
        group.rules.push(sample_rule("second"));
        let mut doc = RulerDocument::default();
        doc.replace_managed_group(group);

        let parsed = RulerDocument::parse(&doc.to_yaml().unwrap()).unwrap();
        let rules: Vec<_> = parsed.groups[0].rules.iter().map(|r| &r.alert).collect();
        assert_eq!(rules, ["first", "second"]);
    }
}
