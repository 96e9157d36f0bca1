//! Notification rule model and the pure pieces of rule-to-config translation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a notification rule with respect to distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "APPLIED")]
    Applied,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Applied => "APPLIED",
        }
    }
}

/// One comparison attached to a rule's condition.
///
/// Only single-parameter conditions are supported by the config translation;
/// rules with more parameters keep their bare metric query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionParameter {
    #[serde(default)]
    pub order: i32,
    pub operator: String,
    pub value: String,
}

/// A named metric parameter declared by the rule's template, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricParameter {
    #[serde(default)]
    pub order: i32,
    pub key: String,
    pub value: String,
}

/// A pending rule joined with its organization's monitoring target.
///
/// This is the shape the store hands the aggregator: everything needed to
/// build one config record without further lookups.
#[derive(Debug, Clone)]
pub struct PendingRule {
    pub id: Uuid,
    pub organization_id: String,
    /// The organization's primary cluster, where its monitoring stack runs.
    pub primary_cluster_id: String,
    pub name: String,
    pub severity: String,
    pub duration: String,
    pub parameters: Vec<ConditionParameter>,
    pub metric_query: String,
    pub metric_parameters: Vec<MetricParameter>,
    pub message_title: String,
    pub message_content: String,
    pub message_action_proposal: String,
}

/// Substitutes every `<<key>>` placeholder with `{{value}}`.
///
/// The `{{...}}` form is hand-off syntax for the downstream templating engine;
/// nothing is evaluated here. Placeholders without a matching parameter are
/// left untouched.
pub fn render_template(parameters: &[MetricParameter], template: &str) -> String {
    let mut out = template.to_string();
    for parameter in parameters {
        let needle = format!("<<{}>>", parameter.key);
        let replacement = format!("{{{{{}}}}}", parameter.value);
        out = out.replace(&needle, &replacement);
    }
    out
}

/// Joins the metric parameter values in declared order with `", "`.
pub fn discriminative(parameters: &[MetricParameter]) -> String {
    parameters
        .iter()
        .map(|p| p.value.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the alert expression from the metric query and the condition.
///
/// A single-parameter condition renders `<query> <operator> <value>`. Anything
/// else is unsupported; the comparison is omitted and a warning logged so the
/// rule still lands in the document in a recognizable form.
pub fn build_expression(rule_name: &str, query: &str, parameters: &[ConditionParameter]) -> String {
    match parameters {
        [only] => format!("{} {} {}", query, only.operator, only.value),
        _ => {
            tracing::warn!(
                rule = %rule_name,
                parameter_count = parameters.len(),
                "only single-parameter conditions are supported, omitting comparison"
            );
            query.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<MetricParameter> {
        vec![
            MetricParameter {
                order: 0,
                key: "STRATUS_CLUSTER".into(),
                value: "$labels.taco_cluster".into(),
            },
            MetricParameter {
                order: 1,
                key: "INSTANCE".into(),
                value: "$labels.instance".into(),
            },
        ]
    }

    #[test]
    fn placeholders_are_substituted() {
        let rendered = render_template(
            &params(),
            "node <<INSTANCE>> of <<STRATUS_CLUSTER>> is degraded",
        );
        assert_eq!(
            rendered,
            "node {{$labels.instance}} of {{$labels.taco_cluster}} is degraded"
        );
    }

    #[test]
    fn repeated_placeholder_replaced_everywhere() {
        let rendered = render_template(&params(), "<<INSTANCE>> / <<INSTANCE>>");
        assert_eq!(rendered, "{{$labels.instance}} / {{$labels.instance}}");
    }

    #[test]
    fn unmatched_placeholder_left_alone() {
        let rendered = render_template(&params(), "check <<NODE_NAME>>");
        assert_eq!(rendered, "check <<NODE_NAME>>");
    }

    #[test]
    fn discriminative_joins_in_declared_order() {
        assert_eq!(
            discriminative(&params()),
            "$labels.taco_cluster, $labels.instance"
        );
        assert_eq!(discriminative(&[]), "");
    }

    #[test]
    fn single_parameter_expression() {
        let expr = build_expression(
            "node-cpu-high-load",
            "avg(cpu_usage)",
            &[ConditionParameter {
                order: 0,
                operator: ">".into(),
                value: "0.9".into(),
            }],
        );
        assert_eq!(expr, "avg(cpu_usage) > 0.9");
    }

    #[test]
    fn multi_parameter_condition_keeps_bare_query() {
        let parameters = vec![
            ConditionParameter {
                order: 0,
                operator: ">".into(),
                value: "0.9".into(),
            },
            ConditionParameter {
                order: 1,
                operator: "<".into(),
                value: "0.1".into(),
            },
        ];
        let expr = build_expression("odd-rule", "avg(cpu_usage)", &parameters);
        assert_eq!(expr, "avg(cpu_usage)");
    }
}
