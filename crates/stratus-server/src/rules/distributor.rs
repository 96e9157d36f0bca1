//! Writing rule sets to each organization's monitoring stack.

use std::sync::Arc;

use tracing::{error, info};

use stratus_cluster::ruler::{MONITORING_NAMESPACE, RULER_CONFIG_KEY, RULER_CONFIGMAP, RULER_POD};
use stratus_cluster::{ClusterApiError, ClusterConfigApi, Propagation, RulerLocator};
use stratus_core::RulerDocument;
use stratus_store::{NotificationRuleStore, StoreError};

use super::aggregator::{OrgRuleSet, aggregate};

#[derive(Debug, thiserror::Error)]
pub enum DistributeError {
    #[error(transparent)]
    Cluster(#[from] ClusterApiError),

    #[error("ruler document error: {0}")]
    Document(#[from] serde_yaml::Error),
}

/// Counters for one distribution pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Pending rules at the start of the pass.
    pub pending: usize,
    /// Organizations a distribution was attempted for.
    pub organizations: usize,
    /// Rules marked applied.
    pub applied: usize,
    /// Organizations whose distribution failed; their rules stay pending.
    pub failed_organizations: usize,
}

/// Pushes pending alerting rules into the per-organization ruler config.
pub struct RuleDistributor<R: NotificationRuleStore> {
    rules: Arc<R>,
    cluster_api: Arc<dyn ClusterConfigApi>,
    locator: Arc<RulerLocator>,
    propagation: Propagation,
}

impl<R: NotificationRuleStore> RuleDistributor<R> {
    pub fn new(
        rules: Arc<R>,
        cluster_api: Arc<dyn ClusterConfigApi>,
        locator: Arc<RulerLocator>,
        propagation: Propagation,
    ) -> Self {
        Self {
            rules,
            cluster_api,
            locator,
            propagation,
        }
    }

    /// Runs one distribution pass.
    ///
    /// Organizations are independent: a failure in one never blocks the
    /// others, and rules are only marked applied per organization after its
    /// whole write-and-propagate sequence succeeded.
    ///
    /// # Errors
    ///
    /// Only the initial pending listing can fail the pass.
    pub async fn run_once(&self) -> Result<DistributionOutcome, StoreError> {
        let pending = self.rules.list_pending().await?;
        let mut outcome = DistributionOutcome {
            pending: pending.len(),
            ..DistributionOutcome::default()
        };
        if pending.is_empty() {
            return Ok(outcome);
        }

        for set in aggregate(&pending) {
            outcome.organizations += 1;

            if let Err(err) = self.distribute(&set).await {
                error!(
                    organization_id = %set.organization_id,
                    cluster_id = %set.primary_cluster_id,
                    error = %err,
                    "Rule distribution failed, rules stay pending"
                );
                outcome.failed_organizations += 1;
                continue;
            }

            match self.rules.mark_applied(&set.rule_ids).await {
                Ok(()) => {
                    outcome.applied += set.rule_ids.len();
                    info!(
                        organization_id = %set.organization_id,
                        rules = set.rule_ids.len(),
                        "Alerting rules applied"
                    );
                }
                Err(err) => {
                    // The config landed but the bookkeeping did not; the next
                    // cycle redistributes the same content, which is harmless.
                    error!(
                        organization_id = %set.organization_id,
                        error = %err,
                        "Could not mark rules applied"
                    );
                    outcome.failed_organizations += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn distribute(&self, set: &OrgRuleSet) -> Result<(), DistributeError> {
        let cluster_id = &set.primary_cluster_id;

        let mut config_map = self
            .cluster_api
            .get_config_map(cluster_id, MONITORING_NAMESPACE, RULER_CONFIGMAP)
            .await?;

        let current = config_map
            .data
            .get(RULER_CONFIG_KEY)
            .map(String::as_str)
            .unwrap_or_default();
        let mut document = RulerDocument::parse(current)?;
        document.replace_managed_group(set.group.clone());
        config_map
            .data
            .insert(RULER_CONFIG_KEY.to_string(), document.to_yaml()?);

        self.cluster_api
            .update_config_map(cluster_id, MONITORING_NAMESPACE, RULER_CONFIGMAP, &config_map)
            .await?;

        match self.propagation {
            Propagation::RestartPod => {
                self.cluster_api
                    .delete_pod(cluster_id, MONITORING_NAMESPACE, RULER_POD)
                    .await?;
            }
            Propagation::Reload => {
                let url = self.locator.ruler_url(cluster_id).await?;
                self.locator.reload(&url).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use stratus_cluster::ruler::RULER_SECRET_KEY;
    use stratus_cluster::{ConfigMap, Secret, Service};
    use stratus_core::rules::PendingRule;
    use stratus_store::Result as StoreResult;

    use super::*;

    struct FakeRules {
        pending: Vec<PendingRule>,
        applied: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl NotificationRuleStore for FakeRules {
        async fn list_pending(&self) -> StoreResult<Vec<PendingRule>> {
            Ok(self.pending.clone())
        }

        async fn mark_applied(&self, ids: &[Uuid]) -> StoreResult<()> {
            self.applied.lock().unwrap().extend_from_slice(ids);
            Ok(())
        }
    }

    /// Cluster API fake serving one config map per cluster and recording
    /// writes and pod deletions.
    #[derive(Default)]
    struct FakeClusterApi {
        config_maps: Mutex<BTreeMap<String, ConfigMap>>,
        secrets: BTreeMap<String, Secret>,
        deleted_pods: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ClusterConfigApi for FakeClusterApi {
        async fn get_config_map(
            &self,
            cluster_id: &str,
            namespace: &str,
            name: &str,
        ) -> Result<ConfigMap, ClusterApiError> {
            self.config_maps
                .lock()
                .unwrap()
                .get(cluster_id)
                .cloned()
                .ok_or_else(|| ClusterApiError::not_found("configmap", namespace, name))
        }

        async fn update_config_map(
            &self,
            cluster_id: &str,
            _namespace: &str,
            _name: &str,
            config_map: &ConfigMap,
        ) -> Result<(), ClusterApiError> {
            self.config_maps
                .lock()
                .unwrap()
                .insert(cluster_id.to_string(), config_map.clone());
            Ok(())
        }

        async fn delete_pod(
            &self,
            cluster_id: &str,
            _namespace: &str,
            name: &str,
        ) -> Result<(), ClusterApiError> {
            self.deleted_pods
                .lock()
                .unwrap()
                .push((cluster_id.to_string(), name.to_string()));
            Ok(())
        }

        async fn get_secret(
            &self,
            _cluster_id: &str,
            namespace: &str,
            name: &str,
        ) -> Result<Secret, ClusterApiError> {
            self.secrets
                .get(namespace)
                .cloned()
                .ok_or_else(|| ClusterApiError::not_found("secret", namespace, name))
        }

        async fn get_service(
            &self,
            cluster_id: &str,
            _namespace: &str,
            _name: &str,
        ) -> Result<Service, ClusterApiError> {
            Err(ClusterApiError::endpoint_unresolved(cluster_id, "no service"))
        }
    }

    fn pending(organization_id: &str, primary: &str, name: &str) -> PendingRule {
        PendingRule {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            primary_cluster_id: primary.into(),
            name: name.into(),
            severity: "critical".into(),
            duration: "3m".into(),
            parameters: vec![],
            metric_query: "up == 0".into(),
            metric_parameters: vec![],
            message_title: "t".into(),
            message_content: "c".into(),
            message_action_proposal: "a".into(),
        }
    }

    fn seeded_config_map() -> ConfigMap {
        ConfigMap {
            data: BTreeMap::from([(
                RULER_CONFIG_KEY.to_string(),
                "groups: []\nevaluation_interval: 30s\n".to_string(),
            )]),
        }
    }

    fn distributor(
        rules: Arc<FakeRules>,
        api: Arc<FakeClusterApi>,
        propagation: Propagation,
    ) -> RuleDistributor<FakeRules> {
        let locator =
            RulerLocator::new(api.clone(), "c-admin", Duration::from_secs(1)).unwrap();
        RuleDistributor::new(rules, api, Arc::new(locator), propagation)
    }

    #[tokio::test]
    async fn one_write_per_organization_then_marked_applied() {
        let rules = Arc::new(FakeRules {
            pending: vec![
                pending("o-1", "c-1", "node-down"),
                pending("o-1", "c-1", "cpu-high"),
            ],
            applied: Mutex::new(Vec::new()),
        });
        let api = Arc::new(FakeClusterApi {
            config_maps: Mutex::new(BTreeMap::from([("c-1".to_string(), seeded_config_map())])),
            ..FakeClusterApi::default()
        });

        let outcome = distributor(rules.clone(), api.clone(), Propagation::RestartPod)
            .run_once()
            .await
            .unwrap();

        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.failed_organizations, 0);

        let written = api.config_maps.lock().unwrap()["c-1"].data[RULER_CONFIG_KEY].clone();
        let document = RulerDocument::parse(&written).unwrap();
        let managed = document
            .groups
            .iter()
            .find(|g| g.name == stratus_core::MANAGED_GROUP)
            .unwrap();
        let alerts: Vec<_> = managed.rules.iter().map(|r| r.alert.as_str()).collect();
        assert_eq!(alerts, ["node-down", "cpu-high"]);
        // Foreign document content survives the write.
        assert!(written.contains("evaluation_interval"));

        assert_eq!(rules.applied.lock().unwrap().len(), 2);
        assert_eq!(
            *api.deleted_pods.lock().unwrap(),
            vec![("c-1".to_string(), RULER_POD.to_string())]
        );
    }

    #[tokio::test]
    async fn missing_config_map_leaves_rules_pending() {
        let rules = Arc::new(FakeRules {
            pending: vec![pending("o-1", "c-1", "node-down")],
            applied: Mutex::new(Vec::new()),
        });
        let api = Arc::new(FakeClusterApi::default());

        let outcome = distributor(rules.clone(), api, Propagation::RestartPod)
            .run_once()
            .await
            .unwrap();

        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failed_organizations, 1);
        assert!(rules.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_organization_does_not_block_the_next() {
        let rules = Arc::new(FakeRules {
            pending: vec![
                pending("o-broken", "c-broken", "r1"),
                pending("o-2", "c-2", "r2"),
            ],
            applied: Mutex::new(Vec::new()),
        });
        let api = Arc::new(FakeClusterApi {
            config_maps: Mutex::new(BTreeMap::from([("c-2".to_string(), seeded_config_map())])),
            ..FakeClusterApi::default()
        });

        let outcome = distributor(rules.clone(), api, Propagation::RestartPod)
            .run_once()
            .await
            .unwrap();

        assert_eq!(outcome.organizations, 2);
        assert_eq!(outcome.failed_organizations, 1);
        assert_eq!(outcome.applied, 1);
        assert_eq!(*rules.applied.lock().unwrap(), vec![rules.pending[1].id]);
    }

    #[tokio::test]
    async fn reload_propagation_hits_the_resolved_ruler() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/-/reload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ruler_address = server.uri().trim_start_matches("http://").to_string();
        let rules = Arc::new(FakeRules {
            pending: vec![pending("o-1", "c-1", "node-down")],
            applied: Mutex::new(Vec::new()),
        });
        let api = Arc::new(FakeClusterApi {
            config_maps: Mutex::new(BTreeMap::from([("c-1".to_string(), seeded_config_map())])),
            // Endpoint secret lives on the admin cluster, in a namespace named
            // after the primary cluster.
            secrets: BTreeMap::from([(
                "c-1".to_string(),
                Secret {
                    data: BTreeMap::from([(RULER_SECRET_KEY.to_string(), ruler_address)]),
                },
            )]),
            ..FakeClusterApi::default()
        });

        let outcome = distributor(rules.clone(), api.clone(), Propagation::Reload)
            .run_once()
            .await
            .unwrap();

        assert_eq!(outcome.applied, 1);
        assert!(api.deleted_pods.lock().unwrap().is_empty());
    }
}
