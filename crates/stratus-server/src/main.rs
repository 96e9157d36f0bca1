use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use stratus_cluster::{ClusterConfigApi, RestClusterApi, RulerLocator};
use stratus_core::{AppGroups, CloudAccounts, Clusters, Organizations, Stacks};
use stratus_server::bootstrap::BootstrapWatcher;
use stratus_server::config::loader::load_config;
use stratus_server::observability;
use stratus_server::platform::{PlatformApi, RestPlatformApi};
use stratus_server::reconcile::{CloudAccountIamHook, OrganizationAdminHook, Reconciler};
use stratus_server::rules::RuleDistributor;
use stratus_server::scheduler::ControlLoop;
use stratus_store::{
    PgAppGroupStore, PgCloudAccountStore, PgClusterStore, PgNotificationRuleStore,
    PgOrganizationStore, PgStackStore, PgUserStore,
};
use stratus_workflow::{ArgoWorkflowClient, WorkflowStatusSource};

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let config_path = std::env::var("STRATUS_CONFIG").unwrap_or_else(|_| "stratus.toml".into());
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);
    info!(path = %config_path, "Configuration loaded");

    let pool = match stratus_store::create_pool(&cfg.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Database connection failed: {e}");
            std::process::exit(2);
        }
    };

    let workflows: Arc<dyn WorkflowStatusSource> = match ArgoWorkflowClient::new(&cfg.workflow) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Workflow client initialization failed: {e}");
            std::process::exit(2);
        }
    };
    let namespace = cfg.workflow.namespace.clone();

    let cluster_api: Arc<dyn ClusterConfigApi> = match RestClusterApi::new(
        cfg.clusters.endpoints.clone(),
        Duration::from_millis(cfg.clusters.api_timeout_ms),
    ) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Cluster API client initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let locator = match RulerLocator::new(
        cluster_api.clone(),
        cfg.clusters.admin.clone(),
        Duration::from_millis(cfg.clusters.api_timeout_ms),
    ) {
        Ok(l) => Arc::new(l),
        Err(e) => {
            eprintln!("Ruler locator initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let platform: Arc<dyn PlatformApi> = match RestPlatformApi::new(&cfg.platform) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Platform API client initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let clusters = Arc::new(PgClusterStore::new(pool.clone()));
    let app_groups = Arc::new(PgAppGroupStore::new(pool.clone()));
    let cloud_accounts = Arc::new(PgCloudAccountStore::new(pool.clone()));
    let organizations = Arc::new(PgOrganizationStore::new(pool.clone()));
    let stacks = Arc::new(PgStackStore::new(pool.clone()));
    let users = Arc::new(PgUserStore::new(pool.clone()));
    let notification_rules = Arc::new(PgNotificationRuleStore::new(pool));

    let mut control = ControlLoop::new(Duration::from_secs(cfg.scheduler.interval_secs));
    control.register(Arc::new(Reconciler::<Clusters, _>::new(
        clusters.clone(),
        workflows.clone(),
        namespace.clone(),
    )));
    control.register(Arc::new(Reconciler::<AppGroups, _>::new(
        app_groups,
        workflows.clone(),
        namespace.clone(),
    )));
    control.register(Arc::new(
        Reconciler::<CloudAccounts, _>::new(
            cloud_accounts.clone(),
            workflows.clone(),
            namespace.clone(),
        )
        .with_hook(Arc::new(CloudAccountIamHook::new(cloud_accounts))),
    ));
    control.register(Arc::new(
        Reconciler::<Organizations, _>::new(
            organizations.clone(),
            workflows.clone(),
            namespace.clone(),
        )
        .with_hook(Arc::new(OrganizationAdminHook::new(organizations, users))),
    ));
    control.register(Arc::new(Reconciler::<Stacks, _>::new(
        stacks, workflows, namespace,
    )));
    control.register(Arc::new(BootstrapWatcher::new(clusters, platform)));
    control.register(Arc::new(RuleDistributor::new(
        notification_rules,
        cluster_api,
        locator,
        cfg.rules.propagation,
    )));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    control.run(shutdown_rx).await;
    info!("Stopped");
}
