//! The fixed-interval control loop.
//!
//! Every cycle runs each registered task once, sequentially and in
//! registration order. Tasks are independent: a failing one is logged and the
//! rest of the cycle continues. Shutdown is only observed between cycles, so
//! an in-flight cycle always completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info};

use stratus_core::ReconcileKind;
use stratus_store::{ClusterStore, NotificationRuleStore, StatusStore};

use crate::bootstrap::BootstrapWatcher;
use crate::reconcile::Reconciler;
use crate::rules::RuleDistributor;

/// One unit of work the control loop runs every cycle.
#[async_trait]
pub trait CycleTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<K, S> CycleTask for Reconciler<K, S>
where
    K: ReconcileKind + 'static,
    S: StatusStore<Status = K::Status> + 'static,
{
    fn name(&self) -> &'static str {
        K::NAME
    }

    async fn run(&self) -> anyhow::Result<()> {
        let outcome = self.run_once().await?;
        if outcome.examined > 0 {
            debug!(
                kind = K::NAME,
                examined = outcome.examined,
                updated = outcome.updated,
                failed = outcome.failed,
                "Reconcile pass finished"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<C: ClusterStore + 'static> CycleTask for BootstrapWatcher<C> {
    fn name(&self) -> &'static str {
        "bootstrap"
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.run_once().await?;
        Ok(())
    }
}

#[async_trait]
impl<R: NotificationRuleStore + 'static> CycleTask for RuleDistributor<R> {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let outcome = self.run_once().await?;
        if outcome.pending > 0 {
            debug!(
                pending = outcome.pending,
                applied = outcome.applied,
                failed_organizations = outcome.failed_organizations,
                "Rule distribution pass finished"
            );
        }
        Ok(())
    }
}

/// Runs the registered tasks on a fixed interval until told to stop.
pub struct ControlLoop {
    tasks: Vec<Arc<dyn CycleTask>>,
    interval: Duration,
}

impl ControlLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            interval,
        }
    }

    pub fn register(&mut self, task: Arc<dyn CycleTask>) {
        self.tasks.push(task);
    }

    /// Runs until `shutdown` flips to true. The in-flight cycle always
    /// finishes first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        info!(
            tasks = self.tasks.len(),
            interval_secs = self.interval.as_secs(),
            "Control loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.cycle().await,
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown too.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Control loop stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Spawns the loop on the runtime and returns the shutdown sender.
    pub fn start(self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            self.run(rx).await;
        });
        tx
    }

    async fn cycle(&self) {
        for task in &self.tasks {
            if let Err(err) = task.run().await {
                error!(task = task.name(), error = %err, "Cycle step failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl CycleTask for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl CycleTask for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run(&self) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_every_cycle_until_shutdown() {
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
        });
        let mut control = ControlLoop::new(Duration::from_secs(10));
        control.register(task.clone());

        let shutdown = control.start();
        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        // First tick fires immediately, then at 10s and 20s.
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_task_does_not_stop_the_cycle() {
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
        });
        let mut control = ControlLoop::new(Duration::from_secs(10));
        control.register(Arc::new(Failing));
        control.register(task.clone());

        let shutdown = control.start();
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }
}
