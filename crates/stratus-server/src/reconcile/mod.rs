//! The generic reconcile pass.
//!
//! One [`Reconciler`] per resource kind. A pass lists the kind's in-flight
//! rows, asks the workflow engine where each attached run stands, translates
//! the answer through the kind's transition table, and writes the result back
//! only when status or description actually changed. Per-row failures are
//! logged and retried on the next cycle; only the initial listing is fatal to
//! a pass.

pub mod hooks;

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, warn};

use stratus_core::{EmptyRunPolicy, ReconcileKind};
use stratus_store::{StatusStore, StoreError};
use stratus_workflow::WorkflowStatusSource;

pub use hooks::{CloudAccountIamHook, OrganizationAdminHook, TransitionHook};

/// Counters for one pass over one kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Rows in a transitional status at the start of the pass.
    pub examined: usize,
    /// Rows whose status or description was written.
    pub updated: usize,
    /// Rows already in sync with their run.
    pub unchanged: usize,
    /// Rows deliberately left alone (empty run reference under a skip policy).
    pub skipped: usize,
    /// Rows whose fetch or write failed; retried next cycle.
    pub failed: usize,
}

/// Drives one resource kind's statuses from workflow run state.
pub struct Reconciler<K, S>
where
    K: ReconcileKind,
    S: StatusStore<Status = K::Status>,
{
    store: Arc<S>,
    workflow: Arc<dyn WorkflowStatusSource>,
    namespace: String,
    hook: Option<Arc<dyn TransitionHook<K::Status>>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S> Reconciler<K, S>
where
    K: ReconcileKind,
    S: StatusStore<Status = K::Status>,
{
    pub fn new(
        store: Arc<S>,
        workflow: Arc<dyn WorkflowStatusSource>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            workflow,
            namespace: namespace.into(),
            hook: None,
            _kind: PhantomData,
        }
    }

    /// Attaches a side effect fired after each successful status write.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook<K::Status>>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Runs one pass over every in-flight row of this kind.
    ///
    /// # Errors
    ///
    /// Only the initial listing can fail the pass; everything per-row is
    /// logged and counted instead.
    pub async fn run_once(&self) -> Result<CycleOutcome, StoreError> {
        let rows = self.store.list_transitional().await?;
        let mut outcome = CycleOutcome {
            examined: rows.len(),
            ..CycleOutcome::default()
        };

        for row in rows {
            let (next, desc) = if row.workflow_ref.is_empty() {
                match K::empty_run_policy() {
                    EmptyRunPolicy::Skip => {
                        debug!(kind = K::NAME, id = %row.id, "No run attached, skipping");
                        outcome.skipped += 1;
                        continue;
                    }
                    EmptyRunPolicy::MarkError { status, message } => (status, message.to_string()),
                }
            } else {
                let snapshot = match self
                    .workflow
                    .get_status(&self.namespace, &row.workflow_ref)
                    .await
                {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(
                            kind = K::NAME,
                            id = %row.id,
                            run_ref = %row.workflow_ref,
                            error = %err,
                            "Workflow status fetch failed, retrying next cycle"
                        );
                        outcome.failed += 1;
                        continue;
                    }
                };

                match K::translate(row.status, &snapshot) {
                    Some(next) => (next, snapshot.status_desc()),
                    None => {
                        outcome.unchanged += 1;
                        continue;
                    }
                }
            };

            // Idempotence: repeated cycles against unchanged runs write nothing.
            if next == row.status && desc == row.status_desc {
                outcome.unchanged += 1;
                continue;
            }

            match self
                .store
                .update_status(&row.id, next, &desc, &row.workflow_ref)
                .await
            {
                Ok(()) => {
                    info!(
                        kind = K::NAME,
                        id = %row.id,
                        from = %row.status,
                        to = %next,
                        desc = %desc,
                        "Status updated"
                    );
                    outcome.updated += 1;

                    if let Some(hook) = &self.hook {
                        if let Err(err) = hook.applied(&row.id, row.status, next).await {
                            warn!(
                                kind = K::NAME,
                                id = %row.id,
                                error = %err,
                                "Post-transition side effect failed"
                            );
                        }
                    }
                }
                Err(err) if err.is_not_found() => {
                    warn!(kind = K::NAME, id = %row.id, "Row vanished during update");
                    outcome.failed += 1;
                }
                Err(err) => {
                    warn!(kind = K::NAME, id = %row.id, error = %err, "Status update failed");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}
