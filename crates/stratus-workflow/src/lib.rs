//! Workflow engine status source.
//!
//! The reconcile loop only needs one question answered: "what is run X doing
//! right now?" The [`WorkflowStatusSource`] trait is that question; the
//! [`ArgoWorkflowClient`] answers it against an Argo-workflow-server-style
//! REST API. Nothing is cached: every cycle re-queries authoritative state.

pub mod client;
pub mod error;

use async_trait::async_trait;

use stratus_core::WorkflowSnapshot;

pub use client::{ArgoWorkflowClient, WorkflowClientConfig};
pub use error::WorkflowError;

/// Source of authoritative workflow run state.
#[async_trait]
pub trait WorkflowStatusSource: Send + Sync {
    /// Fetches the current snapshot of one run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::RunNotFound`] when the engine does not know
    /// the run, and transport errors otherwise. Both are non-fatal to a
    /// cycle: the resource is skipped and retried next round.
    async fn get_status(
        &self,
        namespace: &str,
        run_ref: &str,
    ) -> Result<WorkflowSnapshot, WorkflowError>;
}
