//! Error types for the workflow status source.

/// Errors from querying the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The engine does not know the referenced run.
    #[error("workflow run not found: {namespace}/{run_ref}")]
    RunNotFound { namespace: String, run_ref: String },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("workflow engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with an unexpected HTTP status.
    #[error("workflow engine returned status {status}")]
    UnexpectedStatus { status: u16 },

    /// Client construction failed (bad base URL, TLS setup).
    #[error("workflow client configuration error: {message}")]
    Config { message: String },
}

impl WorkflowError {
    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
