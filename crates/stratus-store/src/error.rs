//! Error types for the store layer.

use stratus_core::status::InvalidStatus;

/// Errors from the PostgreSQL store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An update matched zero rows: the resource vanished or was never there.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "cluster".
        entity: &'static str,
        /// Identity of the missing row.
        id: String,
    },

    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(#[from] sqlx_core::error::Error),

    /// A stored value did not decode into its domain type.
    #[error("corrupt row: {message}")]
    Decode {
        /// Description of the offending value.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// True when the error is a vanished-row update, which callers log and
    /// skip rather than abort on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<InvalidStatus> for StoreError {
    fn from(err: InvalidStatus) -> Self {
        Self::decode(err.to_string())
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
