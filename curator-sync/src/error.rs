//! Error types for curator-sync.

use std::path::PathBuf;

use thiserror::Error;

use curator_store::StoreError;

use crate::dataset::DatasetType;

/// Run-level failures. Per-record failures are collected in
/// [`ReconciliationResult::errors`](curator_core::ReconciliationResult)
/// instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Listing, webhook, or bulk action failure from the content store.
    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    #[error("unknown dataset type '{0}' (expected one of: {})", DatasetType::known())]
    UnknownDataset(String),

    #[error("dataset must be a JSON array of records, got {found}")]
    InvalidDataset { found: &'static str },

    #[error("dataset is empty; refusing to reconcile against nothing")]
    EmptyDataset,

    /// Dataset file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset file is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
