//! Error types for curator-store.

use serde_json::Value;
use thiserror::Error;

use crate::batch::BulkAction;

/// All errors that can arise from content store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The store answered with an unexpected status.
    #[error("{context} returned status {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: Value,
    },

    /// A response body did not have the expected shape.
    #[error("unexpected response from {context}: {message}")]
    Malformed { context: String, message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bulk action job reached the `failed` terminal state.
    #[error("bulk {action} job {job_id} failed: {error}")]
    BulkActionFailed {
        action: BulkAction,
        job_id: String,
        error: Value,
    },

    /// Reading or writing the webhook definition failed.
    #[error("webhook {webhook_id} {step} failed with status {status}: {body}")]
    Webhook {
        webhook_id: String,
        step: &'static str,
        status: u16,
        body: Value,
    },
}

/// Convenience constructor for [`StoreError::Malformed`].
pub(crate) fn malformed(context: impl Into<String>, message: impl Into<String>) -> StoreError {
    StoreError::Malformed {
        context: context.into(),
        message: message.into(),
    }
}
