//! # curator-store
//!
//! Content store management API client.
//!
//! [`ContentStore`] wraps a [`Transport`] with the store's entry, bulk action,
//! and webhook operations. [`guarded_bulk_publish`] runs a bulk action with
//! the deploy webhook disabled and restored around it.

pub mod batch;
pub mod client;
pub mod error;
pub mod guard;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod query;
pub mod transport;

pub use batch::{chunk, BulkAction, BulkJob, BulkStatus, Sleeper, ThreadSleeper, MAX_BULK_BATCH};
pub use client::{ContentStore, StoreSettings, UpsertOutcome};
pub use error::StoreError;
pub use guard::{guarded_bulk_publish, WebhookGuard};
pub use query::EntryQuery;
pub use transport::{HttpRequest, HttpResponse, Method, Transport, UreqTransport};
