//! # curator-sync
//!
//! Dataset reconciliation against the content store.
//!
//! Parse a [`DatasetType`], then call [`pipeline::run`] (or
//! [`reconciler_for`] directly) with a client, the dataset, and
//! [`RunOptions`].

pub mod dataset;
pub mod error;
pub mod kinds;
pub mod pipeline;
pub mod progress;
pub mod reconcile;

pub use dataset::DatasetType;
pub use error::SyncError;
pub use kinds::RecordKind;
pub use progress::{ProgressSink, TracingSink};
pub use reconcile::{reconciler_for, validate_dataset, Reconcile, Reconciler, RunOptions};
