//! Per-dataset record rules.
//!
//! A [`RecordKind`] turns one input record into a [`DesiredRecord`] and tells
//! the reconciler which desired ID a remote entry corresponds to. Everything
//! else (listing, diffing, writing, publishing) is shared.

use serde_json::{Map, Value};

use curator_core::{DesiredRecord, EntryId, RemoteEntry};

mod schedule;
mod vendors;

pub use schedule::Schedule;
pub use vendors::FoodVendors;

pub trait RecordKind: Send + Sync {
    /// Remote content type ID.
    fn content_type(&self) -> &'static str;

    /// Plural noun for progress lines, e.g. `events`.
    fn noun(&self) -> &'static str;

    /// Field projection for the remote listing.
    fn select(&self) -> &'static str;

    /// Build the desired entry, or `None` when the record lacks a required
    /// field and should be skipped.
    fn desire(&self, record: &Map<String, Value>, tag: &str) -> Option<DesiredRecord>;

    /// Desired ID a remote entry matches, or `None` to leave it out of the
    /// diff entirely.
    fn remote_key(&self, remote: &RemoteEntry) -> Option<EntryId>;
}

/// Loose truthiness: `null`, `false`, `0`, and `""` are falsy.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Scalar rendered as text; strings are taken verbatim.
pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
