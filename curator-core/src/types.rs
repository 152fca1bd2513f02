//! Domain types shared by the store client and the reconcilers.
//!
//! Remote shapes follow the content store's management API: every entry has
//! a `sys` block (id + optimistic-concurrency version), a `metadata` block
//! with tag links, and a map of localized fields (`{ "<field>": { "en-US": … } }`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Locale every field value is written under.
pub const LOCALE: &str = "en-US";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed remote entry identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Entry shapes
// ---------------------------------------------------------------------------

/// `sys` block of a link (`{ "type": "Link", "linkType": "Tag", "id": … }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "linkType")]
    pub link_type: String,
    pub id: String,
}

/// A metadata tag link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLink {
    pub sys: LinkSys,
}

impl TagLink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".to_string(),
                link_type: "Tag".to_string(),
                id: id.into(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub tags: Vec<TagLink>,
}

/// Body written by an upsert: tags plus localized fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryDraft {
    pub metadata: Metadata,
    pub fields: Map<String, Value>,
}

impl EntryDraft {
    /// Empty draft scoped to a generation tag.
    pub fn tagged(tag: &str) -> Self {
        Self {
            metadata: Metadata {
                tags: vec![TagLink::new(tag)],
            },
            fields: Map::new(),
        }
    }

    /// Set `name` to `{ "en-US": value }`.
    pub fn set_field(&mut self, name: &str, value: Value) {
        let mut localized = Map::new();
        localized.insert(LOCALE.to_string(), value);
        self.fields.insert(name.to_string(), Value::Object(localized));
    }

    /// Unwrapped value of a localized field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(|v| v.get(LOCALE))
    }
}

/// `sys` block of a remote entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySys {
    pub id: EntryId,
    pub version: u64,
    #[serde(
        rename = "archivedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub archived_at: Option<String>,
}

/// The store's representation of an entry. Never cached beyond one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub sys: EntrySys,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RemoteEntry {
    pub fn id(&self) -> &EntryId {
        &self.sys.id
    }

    pub fn version(&self) -> u64 {
        self.sys.version
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.iter().any(|t| t.id() == tag)
    }

    /// Unwrapped value of a localized field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(|v| v.get(LOCALE))
    }
}

/// A caller-supplied record after validation and keying.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredRecord {
    pub id: EntryId,
    /// Natural key the ID was derived from.
    pub key: String,
    pub entry: EntryDraft,
    /// Input record, kept for error context.
    pub source: Value,
}

// ---------------------------------------------------------------------------
// Publish payload
// ---------------------------------------------------------------------------

/// One entry to transition in a bulk action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishItem {
    pub id: EntryId,
    pub version: u64,
}

/// Ordered `(id, version)` pairs, consumed once by the bulk publish step.
pub type PublishPayload = Vec<PublishItem>;

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Remote webhook definition as read by the guard.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookState {
    pub active: bool,
    pub url: String,
    pub version: u64,
    /// Remaining definition body (everything but `sys`), written back as-is.
    pub definition: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Result surface
// ---------------------------------------------------------------------------

/// A per-record failure, with enough context to diagnose it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &EntryId) -> Self {
        self.id = Some(id.clone());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_record(mut self, record: &Value) -> Self {
        self.record = Some(record.clone());
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(id) = &self.id {
            write!(f, " (id {id})")?;
        }
        if let Some(status) = self.status {
            write!(f, " [status {status}]")?;
        }
        Ok(())
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub created: Vec<EntryId>,
    pub updated: Vec<EntryId>,
    pub archived: Vec<EntryId>,
    /// Unmatched remote entries left alone because the dataset was partial.
    #[serde(default)]
    pub unaffected: usize,
    pub errors: Vec<RecordError>,
}

impl ReconciliationResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, error: RecordError) {
        self.errors.push(error);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_id_display_and_serde_are_transparent() {
        let id = EntryId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc"));
    }

    #[test]
    fn draft_serializes_in_store_shape() {
        let mut draft = EntryDraft::tagged("year2026");
        draft.set_field("title", json!("Opening"));
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": { "tags": [
                    { "sys": { "type": "Link", "linkType": "Tag", "id": "year2026" } }
                ] },
                "fields": { "title": { "en-US": "Opening" } }
            })
        );
        assert_eq!(draft.field("title"), Some(&json!("Opening")));
    }

    #[test]
    fn remote_entry_parses_partial_select() {
        let entry: RemoteEntry =
            serde_json::from_value(json!({ "sys": { "id": "x1", "version": 7 } })).unwrap();
        assert_eq!(entry.id().as_str(), "x1");
        assert_eq!(entry.version(), 7);
        assert!(entry.fields.is_empty());
        assert!(!entry.has_tag("year2026"));
    }

    #[test]
    fn remote_entry_reads_localized_field() {
        let entry: RemoteEntry = serde_json::from_value(json!({
            "sys": { "id": "v", "version": 3, "archivedAt": null },
            "metadata": { "tags": [ { "sys": { "type": "Link", "linkType": "Tag", "id": "t" } } ] },
            "fields": { "name": { "en-US": "Tacos" } }
        }))
        .unwrap();
        assert_eq!(entry.field("name"), Some(&json!("Tacos")));
        assert!(entry.has_tag("t"));
    }

    #[test]
    fn record_error_omits_absent_context() {
        let err = RecordError::new("boom").with_status(409);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "message": "boom", "status": 409 })
        );
        assert_eq!(err.to_string(), "boom [status 409]");
    }
}
