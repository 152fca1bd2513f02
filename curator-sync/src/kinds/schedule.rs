use serde_json::{Map, Value};

use curator_core::{new_id_from_key, DesiredRecord, EntryDraft, EntryId, RemoteEntry};

use super::{text, truthy, RecordKind};

/// Optional fields copied through when truthy.
const COPIED_FIELDS: [&str; 4] = ["title", "time", "endTime", "tent"];

/// Scheduled events, keyed by title plus start time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schedule;

impl RecordKind for Schedule {
    fn content_type(&self) -> &'static str {
        "scheduledEvent"
    }

    fn noun(&self) -> &'static str {
        "events"
    }

    fn select(&self) -> &'static str {
        "sys.id,sys.version"
    }

    fn desire(&self, record: &Map<String, Value>, tag: &str) -> Option<DesiredRecord> {
        let title = record.get("title");
        if !truthy(title) || text(title) == "-" || !truthy(record.get("time")) {
            return None;
        }

        let mut entry = EntryDraft::tagged(tag);
        entry.set_field("near", Value::Bool(record.get("near") == Some(&Value::Bool(true))));
        for name in COPIED_FIELDS {
            if let Some(value) = record.get(name).filter(|v| truthy(Some(*v))) {
                entry.set_field(name, value.clone());
            }
        }

        let key = format!("{}{}", text(title), text(record.get("time")));
        Some(DesiredRecord {
            id: new_id_from_key(&key),
            key,
            entry,
            source: Value::Object(record.clone()),
        })
    }

    fn remote_key(&self, remote: &RemoteEntry) -> Option<EntryId> {
        Some(remote.id().clone())
    }
}
