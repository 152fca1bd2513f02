use serde_json::{json, Map, Value};

use curator_core::{new_id_from_key, DesiredRecord, EntryDraft, EntryId, RemoteEntry};

use super::{text, truthy, RecordKind};

/// Food vendors, keyed by name.
///
/// Remote vendors are matched by name rather than ID so entries created by
/// hand in the store are updated instead of duplicated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoodVendors;

impl RecordKind for FoodVendors {
    fn content_type(&self) -> &'static str {
        "foodVendor"
    }

    fn noun(&self) -> &'static str {
        "food vendors"
    }

    fn select(&self) -> &'static str {
        "sys.id,sys.version,fields.name"
    }

    fn desire(&self, record: &Map<String, Value>, tag: &str) -> Option<DesiredRecord> {
        let name = record.get("name");
        if !truthy(name) {
            return None;
        }
        let name = text(name);

        let items: Vec<Value> = record
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| menu_item(&name, index, item))
                    .collect()
            })
            .unwrap_or_default();

        let mut entry = EntryDraft::tagged(tag);
        entry.set_field("name", Value::String(name.clone()));
        entry.set_field("items", Value::Array(items));

        Some(DesiredRecord {
            id: new_id_from_key(&name),
            key: name,
            entry,
            source: Value::Object(record.clone()),
        })
    }

    fn remote_key(&self, remote: &RemoteEntry) -> Option<EntryId> {
        let name = remote.field("name").and_then(Value::as_str)?;
        (!name.is_empty()).then(|| new_id_from_key(name))
    }
}

/// `{ name, price }` → `{ id, key, value }`.
///
/// The ID depends on the item's position so unnamed and repeated items stay
/// distinct and identical input always yields identical fields.
fn menu_item(vendor: &str, index: usize, item: &Value) -> Value {
    let key = text(item.get("name")).trim().to_string();
    let value = text(item.get("price")).trim().to_string();
    let id = new_id_from_key(&format!("{vendor}/{index}/{key}"));
    json!({ "id": id, "key": key, "value": value })
}
