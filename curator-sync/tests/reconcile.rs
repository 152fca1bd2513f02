//! Reconciliation runs against the in-memory content store.

use std::sync::Arc;

use serde_json::{json, Value};

use curator_core::{new_id_from_key, EntryId, ReconciliationResult};
use curator_store::mock::{MockStore, MOCK_WEBHOOK_ID};
use curator_store::{ContentStore, StoreError};
use curator_sync::{pipeline, DatasetType, RunOptions, SyncError};

const TAG: &str = "year2026";

fn options(complete: bool, dry_run: bool) -> RunOptions {
    RunOptions {
        dry_run,
        complete,
        generation_tag: TAG.to_string(),
        webhook_id: MOCK_WEBHOOK_ID.to_string(),
    }
}

fn event(title: &str, time: &str) -> Value {
    json!({ "title": title, "time": time, "tent": "Main" })
}

fn event_id(title: &str, time: &str) -> EntryId {
    new_id_from_key(&format!("{title}{time}"))
}

fn seed_event(mock: &MockStore, title: &str, time: &str) -> EntryId {
    let id = event_id(title, time);
    mock.seed_entry(
        id.as_str(),
        "scheduledEvent",
        TAG,
        json!({ "title": { "en-US": title }, "time": { "en-US": time } }),
    );
    id
}

fn import(
    store: &ContentStore<Arc<MockStore>>,
    dataset_type: DatasetType,
    dataset: &Value,
    options: &RunOptions,
) -> Result<ReconciliationResult, SyncError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sink = |_: &str| {};
    pipeline::run(store, dataset_type, dataset, options, &mut sink)
}

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

#[test]
fn complete_run_updates_archives_and_creates() {
    let mock = Arc::new(MockStore::new());
    let x = seed_event(&mock, "Parade", "10:00");
    let y = seed_event(&mock, "Old Show", "11:00");
    let store = mock.client();

    let dataset = json!([event("Parade", "10:00"), event("New Show", "12:00")]);
    let result = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();

    let z = event_id("New Show", "12:00");
    assert_eq!(result.updated, vec![x.clone()]);
    assert_eq!(result.archived, vec![y.clone()]);
    assert_eq!(result.created, vec![z.clone()]);
    assert_eq!(result.unaffected, 0);
    assert!(result.is_clean(), "{:?}", result.errors);

    assert!(mock.entry(y.as_str()).unwrap().archived);
    let created = mock.entry(z.as_str()).unwrap();
    assert!(created.published);
    assert_eq!(created.tags, vec![TAG.to_string()]);
    let updated = mock.entry(x.as_str()).unwrap();
    assert!(updated.published);
    assert_eq!(updated.fields["tent"], json!({ "en-US": "Main" }));

    assert_eq!(mock.bulk_batches(), vec![2]);
    assert!(mock.webhook_active());
    assert_eq!(mock.trigger_count(), 1);
}

#[test]
fn partial_run_leaves_unmatched_entries_alone() {
    let mock = Arc::new(MockStore::new());
    seed_event(&mock, "Parade", "10:00");
    let y = seed_event(&mock, "Old Show", "11:00");
    let store = mock.client();

    let dataset = json!([event("Parade", "10:00"), event("New Show", "12:00")]);
    let result = import(&store, DatasetType::Schedule, &dataset, &options(false, false)).unwrap();

    assert_eq!(result.updated.len(), 1);
    assert_eq!(result.created.len(), 1);
    assert!(result.archived.is_empty());
    assert_eq!(result.unaffected, 1);
    let untouched = mock.entry(y.as_str()).unwrap();
    assert!(!untouched.archived);
    assert_eq!(untouched.version, 3);
}

#[test]
fn second_identical_run_only_updates() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();
    let dataset = json!([event("Parade", "10:00"), event("Fireworks", "21:00")]);

    let first = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();
    assert_eq!(first.created.len(), 2);
    let fields_after_first: Vec<_> = mock.entries().into_iter().map(|e| e.fields).collect();

    let second = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();
    assert!(second.created.is_empty());
    assert!(second.archived.is_empty());
    assert_eq!(second.updated.len(), 2);
    let fields_after_second: Vec<_> = mock.entries().into_iter().map(|e| e.fields).collect();
    assert_eq!(fields_after_first, fields_after_second);
    assert_eq!(mock.entries().len(), 2);
}

#[test]
fn other_generations_are_out_of_scope() {
    let mock = Arc::new(MockStore::new());
    mock.seed_entry("lastYear", "scheduledEvent", "year2025", json!({}));
    mock.seed_entry("vendor", "foodVendor", TAG, json!({}));
    let store = mock.client();

    let result = import(
        &store,
        DatasetType::Schedule,
        &json!([event("Parade", "10:00")]),
        &options(true, false),
    )
    .unwrap();

    assert!(result.archived.is_empty());
    assert!(!mock.entry("lastYear").unwrap().archived);
    assert!(!mock.entry("vendor").unwrap().archived);
}

#[test]
fn duplicates_are_reported_once_and_first_wins() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();
    let dataset = json!([
        { "title": "Parade", "time": "10:00", "tent": "North" },
        { "title": "Parade", "time": "10:00", "tent": "South" }
    ]);

    let result = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();

    assert_eq!(result.created.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id, Some(event_id("Parade", "10:00")));
    let stored = mock.entry(event_id("Parade", "10:00").as_str()).unwrap();
    assert_eq!(stored.fields["tent"], json!({ "en-US": "North" }));
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_reports_full_diff_without_mutations() {
    let mock = Arc::new(MockStore::new());
    let x = seed_event(&mock, "Parade", "10:00");
    let y = seed_event(&mock, "Old Show", "11:00");
    let store = mock.client();

    let dataset = json!([event("Parade", "10:00"), event("New Show", "12:00")]);
    let result = import(&store, DatasetType::Schedule, &dataset, &options(true, true)).unwrap();

    assert_eq!(result.updated, vec![x]);
    assert_eq!(result.archived, vec![y]);
    assert_eq!(result.created, vec![event_id("New Show", "12:00")]);
    assert!(mock.mutating_requests().is_empty());
    assert!(mock.bulk_batches().is_empty());
    assert_eq!(mock.trigger_count(), 0);
    assert_eq!(mock.entries().len(), 2);
}

// ---------------------------------------------------------------------------
// Per-record failures
// ---------------------------------------------------------------------------

#[test]
fn rejected_upsert_is_recorded_and_not_published() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();
    let bad = event_id("Bad", "09:00");
    mock.fail_upsert_for(bad.as_str());

    let dataset = json!([event("Bad", "09:00"), event("Good", "10:00")]);
    let result = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();

    assert_eq!(result.created, vec![event_id("Good", "10:00")]);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.id, Some(bad.clone()));
    assert_eq!(error.status, Some(409));
    assert_eq!(error.key.as_deref(), Some("Bad09:00"));
    assert!(error.record.is_some());
    assert!(error.response.is_some());
    assert_eq!(mock.bulk_batches(), vec![1]);
    assert!(mock.entry(bad.as_str()).is_none());
}

#[test]
fn failed_archive_is_recorded_and_run_continues() {
    let mock = Arc::new(MockStore::new());
    let stuck = seed_event(&mock, "Stuck", "08:00");
    let gone = seed_event(&mock, "Gone", "08:30");
    mock.fail_archive_for(stuck.as_str());
    let store = mock.client();

    let result = import(
        &store,
        DatasetType::Schedule,
        &json!([event("Parade", "10:00")]),
        &options(true, false),
    )
    .unwrap();

    assert_eq!(result.archived, vec![gone]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id, Some(stuck));
    assert_eq!(result.errors[0].status, Some(422));
    assert_eq!(result.created.len(), 1);
}

// ---------------------------------------------------------------------------
// Run-level failures
// ---------------------------------------------------------------------------

#[test]
fn webhook_is_restored_when_publish_fails() {
    let mock = Arc::new(MockStore::new());
    mock.fail_bulk_jobs();
    let store = mock.client();

    let err = import(
        &store,
        DatasetType::Schedule,
        &json!([event("Parade", "10:00")]),
        &options(true, false),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Store(StoreError::BulkActionFailed { .. })
    ));
    assert!(mock.webhook_active());
    assert_eq!(mock.trigger_count(), 1);
}

#[test]
fn listing_failure_aborts_before_any_write() {
    let mock = Arc::new(MockStore::new());
    let mut settings = MockStore::settings();
    settings.token = "expired".to_string();
    let store = ContentStore::new(Arc::clone(&mock), settings);

    let err = import(
        &store,
        DatasetType::Schedule,
        &json!([event("Parade", "10:00")]),
        &options(true, false),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Store(StoreError::Status { status: 401, .. })
    ));
    assert!(mock.entries().is_empty());
}

#[test]
fn shape_errors_precede_network_io() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();

    let empty = import(&store, DatasetType::Schedule, &json!([]), &options(true, false));
    assert!(matches!(empty, Err(SyncError::EmptyDataset)));
    let object = import(&store, DatasetType::Schedule, &json!({}), &options(true, false));
    assert!(matches!(object, Err(SyncError::InvalidDataset { .. })));
    assert!(mock.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Batching and progress
// ---------------------------------------------------------------------------

#[test]
fn large_import_publishes_in_provider_sized_batches() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();
    let dataset = Value::Array(
        (0..450)
            .map(|i| event(&format!("Talk {i}"), "13:00"))
            .collect(),
    );

    let result = import(&store, DatasetType::Schedule, &dataset, &options(true, false)).unwrap();

    assert_eq!(result.created.len(), 450);
    let mut batches = mock.bulk_batches();
    batches.sort_unstable();
    assert_eq!(batches, vec![50, 200, 200]);
    assert!(mock.entries().iter().all(|e| e.published));
    assert_eq!(mock.trigger_count(), 1);
}

#[test]
fn progress_lines_describe_the_run() {
    let mock = Arc::new(MockStore::new());
    for i in 0..25 {
        seed_event(&mock, &format!("Old {i}"), "09:00");
    }
    let store = mock.client();

    let mut lines: Vec<String> = Vec::new();
    let mut sink = |m: &str| lines.push(m.to_string());
    pipeline::run(
        &store,
        DatasetType::Schedule,
        &json!([event("Parade", "10:00")]),
        &options(false, false),
        &mut sink,
    )
    .unwrap();

    assert!(lines.contains(&"provided 1 events to process".to_string()), "{lines:?}");
    assert!(lines.contains(&"found 25 existing events to compare against".to_string()));
    assert!(lines.contains(&"... 20 / 25 ...".to_string()));
    assert!(lines.contains(&"not affecting 25 unmatched events".to_string()));
    assert!(lines.contains(&"creating 1 new events".to_string()));
}

// ---------------------------------------------------------------------------
// Food vendors
// ---------------------------------------------------------------------------

#[test]
fn vendors_created_by_hand_are_matched_by_name() {
    let mock = Arc::new(MockStore::new());
    mock.seed_entry(
        "handMade1",
        "foodVendor",
        TAG,
        json!({ "name": { "en-US": "Churros" } }),
    );
    mock.seed_entry(
        "handMade2",
        "foodVendor",
        TAG,
        json!({ "name": { "en-US": "Closed Stand" } }),
    );
    let store = mock.client();

    let dataset = json!([
        { "name": "Churros", "items": [{ "name": "Classic", "price": " $3 " }] },
        { "name": "Kettle Corn", "items": [] }
    ]);
    let result = import(&store, DatasetType::FoodVendors, &dataset, &options(true, false)).unwrap();

    assert_eq!(result.updated, vec![EntryId::from("handMade1")]);
    assert_eq!(result.archived, vec![EntryId::from("handMade2")]);
    assert_eq!(result.created, vec![new_id_from_key("Kettle Corn")]);

    let churros = mock.entry("handMade1").unwrap();
    assert_eq!(churros.fields["items"]["en-US"][0]["value"], json!("$3"));
    assert!(churros.published);
    assert!(mock.entry(new_id_from_key("Churros").as_str()).is_none());
}

#[test]
fn nameless_remote_vendors_are_never_archived() {
    let mock = Arc::new(MockStore::new());
    mock.seed_entry("draft", "foodVendor", TAG, json!({}));
    let store = mock.client();

    let result = import(
        &store,
        DatasetType::FoodVendors,
        &json!([{ "name": "Churros" }]),
        &options(true, false),
    )
    .unwrap();

    assert!(result.archived.is_empty());
    assert!(!mock.entry("draft").unwrap().archived);
}

#[test]
fn identical_vendor_reimport_keeps_content() {
    let mock = Arc::new(MockStore::new());
    let store = mock.client();
    let dataset = json!([{
        "name": "Churros",
        "items": [{ "price": "$3" }, { "name": "Classic" }, { "name": "Classic" }]
    }]);
    let id = new_id_from_key("Churros");

    let first = import(&store, DatasetType::FoodVendors, &dataset, &options(true, false)).unwrap();
    assert_eq!(first.created, vec![id.clone()]);
    let stored = mock.entry(id.as_str()).unwrap().fields;

    let second = import(&store, DatasetType::FoodVendors, &dataset, &options(true, false)).unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, vec![id.clone()]);
    assert_eq!(mock.entry(id.as_str()).unwrap().fields, stored);

    let items = stored["items"]["en-US"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_ne!(items[1]["id"], items[2]["id"]);
}

#[test]
fn progress_counts_remote_entries_without_a_match_key() {
    let mock = Arc::new(MockStore::new());
    for i in 0..19 {
        mock.seed_entry(
            &format!("v{i:02}"),
            "foodVendor",
            TAG,
            json!({ "name": { "en-US": format!("Vendor {i}") } }),
        );
    }
    // Sorts last, so it is the twentieth entry listed.
    mock.seed_entry("zzDraft", "foodVendor", TAG, json!({}));
    let store = mock.client();

    let mut lines: Vec<String> = Vec::new();
    let mut sink = |m: &str| lines.push(m.to_string());
    pipeline::run(
        &store,
        DatasetType::FoodVendors,
        &json!([{ "name": "Churros" }]),
        &options(false, false),
        &mut sink,
    )
    .unwrap();

    assert!(lines.contains(&"found 20 existing food vendors to compare against".to_string()));
    assert!(lines.contains(&"... 20 / 20 ...".to_string()), "{lines:?}");
    assert!(lines.contains(&"not affecting 19 unmatched food vendors".to_string()));
}
