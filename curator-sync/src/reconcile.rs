//! Generic reconciliation engine.
//!
//! Diffs a validated dataset against the remote entries of one content type
//! scoped to a generation tag, applies creates/updates/archives one record at
//! a time, then publishes everything written in a single guarded bulk action.

use std::collections::HashMap;

use serde_json::Value;

use curator_core::{
    DesiredRecord, EntryId, PublishItem, PublishPayload, ReconciliationResult, RecordError,
    RemoteEntry,
};
use curator_store::{
    guarded_bulk_publish, BulkAction, ContentStore, EntryQuery, StoreError, Transport,
};

use crate::dataset::DatasetType;
use crate::error::SyncError;
use crate::kinds::{FoodVendors, RecordKind, Schedule};
use crate::progress::ProgressSink;

/// Progress is reported every this many remote entries.
const PROGRESS_EVERY: usize = 20;

/// Caller-controlled switches for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute the full diff without any mutating request.
    pub dry_run: bool,
    /// The dataset is the full set; unmatched remote entries are archived.
    pub complete: bool,
    pub generation_tag: String,
    pub webhook_id: String,
}

/// One dataset type's reconciliation.
pub trait Reconcile<T: Transport> {
    fn reconcile(
        &self,
        store: &ContentStore<T>,
        dataset: &Value,
        options: &RunOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<ReconciliationResult, SyncError>;
}

/// Reconciler for the given dataset type.
pub fn reconciler_for<T: Transport>(dataset: DatasetType) -> Box<dyn Reconcile<T>> {
    match dataset {
        DatasetType::Schedule => Box::new(Reconciler::new(Schedule)),
        DatasetType::FoodVendors => Box::new(Reconciler::new(FoodVendors)),
    }
}

/// Array of records, rejected when empty.
pub fn validate_dataset(dataset: &Value) -> Result<&[Value], SyncError> {
    let records = dataset.as_array().ok_or(SyncError::InvalidDataset {
        found: json_kind(dataset),
    })?;
    if records.is_empty() {
        return Err(SyncError::EmptyDataset);
    }
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Desired record plus the remote entry it was matched to, if any.
struct Pending {
    record: DesiredRecord,
    remote: Option<(EntryId, u64)>,
}

pub struct Reconciler<K> {
    kind: K,
}

impl<K: RecordKind> Reconciler<K> {
    pub fn new(kind: K) -> Self {
        Self { kind }
    }

    /// Key every record, first occurrence of an ID wins.
    fn desired(
        &self,
        records: &[Value],
        tag: &str,
        result: &mut ReconciliationResult,
    ) -> Vec<Pending> {
        let mut pending: Vec<Pending> = Vec::new();
        let mut seen: HashMap<EntryId, usize> = HashMap::new();
        let mut skipped = 0usize;

        for (index, record) in records.iter().enumerate() {
            let Some(fields) = record.as_object() else {
                result.push_error(
                    RecordError::new(format!("record {index} is not an object"))
                        .with_record(record),
                );
                continue;
            };
            let Some(desired) = self.kind.desire(fields, tag) else {
                skipped += 1;
                continue;
            };
            if seen.contains_key(&desired.id) {
                result.push_error(
                    RecordError::new(format!("duplicate {} id: {}", self.kind.noun(), desired.id))
                        .with_id(&desired.id)
                        .with_key(desired.key.clone())
                        .with_record(&desired.source),
                );
                continue;
            }
            seen.insert(desired.id.clone(), pending.len());
            pending.push(Pending {
                record: desired,
                remote: None,
            });
        }

        if skipped > 0 {
            tracing::debug!(
                "skipped {skipped} {} missing required fields",
                self.kind.noun()
            );
        }
        pending
    }

    /// Upsert one record. Returns `true` when the write succeeded (always in
    /// dry run); failures are recorded in `result`.
    fn write<T: Transport>(
        &self,
        store: &ContentStore<T>,
        pending: &Pending,
        dry_run: bool,
        result: &mut ReconciliationResult,
        payload: &mut PublishPayload,
    ) -> bool {
        if dry_run {
            return true;
        }

        let (id, version) = match &pending.remote {
            Some((id, version)) => (id, Some(*version)),
            None => (&pending.record.id, None),
        };
        let failure = |message: String| {
            RecordError::new(message)
                .with_id(id)
                .with_key(pending.record.key.clone())
                .with_record(&pending.record.source)
        };

        match store.upsert_entry(id, self.kind.content_type(), version, &pending.record.entry) {
            Ok(outcome) if outcome.is_success() => match outcome.version() {
                Some(version) => {
                    payload.push(PublishItem {
                        id: id.clone(),
                        version,
                    });
                    true
                }
                None => {
                    result.push_error(
                        failure("upsert response missing sys.version".to_string())
                            .with_status(outcome.status)
                            .with_response(outcome.body),
                    );
                    false
                }
            },
            Ok(outcome) => {
                tracing::warn!("upsert of {id} rejected with status {}", outcome.status);
                result.push_error(
                    failure(format!("failed to write {}", pending.record.key))
                        .with_status(outcome.status)
                        .with_response(outcome.body),
                );
                false
            }
            Err(err) => {
                tracing::warn!("upsert of {id} failed: {err}");
                result.push_error(failure(err.to_string()));
                false
            }
        }
    }

    /// Archive one unmatched remote entry. Returns `true` on success.
    fn archive<T: Transport>(
        &self,
        store: &ContentStore<T>,
        remote: &RemoteEntry,
        dry_run: bool,
        result: &mut ReconciliationResult,
    ) -> bool {
        if dry_run {
            return true;
        }
        match store.archive_entry(remote.id(), remote.version()) {
            Ok(()) => true,
            Err(StoreError::Status {
                context,
                status,
                body,
            }) => {
                tracing::warn!("{context} failed with status {status}");
                result.push_error(
                    RecordError::new(format!("failed to {context}"))
                        .with_id(remote.id())
                        .with_status(status)
                        .with_response(body),
                );
                false
            }
            Err(err) => {
                tracing::warn!("archive of {} failed: {err}", remote.id());
                result.push_error(RecordError::new(err.to_string()).with_id(remote.id()));
                false
            }
        }
    }
}

impl<K: RecordKind, T: Transport> Reconcile<T> for Reconciler<K> {
    fn reconcile(
        &self,
        store: &ContentStore<T>,
        dataset: &Value,
        options: &RunOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<ReconciliationResult, SyncError> {
        let records = validate_dataset(dataset)?;
        let noun = self.kind.noun();
        let mut result = ReconciliationResult::default();

        let mut pending = self.desired(records, &options.generation_tag, &mut result);
        let index: HashMap<EntryId, usize> = pending
            .iter()
            .enumerate()
            .map(|(i, p)| (p.record.id.clone(), i))
            .collect();
        sink.log(&format!("provided {} {noun} to process", pending.len()));

        let remote = store.list_entries(
            &EntryQuery::new()
                .content_type(self.kind.content_type())
                .select(self.kind.select())
                .tagged(options.generation_tag.clone())
                .not_archived(),
        )?;
        sink.log(&format!("found {} existing {noun} to compare against", remote.len()));
        sink.log(&format!("please wait, processing {noun}..."));

        let mut payload = PublishPayload::new();
        for (done, entry) in remote.iter().enumerate() {
            let matched = self
                .kind
                .remote_key(entry)
                .map(|key| index.get(&key).copied().filter(|&i| pending[i].remote.is_none()));

            match matched {
                None => {
                    tracing::debug!("ignoring remote entry {} with no match key", entry.id());
                }
                Some(Some(i)) => {
                    pending[i].remote = Some((entry.id().clone(), entry.version()));
                    if self.write(store, &pending[i], options.dry_run, &mut result, &mut payload) {
                        result.updated.push(entry.id().clone());
                    }
                }
                Some(None) if options.complete => {
                    if self.archive(store, entry, options.dry_run, &mut result) {
                        result.archived.push(entry.id().clone());
                    }
                }
                Some(None) => result.unaffected += 1,
            }

            if !options.dry_run && (done + 1) % PROGRESS_EVERY == 0 {
                sink.log(&format!("... {} / {} ...", done + 1, remote.len()));
            }
        }
        sink.log(&format!("archiving {} unmatched {noun}", result.archived.len()));
        sink.log(&format!("not affecting {} unmatched {noun}", result.unaffected));
        sink.log(&format!("updating {} matched {noun}", result.updated.len()));

        for create in pending.iter().filter(|p| p.remote.is_none()) {
            if self.write(store, create, options.dry_run, &mut result, &mut payload) {
                result.created.push(create.record.id.clone());
            }
        }
        sink.log(&format!("creating {} new {noun}", result.created.len()));

        if !options.dry_run && !payload.is_empty() {
            sink.log(&format!("publishing {} {noun}", payload.len()));
        }
        guarded_bulk_publish(
            store,
            &options.webhook_id,
            &payload,
            BulkAction::Publish,
            options.dry_run,
        )?;

        tracing::info!(
            "{noun}: {} created, {} updated, {} archived, {} unaffected, {} errors",
            result.created.len(),
            result.updated.len(),
            result.archived.len(),
            result.unaffected,
            result.errors.len()
        );
        Ok(result)
    }
}
