//! Shared import entrypoint used by the CLI.

use std::path::Path;

use serde_json::Value;

use curator_core::ReconciliationResult;
use curator_store::{ContentStore, Transport};

use crate::dataset::DatasetType;
use crate::error::{io_err, SyncError};
use crate::progress::ProgressSink;
use crate::reconcile::{reconciler_for, validate_dataset, RunOptions};

/// Read a dataset file and check its shape before any network I/O.
pub fn read_dataset(path: &Path) -> Result<Value, SyncError> {
    let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let dataset: Value = serde_json::from_str(&raw).map_err(|source| SyncError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Reconcile `dataset` as `dataset_type`.
pub fn run<T: Transport>(
    store: &ContentStore<T>,
    dataset_type: DatasetType,
    dataset: &Value,
    options: &RunOptions,
    sink: &mut dyn ProgressSink,
) -> Result<ReconciliationResult, SyncError> {
    tracing::info!(
        "importing {dataset_type} (dry_run={}, complete={}, tag={})",
        options.dry_run,
        options.complete,
        options.generation_tag
    );
    reconciler_for::<T>(dataset_type).reconcile(store, dataset, options, sink)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn read_dataset_accepts_array() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("schedule.json");
        fs::write(&path, r#"[{ "title": "Parade", "time": "10:00" }]"#).expect("write");

        let dataset = read_dataset(&path).expect("read");
        assert_eq!(dataset.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn read_dataset_rejects_bad_input() {
        let dir = TempDir::new().expect("tempdir");

        let missing = read_dataset(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, SyncError::Io { .. }));

        let garbled = dir.path().join("garbled.json");
        fs::write(&garbled, "[{").expect("write");
        assert!(matches!(read_dataset(&garbled).unwrap_err(), SyncError::Json { .. }));

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "[]").expect("write");
        assert!(matches!(read_dataset(&empty).unwrap_err(), SyncError::EmptyDataset));

        let object = dir.path().join("object.json");
        fs::write(&object, "{}").expect("write");
        assert!(matches!(
            read_dataset(&object).unwrap_err(),
            SyncError::InvalidDataset { .. }
        ));
    }
}
