//! Bulk action batching and completion polling.
//!
//! Bulk jobs run asynchronously on the provider side. A job moves through
//! `created → inProgress → {succeeded | failed}`; only the last two are
//! terminal. Polling is sleep-then-check on a fixed interval with no retry
//! cap, driven by an injected [`Sleeper`] so tests never wait.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::{malformed, StoreError};

/// Provider limit on items per bulk action.
pub const MAX_BULK_BATCH: usize = 200;

/// Split `items` into order-preserving chunks of at most `size` (min 1).
///
/// Logs a warning when more than one chunk is produced.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let chunks: Vec<Vec<T>> = items.chunks(size).map(<[T]>::to_vec).collect();
    if chunks.len() > 1 {
        tracing::warn!(
            "chunking {} items into {} batches of at most {size}",
            items.len(),
            chunks.len()
        );
    }
    chunks
}

// ---------------------------------------------------------------------------
// Actions and job state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    Publish,
    Unpublish,
}

impl BulkAction {
    /// Path segment under `bulk_actions/`.
    pub fn as_str(self) -> &'static str {
        match self {
            BulkAction::Publish => "publish",
            BulkAction::Unpublish => "unpublish",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkStatus {
    Created,
    InProgress,
    Succeeded,
    Failed,
}

impl BulkStatus {
    /// Unknown provider states are treated as still running.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "created" => BulkStatus::Created,
            "succeeded" => BulkStatus::Succeeded,
            "failed" => BulkStatus::Failed,
            _ => BulkStatus::InProgress,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BulkStatus::Succeeded | BulkStatus::Failed)
    }
}

/// Handle for one submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkJob {
    pub id: String,
    pub action: BulkAction,
    pub status: BulkStatus,
    /// Number of entries in the batch.
    pub items: usize,
    /// Provider error payload, present on `failed`.
    pub error: Option<Value>,
}

impl BulkJob {
    /// Parse `{ "sys": { "id", "status" }, "error"? }`.
    pub(crate) fn from_body(
        action: BulkAction,
        items: usize,
        body: &Value,
    ) -> Result<Self, StoreError> {
        let context = format!("bulk {action}");
        let sys = body
            .get("sys")
            .ok_or_else(|| malformed(&context, "missing sys"))?;
        let id = sys
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(&context, "missing sys.id"))?;
        let status = sys
            .get("status")
            .and_then(Value::as_str)
            .map(BulkStatus::parse)
            .unwrap_or(BulkStatus::InProgress);
        Ok(Self {
            id: id.to_string(),
            action,
            status,
            items,
            error: body.get("error").filter(|e| !e.is_null()).cloned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Injected clock for the poll loop.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleep `interval`, then `check`, until the job is terminal.
///
/// `failed` becomes [`StoreError::BulkActionFailed`] carrying the provider's
/// error payload. Errors from `check` itself propagate immediately.
pub fn poll_until_terminal<F>(
    sleeper: &dyn Sleeper,
    interval: Duration,
    job: &BulkJob,
    mut check: F,
) -> Result<BulkJob, StoreError>
where
    F: FnMut(&BulkJob) -> Result<BulkJob, StoreError>,
{
    let mut attempt = 0u64;
    loop {
        sleeper.sleep(interval);
        attempt += 1;

        let current = check(job)?;
        tracing::debug!(
            "bulk {} job {} status {:?} (check {attempt})",
            current.action,
            current.id,
            current.status
        );
        match current.status {
            BulkStatus::Succeeded => return Ok(current),
            BulkStatus::Failed => {
                tracing::error!(
                    "bulk {} job {} failed: {}",
                    current.action,
                    current.id,
                    current.error.clone().unwrap_or(Value::Null)
                );
                return Err(StoreError::BulkActionFailed {
                    action: current.action,
                    job_id: current.id,
                    error: current.error.unwrap_or(Value::Null),
                });
            }
            BulkStatus::Created | BulkStatus::InProgress => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl Sleeper for CountingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn job(status: BulkStatus) -> BulkJob {
        BulkJob {
            id: "job-1".to_string(),
            action: BulkAction::Publish,
            status,
            items: 3,
            error: None,
        }
    }

    #[test]
    fn chunk_450_by_200_is_200_200_50() {
        let items: Vec<u32> = (0..450).collect();
        let chunks = chunk(&items, 200);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(chunks[1][0], 200);
        assert_eq!(chunks[2][49], 449);
    }

    #[test]
    fn chunk_empty_and_zero_size() {
        assert!(chunk::<u8>(&[], 200).is_empty());
        assert_eq!(chunk(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn status_parse_and_terminality() {
        assert_eq!(BulkStatus::parse("created"), BulkStatus::Created);
        assert_eq!(BulkStatus::parse("inProgress"), BulkStatus::InProgress);
        assert_eq!(BulkStatus::parse("somethingNew"), BulkStatus::InProgress);
        assert!(BulkStatus::parse("succeeded").is_terminal());
        assert!(BulkStatus::parse("failed").is_terminal());
        assert!(!BulkStatus::Created.is_terminal());
    }

    #[test]
    fn job_parses_error_payload() {
        let parsed = BulkJob::from_body(
            BulkAction::Unpublish,
            2,
            &json!({ "sys": { "id": "b1", "status": "failed" }, "error": { "message": "nope" } }),
        )
        .unwrap();
        assert_eq!(parsed.status, BulkStatus::Failed);
        assert_eq!(parsed.error, Some(json!({ "message": "nope" })));
        assert!(BulkJob::from_body(BulkAction::Publish, 1, &json!({})).is_err());
    }

    #[test]
    fn poll_sleeps_before_every_check_until_success() {
        let sleeper = CountingSleeper::default();
        let mut statuses = vec![BulkStatus::Succeeded, BulkStatus::InProgress, BulkStatus::Created];
        let start = job(BulkStatus::Created);
        let done = poll_until_terminal(&sleeper, Duration::from_secs(5), &start, |_| {
            Ok(job(statuses.pop().unwrap()))
        })
        .unwrap();

        assert_eq!(done.status, BulkStatus::Succeeded);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(5); 3]
        );
    }

    #[test]
    fn poll_failed_carries_provider_error() {
        let sleeper = CountingSleeper::default();
        let start = job(BulkStatus::Created);
        let err = poll_until_terminal(&sleeper, Duration::from_secs(5), &start, |_| {
            let mut failed = job(BulkStatus::Failed);
            failed.error = Some(json!({ "sys": { "id": "BadRequest" } }));
            Ok(failed)
        })
        .unwrap_err();

        match err {
            StoreError::BulkActionFailed { action, job_id, error } => {
                assert_eq!(action, BulkAction::Publish);
                assert_eq!(job_id, "job-1");
                assert_eq!(error, json!({ "sys": { "id": "BadRequest" } }));
            }
            other => panic!("expected bulk failure, got {other:?}"),
        }
    }
}
