//! Content store management API client.
//!
//! Constructed once from [`Config`] and passed by reference to every
//! reconciler. All requests carry a bearer token and the management content
//! type; requests with a known version carry `X-Contentful-Version`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use curator_core::{
    Config, ConfigError, EntryDraft, EntryId, PublishItem, RemoteEntry, WebhookState,
};

use crate::batch::{self, BulkAction, BulkJob, Sleeper, ThreadSleeper};
use crate::error::{malformed, StoreError};
use crate::query::EntryQuery;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, UreqTransport};

pub const MANAGEMENT_CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";
pub const VERSION_HEADER: &str = "X-Contentful-Version";
pub const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// `…/spaces/{space}/environments/{env}/`: entries and bulk actions.
    pub environment_url: String,
    /// `…/spaces/{space}/`: webhook definitions.
    pub space_url: String,
    pub token: String,
    pub poll_interval: Duration,
    pub batch_size: usize,
}

impl StoreSettings {
    /// Resolve settings, reading the token from the environment.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            environment_url: config.environment_url(),
            space_url: config.space_url(),
            token: config.token()?,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            batch_size: config.bulk_batch_size,
        })
    }
}

/// Response to an entry upsert. Statuses other than 200/201 are failures the
/// caller reports; a version mismatch is never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub status: u16,
    pub body: Value,
}

impl UpsertOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201)
    }

    /// `sys.version` of the written entry.
    pub fn version(&self) -> Option<u64> {
        self.body
            .get("sys")
            .and_then(|sys| sys.get("version"))
            .and_then(Value::as_u64)
    }
}

#[derive(Debug, Deserialize)]
struct EntryPage {
    total: usize,
    #[serde(default)]
    items: Vec<RemoteEntry>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ContentStore<T: Transport> {
    transport: T,
    settings: StoreSettings,
    sleeper: Box<dyn Sleeper>,
}

impl ContentStore<UreqTransport> {
    /// Production client: `ureq` transport, wall-clock polling.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let settings = StoreSettings::from_config(config)?;
        let transport = UreqTransport::new(Duration::from_secs(config.request_timeout_secs));
        Ok(Self::new(transport, settings))
    }
}

impl<T: Transport> ContentStore<T> {
    pub fn new(transport: T, settings: StoreSettings) -> Self {
        Self {
            transport,
            settings,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the clock used between bulk status checks.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn request(&self, method: Method, url: String, version: Option<u64>) -> HttpRequest {
        let mut request = HttpRequest::new(method, url)
            .header("Authorization", format!("Bearer {}", self.settings.token))
            .header("Content-Type", MANAGEMENT_CONTENT_TYPE);
        if let Some(version) = version {
            request = request.header(VERSION_HEADER, version.to_string());
        }
        request
    }

    fn environment_url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.environment_url)
    }

    fn space_url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.space_url)
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// `PUT entries/{id}`: creates when `version` is `None`, otherwise
    /// updates if `version` matches the remote one.
    pub fn upsert_entry(
        &self,
        id: &EntryId,
        content_type: &str,
        version: Option<u64>,
        draft: &EntryDraft,
    ) -> Result<UpsertOutcome, StoreError> {
        let request = self
            .request(Method::Put, self.environment_url(&format!("entries/{id}")), version)
            .header(CONTENT_TYPE_HEADER, content_type)
            .json(serde_json::to_value(draft)?);
        let HttpResponse { status, body } = self.transport.send(&request)?;
        Ok(UpsertOutcome { status, body })
    }

    /// Unpublish then archive, both keyed by `version`. Either step failing
    /// leaves the archive incomplete and is returned as an error.
    pub fn archive_entry(&self, id: &EntryId, version: u64) -> Result<(), StoreError> {
        let unpublish = self.request(
            Method::Delete,
            self.environment_url(&format!("entries/{id}/published")),
            Some(version),
        );
        expect_success(self.transport.send(&unpublish)?, || format!("unpublish entry {id}"))?;

        let archive = self.request(
            Method::Put,
            self.environment_url(&format!("entries/{id}/archived")),
            Some(version),
        );
        expect_success(self.transport.send(&archive)?, || format!("archive entry {id}"))?;
        Ok(())
    }

    /// `GET entries`, following `skip` until `total` entries are collected.
    pub fn list_entries(&self, query: &EntryQuery) -> Result<Vec<RemoteEntry>, StoreError> {
        let mut entries: Vec<RemoteEntry> = Vec::new();
        loop {
            let request = self
                .request(Method::Get, self.environment_url("entries"), None)
                .query_pairs(query.to_params(entries.len()));
            let response = self.transport.send(&request)?;
            if response.status != 200 {
                return Err(StoreError::Status {
                    context: "list entries".to_string(),
                    status: response.status,
                    body: response.body,
                });
            }

            let page: EntryPage = serde_json::from_value(response.body)?;
            let received = page.items.len();
            entries.extend(page.items);
            tracing::debug!("listed {} / {} entries", entries.len(), page.total);

            if received == 0 || entries.len() >= page.total {
                break;
            }
        }
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Bulk actions
    // -----------------------------------------------------------------------

    fn submit_batch(
        &self,
        batch: &[PublishItem],
        action: BulkAction,
    ) -> Result<BulkJob, StoreError> {
        let items: Vec<Value> = batch
            .iter()
            .map(|item| {
                json!({
                    "sys": {
                        "type": "Link",
                        "linkType": "Entry",
                        "id": item.id,
                        "version": item.version,
                    }
                })
            })
            .collect();
        let request = self
            .request(
                Method::Post,
                self.environment_url(&format!("bulk_actions/{action}")),
                None,
            )
            .json(json!({ "entities": { "sys": { "type": "Array" }, "items": items } }));

        let response = self.transport.send(&request)?;
        let response = expect_success(response, || format!("bulk {action}"))?;
        let job = BulkJob::from_body(action, batch.len(), &response.body)?;
        tracing::info!(
            "submitted bulk {action} job {} for {} entries ({:?})",
            job.id,
            job.items,
            job.status
        );
        Ok(job)
    }

    /// Chunk `items` into provider-sized batches and submit each one.
    ///
    /// Returns one job handle per batch, in batch order.
    pub fn submit_bulk_action(
        &self,
        items: &[PublishItem],
        action: BulkAction,
    ) -> Result<Vec<BulkJob>, StoreError> {
        batch::chunk(items, self.settings.batch_size)
            .iter()
            .map(|batch| self.submit_batch(batch, action))
            .collect()
    }

    /// One status check for a job.
    pub fn bulk_action_status(&self, job: &BulkJob) -> Result<BulkJob, StoreError> {
        let request = self.request(
            Method::Get,
            self.environment_url(&format!("bulk_actions/actions/{}", job.id)),
            None,
        );
        let response = expect_success(self.transport.send(&request)?, || {
            format!("bulk {} status for job {}", job.action, job.id)
        })?;
        let current = BulkJob::from_body(job.action, job.items, &response.body)?;
        tracing::info!(
            "waiting on bulk {} job {}: {:?}",
            current.action,
            current.id,
            current.status
        );
        Ok(current)
    }

    /// Poll `job` on the configured interval until it succeeds or fails.
    ///
    /// No retry cap; wrap with an external deadline if one is needed.
    pub fn poll_bulk_action(&self, job: &BulkJob) -> Result<BulkJob, StoreError> {
        batch::poll_until_terminal(
            self.sleeper.as_ref(),
            self.settings.poll_interval,
            job,
            |job| self.bulk_action_status(job),
        )
    }

    /// Submit and poll every batch. Batches cover disjoint entries, so each
    /// runs on its own scoped thread; the first error wins once all finish.
    pub fn run_bulk_action(
        &self,
        items: &[PublishItem],
        action: BulkAction,
    ) -> Result<Vec<BulkJob>, StoreError> {
        let batches = batch::chunk(items, self.settings.batch_size);
        let results: Vec<Result<BulkJob, StoreError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = batches
                .iter()
                .map(|batch| {
                    scope.spawn(move || {
                        let job = self.submit_batch(batch, action)?;
                        self.poll_bulk_action(&job)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        results.into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Webhooks
    // -----------------------------------------------------------------------

    pub fn get_webhook_state(&self, webhook_id: &str) -> Result<WebhookState, StoreError> {
        let request = self.request(
            Method::Get,
            self.space_url(&format!("webhook_definitions/{webhook_id}")),
            None,
        );
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(StoreError::Webhook {
                webhook_id: webhook_id.to_string(),
                step: "read",
                status: response.status,
                body: response.body,
            });
        }
        parse_webhook(webhook_id, response.body)
    }

    /// Write `active`, carrying the version from the preceding read.
    pub fn set_webhook_state(
        &self,
        webhook_id: &str,
        active: bool,
        current: &WebhookState,
    ) -> Result<WebhookState, StoreError> {
        let mut definition = current.definition.clone();
        definition.insert("active".to_string(), Value::Bool(active));
        let request = self
            .request(
                Method::Put,
                self.space_url(&format!("webhook_definitions/{webhook_id}")),
                Some(current.version),
            )
            .json(Value::Object(definition));
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(StoreError::Webhook {
                webhook_id: webhook_id.to_string(),
                step: "write",
                status: response.status,
                body: response.body,
            });
        }
        tracing::info!("webhook {webhook_id} set active={active}");
        parse_webhook(webhook_id, response.body)
    }

    /// Turn the webhook on, writing with the version just read. An already
    /// active webhook is returned as is.
    pub fn enable_webhook(&self, webhook_id: &str) -> Result<WebhookState, StoreError> {
        let current = self.get_webhook_state(webhook_id)?;
        if current.active {
            return Ok(current);
        }
        self.set_webhook_state(webhook_id, true, &current)
    }

    /// Fire the webhook target once by hand. Sent without store credentials.
    pub fn trigger_webhook(&self, url: &str) -> Result<u16, StoreError> {
        let response = self.transport.send(&HttpRequest::new(Method::Get, url))?;
        let response = expect_success(response, || format!("webhook trigger {url}"))?;
        Ok(response.status)
    }

    /// Look up the webhook's target and fire it once.
    pub fn fire_webhook(&self, webhook_id: &str) -> Result<u16, StoreError> {
        let state = self.get_webhook_state(webhook_id)?;
        self.trigger_webhook(&state.url)
    }
}

fn expect_success(
    response: HttpResponse,
    context: impl FnOnce() -> String,
) -> Result<HttpResponse, StoreError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status {
            context: context(),
            status: response.status,
            body: response.body,
        })
    }
}

fn parse_webhook(webhook_id: &str, body: Value) -> Result<WebhookState, StoreError> {
    let context = format!("webhook {webhook_id}");
    let Value::Object(mut definition) = body else {
        return Err(malformed(context, "definition is not an object"));
    };
    let version = definition
        .remove("sys")
        .and_then(|sys| sys.get("version").and_then(Value::as_u64))
        .ok_or_else(|| malformed(&context, "missing sys.version"))?;
    let active = definition
        .get("active")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let url = definition
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(WebhookState {
        active,
        url,
        version,
        definition,
    })
}
