//! In-memory emulation of the content store management API.
//!
//! Enabled for this crate's unit tests and, through the `test-util` feature,
//! for downstream integration tests. It keeps entries with versions, tags,
//! publish/archive flags, bulk jobs, and one webhook definition, and records
//! every request so tests can assert on side effects.
//!
//! Unpublish does not bump the entry version; archive does.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Map, Value};

use curator_core::TagLink;

use crate::batch::Sleeper;
use crate::client::{ContentStore, StoreSettings, CONTENT_TYPE_HEADER, VERSION_HEADER};
use crate::error::StoreError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

pub const MOCK_API: &str = "https://store.test";
pub const MOCK_SPACE: &str = "sp1";
pub const MOCK_TOKEN: &str = "test-token";
pub const MOCK_WEBHOOK_ID: &str = "wh1";
pub const MOCK_WEBHOOK_URL: &str = "https://hooks.test/deploy";

/// Stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MockEntry {
    pub id: String,
    pub content_type: String,
    pub version: u64,
    pub tags: Vec<String>,
    pub fields: Map<String, Value>,
    pub published: bool,
    pub archived: bool,
}

impl MockEntry {
    fn to_json(&self) -> Value {
        let tags: Vec<TagLink> = self.tags.iter().map(TagLink::new).collect();
        let archived_at = if self.archived {
            json!("2026-01-01T00:00:00Z")
        } else {
            Value::Null
        };
        json!({
            "sys": {
                "id": self.id,
                "type": "Entry",
                "version": self.version,
                "archivedAt": archived_at,
                "contentType": { "sys": { "id": self.content_type } },
            },
            "metadata": { "tags": tags },
            "fields": self.fields,
        })
    }
}

/// One request as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path relative to the environment or space root; full URL otherwise.
    pub path: String,
    pub version: Option<u64>,
    pub body: Option<Value>,
    pub authorized: bool,
    /// `true` for requests addressed to the store itself.
    pub store_bound: bool,
}

impl RecordedRequest {
    pub fn is_mutation(&self) -> bool {
        self.store_bound && self.method != Method::Get
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeed,
    Fail,
}

#[derive(Debug)]
struct MockJob {
    action: String,
    items: Vec<String>,
    polls_left: u32,
    outcome: JobOutcome,
    status: &'static str,
}

#[derive(Debug)]
struct State {
    entries: BTreeMap<String, MockEntry>,
    webhook: Map<String, Value>,
    webhook_version: u64,
    jobs: BTreeMap<u64, MockJob>,
    next_job: u64,
    requests: Vec<RecordedRequest>,
    page_cap: usize,
    polls_before_done: u32,
    job_outcome: JobOutcome,
    fail_upsert: HashSet<String>,
    fail_archive: HashSet<String>,
    fail_webhook_read: bool,
    fail_webhook_write: bool,
    fail_trigger: bool,
    triggers: usize,
}

/// In-memory content store. Implements [`Transport`].
#[derive(Debug)]
pub struct MockStore {
    state: Mutex<State>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Empty store with an active webhook; bulk jobs succeed after one
    /// in-progress check.
    pub fn new() -> Self {
        let mut webhook = Map::new();
        webhook.insert("name".to_string(), json!("deploy"));
        webhook.insert("url".to_string(), json!(MOCK_WEBHOOK_URL));
        webhook.insert("active".to_string(), json!(true));
        webhook.insert("topics".to_string(), json!(["Entry.publish", "Entry.archive"]));

        Self {
            state: Mutex::new(State {
                entries: BTreeMap::new(),
                webhook,
                webhook_version: 1,
                jobs: BTreeMap::new(),
                next_job: 1,
                requests: Vec::new(),
                page_cap: 1000,
                polls_before_done: 1,
                job_outcome: JobOutcome::Succeed,
                fail_upsert: HashSet::new(),
                fail_archive: HashSet::new(),
                fail_webhook_read: false,
                fail_webhook_write: false,
                fail_trigger: false,
                triggers: 0,
            }),
        }
    }

    /// Settings pointing at this store.
    pub fn settings() -> StoreSettings {
        StoreSettings {
            environment_url: environment_prefix(),
            space_url: space_prefix(),
            token: MOCK_TOKEN.to_string(),
            poll_interval: Duration::from_secs(5),
            batch_size: crate::batch::MAX_BULK_BATCH,
        }
    }

    /// Client over this store with an instant sleeper.
    pub fn client(self: &Arc<Self>) -> ContentStore<Arc<MockStore>> {
        self.client_with_sleeper(InstantSleeper::default())
    }

    pub fn client_with_sleeper(
        self: &Arc<Self>,
        sleeper: InstantSleeper,
    ) -> ContentStore<Arc<MockStore>> {
        ContentStore::new(Arc::clone(self), Self::settings()).with_sleeper(sleeper)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -----------------------------------------------------------------------
    // Seeding and scripting
    // -----------------------------------------------------------------------

    /// Insert a published entry at version 3.
    pub fn seed_entry(&self, id: &str, content_type: &str, tag: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.lock().entries.insert(
            id.to_string(),
            MockEntry {
                id: id.to_string(),
                content_type: content_type.to_string(),
                version: 3,
                tags: vec![tag.to_string()],
                fields,
                published: true,
                archived: false,
            },
        );
    }

    pub fn set_page_cap(&self, cap: usize) {
        self.lock().page_cap = cap.max(1);
    }

    pub fn set_polls_before_done(&self, polls: u32) {
        self.lock().polls_before_done = polls;
    }

    pub fn fail_bulk_jobs(&self) {
        self.lock().job_outcome = JobOutcome::Fail;
    }

    pub fn fail_upsert_for(&self, id: &str) {
        self.lock().fail_upsert.insert(id.to_string());
    }

    pub fn fail_archive_for(&self, id: &str) {
        self.lock().fail_archive.insert(id.to_string());
    }

    pub fn set_webhook_active(&self, active: bool) {
        self.lock()
            .webhook
            .insert("active".to_string(), Value::Bool(active));
    }

    pub fn fail_webhook_read(&self, fail: bool) {
        self.lock().fail_webhook_read = fail;
    }

    pub fn fail_webhook_write(&self, fail: bool) {
        self.lock().fail_webhook_write = fail;
    }

    pub fn fail_trigger(&self, fail: bool) {
        self.lock().fail_trigger = fail;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn entry(&self, id: &str) -> Option<MockEntry> {
        self.lock().entries.get(id).cloned()
    }

    pub fn entries(&self) -> Vec<MockEntry> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn mutating_requests(&self) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Item count of every submitted bulk job, in submission order.
    pub fn bulk_batches(&self) -> Vec<usize> {
        self.lock().jobs.values().map(|job| job.items.len()).collect()
    }

    pub fn webhook_active(&self) -> bool {
        self.lock()
            .webhook
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn webhook_version(&self) -> u64 {
        self.lock().webhook_version
    }

    pub fn trigger_count(&self) -> usize {
        self.lock().triggers
    }
}

impl Transport for MockStore {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, StoreError> {
        let mut state = self.lock();
        let version = request
            .header_value(VERSION_HEADER)
            .and_then(|v| v.parse::<u64>().ok());
        let bearer = format!("Bearer {MOCK_TOKEN}");
        let authorized = request.header_value("Authorization") == Some(bearer.as_str());

        let env = environment_prefix();
        let space = space_prefix();
        let (path, store_bound) = if let Some(path) = request.url.strip_prefix(&env) {
            (path.to_string(), true)
        } else if let Some(path) = request.url.strip_prefix(&space) {
            (path.to_string(), true)
        } else {
            (request.url.clone(), false)
        };

        state.requests.push(RecordedRequest {
            method: request.method,
            path: path.clone(),
            version,
            body: request.body.clone(),
            authorized,
            store_bound,
        });

        if !store_bound {
            return state.trigger(&request.url);
        }
        if !authorized {
            return Ok(error_response(401, "AccessTokenInvalid"));
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let in_environment = request.url.starts_with(&env);
        let response = match (in_environment, request.method, segments.as_slice()) {
            (true, Method::Get, ["entries"]) => state.list(request),
            (true, Method::Put, ["entries", id]) => state.upsert(id, version, request),
            (true, Method::Delete, ["entries", id, "published"]) => state.unpublish(id, version),
            (true, Method::Put, ["entries", id, "archived"]) => state.archive(id, version),
            (true, Method::Post, ["bulk_actions", action]) => state.submit(action, request),
            (true, Method::Get, ["bulk_actions", "actions", job]) => state.poll(job),
            (false, Method::Get, ["webhook_definitions", id]) => state.read_webhook(id),
            (false, Method::Put, ["webhook_definitions", id]) => {
                state.write_webhook(id, version, request)
            }
            _ => error_response(404, "NotFound"),
        };
        Ok(response)
    }
}

impl State {
    fn list(&self, request: &HttpRequest) -> HttpResponse {
        let content_type = request.query_value("content_type");
        let tags: Option<Vec<&str>> = request
            .query_value("metadata.tags.sys.id[in]")
            .map(|t| t.split(',').collect());
        let exclude_archived = request.query_value("sys.archivedAt[exists]") == Some("false");
        let skip: usize = request
            .query_value("skip")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let limit: usize = request
            .query_value("limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(100)
            .min(self.page_cap);

        let matching: Vec<&MockEntry> = self
            .entries
            .values()
            .filter(|e| content_type.map_or(true, |ct| e.content_type == ct))
            .filter(|e| {
                tags.as_ref()
                    .map_or(true, |tags| e.tags.iter().any(|t| tags.contains(&t.as_str())))
            })
            .filter(|e| !(exclude_archived && e.archived))
            .collect();
        let items: Vec<Value> = matching
            .iter()
            .skip(skip)
            .take(limit)
            .map(|e| e.to_json())
            .collect();

        HttpResponse::new(
            200,
            json!({
                "sys": { "type": "Array" },
                "total": matching.len(),
                "skip": skip,
                "limit": limit,
                "items": items,
            }),
        )
    }

    fn upsert(&mut self, id: &str, version: Option<u64>, request: &HttpRequest) -> HttpResponse {
        if self.fail_upsert.contains(id) {
            return error_response(409, "VersionMismatch");
        }
        let body = request.body.clone().unwrap_or(Value::Null);
        let fields = body
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let tags: Vec<String> = body
            .pointer("/metadata/tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.pointer("/sys/id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        match self.entries.get_mut(id) {
            Some(entry) if entry.archived => error_response(400, "EntryArchived"),
            Some(entry) if version != Some(entry.version) => error_response(409, "VersionMismatch"),
            Some(entry) => {
                entry.fields = fields;
                entry.tags = tags;
                entry.version += 1;
                HttpResponse::new(200, entry.to_json())
            }
            None if version.is_some() => error_response(404, "NotFound"),
            None => {
                let entry = MockEntry {
                    id: id.to_string(),
                    content_type: request
                        .header_value(CONTENT_TYPE_HEADER)
                        .unwrap_or_default()
                        .to_string(),
                    version: 1,
                    tags,
                    fields,
                    published: false,
                    archived: false,
                };
                let body = entry.to_json();
                self.entries.insert(id.to_string(), entry);
                HttpResponse::new(201, body)
            }
        }
    }

    fn unpublish(&mut self, id: &str, version: Option<u64>) -> HttpResponse {
        match self.entries.get_mut(id) {
            None => error_response(404, "NotFound"),
            Some(entry) if version != Some(entry.version) => error_response(409, "VersionMismatch"),
            Some(entry) => {
                entry.published = false;
                HttpResponse::new(200, entry.to_json())
            }
        }
    }

    fn archive(&mut self, id: &str, version: Option<u64>) -> HttpResponse {
        if self.fail_archive.contains(id) {
            return error_response(422, "ArchiveFailed");
        }
        match self.entries.get_mut(id) {
            None => error_response(404, "NotFound"),
            Some(entry) if version != Some(entry.version) => error_response(409, "VersionMismatch"),
            Some(entry) => {
                entry.archived = true;
                entry.published = false;
                entry.version += 1;
                HttpResponse::new(200, entry.to_json())
            }
        }
    }

    fn submit(&mut self, action: &str, request: &HttpRequest) -> HttpResponse {
        let items: Vec<String> = request
            .body
            .as_ref()
            .and_then(|b| b.pointer("/entities/items"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.pointer("/sys/id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let number = self.next_job;
        self.next_job += 1;
        self.jobs.insert(
            number,
            MockJob {
                action: action.to_string(),
                items,
                polls_left: self.polls_before_done,
                outcome: self.job_outcome,
                status: "created",
            },
        );
        HttpResponse::new(
            201,
            json!({
                "sys": { "id": format!("job-{number}"), "type": "BulkAction", "status": "created" }
            }),
        )
    }

    fn poll(&mut self, job_id: &str) -> HttpResponse {
        let Some(number) = job_id
            .strip_prefix("job-")
            .and_then(|n| n.parse::<u64>().ok())
        else {
            return error_response(404, "NotFound");
        };
        let Some(job) = self.jobs.get_mut(&number) else {
            return error_response(404, "NotFound");
        };

        let mut published = Vec::new();
        if job.status != "succeeded" && job.status != "failed" {
            if job.polls_left > 0 {
                job.polls_left -= 1;
                job.status = "inProgress";
            } else {
                match job.outcome {
                    JobOutcome::Succeed => {
                        job.status = "succeeded";
                        if job.action == "publish" {
                            published = job.items.clone();
                        }
                    }
                    JobOutcome::Fail => job.status = "failed",
                }
            }
        }

        let mut body =
            json!({ "sys": { "id": job_id, "type": "BulkAction", "status": job.status } });
        if job.status == "failed" {
            body["error"] = json!({ "sys": { "type": "Error", "id": "BulkActionFailed" } });
        }

        for id in published {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.published = true;
                entry.version += 1;
            }
        }
        HttpResponse::new(200, body)
    }

    fn webhook_json(&self, id: &str) -> Value {
        let mut definition = self.webhook.clone();
        definition.insert(
            "sys".to_string(),
            json!({ "id": id, "type": "WebhookDefinition", "version": self.webhook_version }),
        );
        Value::Object(definition)
    }

    fn read_webhook(&self, id: &str) -> HttpResponse {
        if id != MOCK_WEBHOOK_ID {
            return error_response(404, "NotFound");
        }
        if self.fail_webhook_read {
            return error_response(500, "InternalServerError");
        }
        HttpResponse::new(200, self.webhook_json(id))
    }

    fn write_webhook(
        &mut self,
        id: &str,
        version: Option<u64>,
        request: &HttpRequest,
    ) -> HttpResponse {
        if id != MOCK_WEBHOOK_ID {
            return error_response(404, "NotFound");
        }
        if self.fail_webhook_write {
            return error_response(500, "InternalServerError");
        }
        if version != Some(self.webhook_version) {
            return error_response(409, "VersionMismatch");
        }
        let Some(Value::Object(definition)) = request.body.clone() else {
            return error_response(400, "BadRequest");
        };
        self.webhook = definition;
        self.webhook_version += 1;
        HttpResponse::new(200, self.webhook_json(id))
    }

    fn trigger(&mut self, url: &str) -> Result<HttpResponse, StoreError> {
        if self.fail_trigger {
            return Err(StoreError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.triggers += 1;
        Ok(HttpResponse::new(200, json!({ "job": "queued" })))
    }
}

fn environment_prefix() -> String {
    format!("{MOCK_API}/spaces/{MOCK_SPACE}/environments/master/")
}

fn space_prefix() -> String {
    format!("{MOCK_API}/spaces/{MOCK_SPACE}/")
}

fn error_response(status: u16, id: &str) -> HttpResponse {
    HttpResponse::new(status, json!({ "sys": { "type": "Error", "id": id } }))
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Records requested sleeps without waiting. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct InstantSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl InstantSleeper {
    pub fn count(&self) -> usize {
        self.slept.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn total(&self) -> Duration {
        self.slept
            .lock()
            .map(|s| s.iter().sum())
            .unwrap_or_default()
    }
}

impl Sleeper for InstantSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}
