//! Curator core library: domain types, identifiers, config, errors.
//!
//! - [`types`]: entries, payloads, result surface
//! - [`id`]: deterministic and random entry identifiers
//! - [`config`]: `~/.curator/config.yaml` load / save / init
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod id;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use id::{new_id_from_key, new_random_id};
pub use types::{
    DesiredRecord, EntryDraft, EntryId, PublishItem, PublishPayload, ReconciliationResult,
    RecordError, RemoteEntry, TagLink, WebhookState,
};
