//! Webhook safety around bulk publishes.
//!
//! A bulk publish fires the deploy webhook once per entry. The guard turns
//! the webhook off for the duration of the bulk action, puts it back the way
//! it was, and fires it exactly once by hand.
//!
//! Restoration runs on every exit path: explicitly through
//! [`WebhookGuard::restore`], or from `Drop` if the guard is abandoned by an
//! early return or a panic.

use curator_core::{PublishItem, WebhookState};

use crate::batch::BulkAction;
use crate::client::ContentStore;
use crate::error::StoreError;
use crate::transport::Transport;

/// A webhook disabled for the lifetime of the guard.
pub struct WebhookGuard<'a, T: Transport> {
    store: &'a ContentStore<T>,
    webhook_id: String,
    previous: WebhookState,
    restored: bool,
}

impl<'a, T: Transport> WebhookGuard<'a, T> {
    /// Read the current webhook state and disable it if active.
    ///
    /// Any read/write failure is returned before anything is changed remotely
    /// beyond the failed write itself.
    pub fn disable(store: &'a ContentStore<T>, webhook_id: &str) -> Result<Self, StoreError> {
        let previous = store.get_webhook_state(webhook_id)?;
        if previous.active {
            store.set_webhook_state(webhook_id, false, &previous)?;
        } else {
            tracing::info!("webhook {webhook_id} already inactive; leaving it off");
        }
        Ok(Self {
            store,
            webhook_id: webhook_id.to_string(),
            previous,
            restored: false,
        })
    }

    /// Put the webhook back to its previous state and fire it once.
    pub fn restore(mut self) -> Result<(), StoreError> {
        self.restored = true;
        self.restore_inner()
    }

    fn restore_inner(&self) -> Result<(), StoreError> {
        if !self.previous.active {
            return Ok(());
        }

        // Re-read: the disable write bumped the version.
        self.store.enable_webhook(&self.webhook_id)?;

        if let Err(err) = self.store.trigger_webhook(&self.previous.url) {
            tracing::warn!(
                "failed to manually trigger webhook {}: {err}",
                self.webhook_id
            );
        }
        Ok(())
    }
}

impl<T: Transport> Drop for WebhookGuard<'_, T> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if let Err(err) = self.restore_inner() {
            tracing::error!("failed to restore webhook {}: {err}", self.webhook_id);
        }
    }
}

/// Run a bulk action with the webhook disabled.
///
/// No-op when `skip` is set (dry run) or `items` is empty. If the bulk
/// action fails the webhook is still restored before the error is returned;
/// when both fail, the bulk error wins and the restore error is logged.
pub fn guarded_bulk_publish<T: Transport>(
    store: &ContentStore<T>,
    webhook_id: &str,
    items: &[PublishItem],
    action: BulkAction,
    skip: bool,
) -> Result<(), StoreError> {
    if skip || items.is_empty() {
        tracing::debug!(
            "skipping bulk {action} (skip={skip}, {} entries)",
            items.len()
        );
        return Ok(());
    }

    let guard = WebhookGuard::disable(store, webhook_id)?;
    let outcome = store.run_bulk_action(items, action);
    let restored = guard.restore();

    match (outcome, restored) {
        (Ok(jobs), Ok(())) => {
            tracing::info!(
                "bulk {action} of {} entries finished in {} batches",
                items.len(),
                jobs.len()
            );
            Ok(())
        }
        (Err(err), Ok(())) | (Ok(_), Err(err)) => Err(err),
        (Err(err), Err(restore_err)) => {
            tracing::error!("failed to restore webhook {webhook_id}: {restore_err}");
            Err(err)
        }
    }
}
