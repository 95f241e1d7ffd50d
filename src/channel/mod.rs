//! Contract of the remote collection: a live feed of full snapshots plus
//! create/update/delete mutations.
//!
//! Every snapshot is the complete current record set and must replace, never
//! patch, whatever the consumer held before. Mutations are fire-and-report:
//! a failure comes back as [`SyncError::Transport`] and nothing is retried.

pub mod local;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    error::SyncError,
    models::{MeasurementPatch, MeasurementRecord, NewMeasurement},
};

pub use local::LocalDocumentChannel;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Monotonic marker from the transport, when it provides one.
    pub seq: Option<u64>,
    pub records: Vec<MeasurementRecord>,
}

#[async_trait]
pub trait CollectionChannel: Send + Sync {
    async fn subscribe(&self, collection: &str) -> Result<Subscription, SyncError>;

    /// Returns the id the store assigned to the new document.
    async fn submit_create(
        &self,
        collection: &str,
        document: NewMeasurement,
    ) -> Result<String, SyncError>;

    async fn submit_update(
        &self,
        collection: &str,
        id: &str,
        patch: MeasurementPatch,
    ) -> Result<(), SyncError>;

    async fn submit_delete(&self, collection: &str, id: &str) -> Result<(), SyncError>;
}

/// Live feed of snapshots for one collection.
///
/// The feed keeps only the newest snapshot, so a slow consumer skips straight
/// to the latest state. It ends once [`Subscription::close`] is called, the
/// subscription is dropped, or the channel shuts down.
pub struct Subscription {
    collection: String,
    feed: watch::Receiver<Snapshot>,
    cancel: CancellationToken,
    primed: bool,
}

impl Subscription {
    pub fn new(
        collection: impl Into<String>,
        feed: watch::Receiver<Snapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: collection.into(),
            feed,
            cancel,
            primed: false,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Waits for the next snapshot. The first call yields the current state
    /// immediately. Returns `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.cancel.is_cancelled() {
            return None;
        }

        if !self.primed {
            self.primed = true;
            return Some(self.feed.borrow_and_update().clone());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => None,
            changed = self.feed.changed() => match changed {
                Ok(()) => Some(self.feed.borrow_and_update().clone()),
                Err(_) => {
                    self.cancel.cancel();
                    None
                }
            },
        }
    }

    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            log::info!("closing subscription to {}", self.collection);
            self.cancel.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
