use std::{collections::HashMap, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use super::{CollectionChannel, Snapshot, Subscription};
use crate::{
    db::Database,
    error::SyncError,
    models::{MeasurementPatch, NewMeasurement},
};

// Set to false to silence per-mutation logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Collection channel backed by the embedded SQLite document store.
///
/// Every successful mutation re-reads the collection inside the same database
/// task and publishes the result to that collection's feed, so subscribers see
/// their own writes (and everyone else's) through the same snapshot path.
pub struct LocalDocumentChannel {
    db: Database,
    feeds: Mutex<HashMap<String, watch::Sender<Snapshot>>>,
    shutdown: CancellationToken,
}

impl LocalDocumentChannel {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            feeds: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn open(db_path: PathBuf) -> Result<Self> {
        Ok(Self::new(Database::new(db_path)?))
    }

    /// Ends every live subscription.
    pub fn shutdown(&self) {
        log_info!("shutting down document channel");
        self.shutdown.cancel();
    }

    async fn publish(&self, collection: &str, snapshot: Snapshot) {
        let feeds = self.feeds.lock().await;
        let Some(feed) = feeds.get(collection) else {
            return;
        };

        let seq = snapshot.seq;
        let advanced = feed.send_if_modified(|current| {
            if is_newer(&snapshot, current) {
                *current = snapshot;
                true
            } else {
                false
            }
        });

        if advanced {
            log_debug!(
                "published {collection} snapshot {:?} to {} subscriber(s)",
                seq,
                feed.receiver_count()
            );
        } else {
            log_debug!("dropped superseded {collection} snapshot {:?}", seq);
        }
    }
}

fn is_newer(candidate: &Snapshot, current: &Snapshot) -> bool {
    match (candidate.seq, current.seq) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => true,
    }
}

#[async_trait]
impl CollectionChannel for LocalDocumentChannel {
    async fn subscribe(&self, collection: &str) -> Result<Subscription, SyncError> {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::transport("subscribe", "channel is shut down"));
        }

        let snapshot = self
            .db
            .load_collection(collection)
            .await
            .map_err(|err| SyncError::transport("subscribe", format!("{err:#}")))?;

        let receiver = {
            let mut feeds = self.feeds.lock().await;
            let feed = feeds
                .entry(collection.to_string())
                .or_insert_with(|| watch::channel(Snapshot::default()).0);
            feed.send_if_modified(|current| {
                if is_newer(&snapshot, current) {
                    *current = snapshot;
                    true
                } else {
                    false
                }
            });
            feed.subscribe()
        };

        log_info!("subscribed to {collection}");
        Ok(Subscription::new(
            collection,
            receiver,
            self.shutdown.child_token(),
        ))
    }

    async fn submit_create(
        &self,
        collection: &str,
        document: NewMeasurement,
    ) -> Result<String, SyncError> {
        let (id, snapshot) = self
            .db
            .insert_document(collection, document)
            .await
            .map_err(|err| SyncError::transport("create", format!("{err:#}")))?;

        log_info!("created {collection}/{id}");
        self.publish(collection, snapshot).await;
        Ok(id)
    }

    async fn submit_update(
        &self,
        collection: &str,
        id: &str,
        patch: MeasurementPatch,
    ) -> Result<(), SyncError> {
        let snapshot = self
            .db
            .update_document(collection, id, patch)
            .await
            .map_err(|err| SyncError::transport("update", format!("{err:#}")))?;

        match snapshot {
            Some(snapshot) => {
                log_info!("updated {collection}/{id}");
                self.publish(collection, snapshot).await;
                Ok(())
            }
            None => {
                log_warn!("update for unknown document {collection}/{id}");
                Err(SyncError::transport(
                    "update",
                    format!("document {id} not found"),
                ))
            }
        }
    }

    async fn submit_delete(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        let snapshot = self
            .db
            .delete_document(collection, id)
            .await
            .map_err(|err| SyncError::transport("delete", format!("{err:#}")))?;

        log_info!("deleted {collection}/{id}");
        self.publish(collection, snapshot).await;
        Ok(())
    }
}
