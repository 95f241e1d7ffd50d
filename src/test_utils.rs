//! Shared fixtures for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    channel::{CollectionChannel, Snapshot, Subscription},
    error::SyncError,
    models::{GlucoseValue, MeasurementPatch, MeasurementRecord, NewMeasurement, Profile},
};

pub fn record(id: &str, value: f64, owner: Profile) -> MeasurementRecord {
    MeasurementRecord {
        id: id.to_string(),
        value: GlucoseValue::new(value).unwrap(),
        note: String::new(),
        timestamp: Utc::now(),
        owner,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(NewMeasurement),
    Update(String, MeasurementPatch),
    Delete(String),
}

/// Channel double that records every mutation and can be told to fail them.
pub struct RecordingChannel {
    calls: Mutex<Vec<Call>>,
    fail_mutations: Mutex<bool>,
    feed: watch::Sender<Snapshot>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_mutations: Mutex::new(false),
            feed: watch::channel(Snapshot::default()).0,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_mutations(&self, fail: bool) {
        *self.fail_mutations.lock().unwrap() = fail;
    }

    /// Pushes a snapshot to every subscriber, as the remote store would.
    pub fn push(&self, snapshot: Snapshot) {
        self.feed.send_replace(snapshot);
    }

    fn record_call(&self, operation: &'static str, call: Call) -> Result<(), SyncError> {
        if *self.fail_mutations.lock().unwrap() {
            return Err(SyncError::transport(operation, "network unreachable"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl CollectionChannel for RecordingChannel {
    async fn subscribe(&self, collection: &str) -> Result<Subscription, SyncError> {
        Ok(Subscription::new(
            collection,
            self.feed.subscribe(),
            CancellationToken::new(),
        ))
    }

    async fn submit_create(
        &self,
        _collection: &str,
        document: NewMeasurement,
    ) -> Result<String, SyncError> {
        self.record_call("create", Call::Create(document))?;
        Ok(format!("doc-{}", self.calls.lock().unwrap().len()))
    }

    async fn submit_update(
        &self,
        _collection: &str,
        id: &str,
        patch: MeasurementPatch,
    ) -> Result<(), SyncError> {
        self.record_call("update", Call::Update(id.to_string(), patch))
    }

    async fn submit_delete(&self, _collection: &str, id: &str) -> Result<(), SyncError> {
        self.record_call("delete", Call::Delete(id.to_string()))
    }
}
