//! Ties the sync core together for one running client.
//!
//! `FamilyApp` owns the record store, the active profile, the edit draft, the
//! fitness handshake and the displayed step sample. Every failed operation is
//! sent to the [`ErrorReporter`] before being returned, so the UI has one place
//! to listen for problems.

use std::sync::Arc;

use log::info;
use url::Url;

use crate::{
    channel::{CollectionChannel, Snapshot, Subscription},
    edit::{CommitOutcome, DeleteOutcome, Draft, EditSession, EditState},
    error::{ErrorReporter, SyncError},
    fitness::{FitnessClient, QueryOutcome},
    models::{FitnessSample, Profile},
    oauth::{BearerToken, LinkState, OAuthHandshake, Redirector},
    sync::{partition, ApplyOutcome, LocalRecordStore, PartitionView},
};

pub struct FamilyApp<C: CollectionChannel + ?Sized> {
    channel: Arc<C>,
    collection: String,
    store: LocalRecordStore,
    profile: Profile,
    edit: EditSession<C>,
    oauth: OAuthHandshake,
    fitness: FitnessClient,
    step_window_minutes: i64,
    sample: Option<FitnessSample>,
    reporter: ErrorReporter,
}

impl<C: CollectionChannel + ?Sized> FamilyApp<C> {
    pub fn new(
        channel: Arc<C>,
        collection: impl Into<String>,
        profile: Profile,
        oauth: OAuthHandshake,
        fitness: FitnessClient,
        step_window_minutes: i64,
        reporter: ErrorReporter,
    ) -> Self {
        let collection = collection.into();
        Self {
            edit: EditSession::new(channel.clone(), collection.clone()),
            channel,
            collection,
            store: LocalRecordStore::new(),
            profile,
            oauth,
            fitness,
            step_window_minutes,
            sample: None,
            reporter,
        }
    }

    /// Opens a fresh feed; the store accepts it even if its sequence restarts.
    pub async fn subscribe(&mut self) -> Result<Subscription, SyncError> {
        let subscription = self
            .channel
            .subscribe(&self.collection)
            .await
            .inspect_err(|err| self.reporter.report("subscribe", err))?;
        self.store.forget_sequence();
        Ok(subscription)
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> ApplyOutcome {
        self.store.apply(snapshot)
    }

    /// Waits for the next snapshot and applies it. `None` once the feed is closed.
    pub async fn pump_once(&mut self, subscription: &mut Subscription) -> Option<ApplyOutcome> {
        let snapshot = subscription.next().await?;
        Some(self.apply_snapshot(snapshot))
    }

    pub fn view(&self) -> PartitionView<'_> {
        partition(self.store.records(), self.profile)
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Changes the active profile. The step sample and any draft belong to the
    /// previous profile and are dropped.
    pub fn switch_profile(&mut self, profile: Profile) {
        if profile == self.profile {
            return;
        }
        info!("switching profile {} -> {}", self.profile, profile);
        self.profile = profile;
        self.sample = None;
        self.edit.clear();
    }

    pub fn edit_state(&self) -> &EditState {
        self.edit.state()
    }

    pub fn draft(&self) -> &Draft {
        self.edit.draft()
    }

    /// Starts editing a record of the active profile by id.
    pub fn start_edit(&mut self, id: &str) -> Result<(), SyncError> {
        let record = self
            .view()
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| SyncError::Validation(format!("no record {id} for {}", self.profile)))
            .inspect_err(|err| self.reporter.report("start_edit", err))?;
        self.edit.start_edit(&record);
        Ok(())
    }

    pub fn clear_draft(&mut self) {
        self.edit.clear();
    }

    pub async fn commit(&mut self, value: f64, note: &str) -> Result<CommitOutcome, SyncError> {
        let result = self.edit.commit(self.profile, value, note).await;
        result.inspect_err(|err| self.reporter.report("commit", err))
    }

    pub async fn request_delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<DeleteOutcome, SyncError> {
        let result = self.edit.request_delete(id, confirm).await;
        result.inspect_err(|err| self.reporter.report("delete", err))
    }

    pub fn link_state(&self) -> LinkState {
        self.oauth.state(self.profile)
    }

    pub fn is_connected(&self) -> bool {
        self.oauth.is_connected(self.profile)
    }

    pub fn begin_link(&mut self, redirector: &dyn Redirector) -> Result<Url, SyncError> {
        let result = self.oauth.begin_link(self.profile, redirector);
        result.inspect_err(|err| self.reporter.report("begin_link", err))
    }

    /// Starts the handshake unless this session already holds a token. The
    /// durable flag alone does not count, since tokens are not kept across runs.
    pub fn link_if_no_token(
        &mut self,
        redirector: &dyn Redirector,
    ) -> Result<Option<Url>, SyncError> {
        if self.link_state() == LinkState::Linked {
            return Ok(None);
        }
        if self.is_connected() {
            info!("no fitness token held for {}; authorize again", self.profile);
        } else {
            info!("fitness account not linked for {}", self.profile);
        }
        self.begin_link(redirector).map(Some)
    }

    pub fn complete_link_if_present(
        &mut self,
        location: &str,
    ) -> Result<Option<BearerToken>, SyncError> {
        let result = self.oauth.complete_link_if_present(location, self.profile);
        result.inspect_err(|err| self.reporter.report("complete_link", err))
    }

    pub fn sample(&self) -> Option<&FitnessSample> {
        self.sample.as_ref()
    }

    /// Queries the provider for the active profile. A "no sample" answer and a
    /// failure both leave the displayed sample as it was. A malformed answer is
    /// reported but otherwise counts as "no sample".
    pub async fn refresh_steps(&mut self) -> Result<Option<&FitnessSample>, SyncError> {
        let Some(token) = self.oauth.token(self.profile).cloned() else {
            info!("no fitness token for {}; skipping step refresh", self.profile);
            return Ok(self.sample.as_ref());
        };

        let result = self
            .fitness
            .query_recent_steps(&token, self.step_window_minutes)
            .await;

        match result {
            Ok(QueryOutcome::Sample(sample)) => {
                self.sample = Some(sample);
            }
            Ok(QueryOutcome::Empty) => {}
            Ok(QueryOutcome::Malformed(err)) => {
                self.reporter.report("refresh_steps", &err);
            }
            Err(err) => {
                self.reporter.report("refresh_steps", &err);
                return Err(err);
            }
        }
        Ok(self.sample.as_ref())
    }
}
