use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use super::{CommitOutcome, DeleteOutcome, Draft, EditState};
use crate::{
    channel::CollectionChannel,
    error::SyncError,
    models::{GlucoseValue, MeasurementPatch, MeasurementRecord, NewMeasurement, Profile},
};

/// The single in-flight edit draft.
///
/// Submissions never touch the local store: whatever they change shows up
/// only when the next snapshot arrives through the subscription.
pub struct EditSession<C: CollectionChannel + ?Sized> {
    channel: Arc<C>,
    collection: String,
    state: EditState,
    draft: Draft,
}

impl<C: CollectionChannel + ?Sized> EditSession<C> {
    pub fn new(channel: Arc<C>, collection: impl Into<String>) -> Self {
        Self {
            channel,
            collection: collection.into(),
            state: EditState::Idle,
            draft: Draft::default(),
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Loads `record` into the draft, replacing any edit already in progress.
    pub fn start_edit(&mut self, record: &MeasurementRecord) {
        if let EditState::Editing { id } = &self.state {
            if id != &record.id {
                info!("abandoning edit of {id} for {}", record.id);
            }
        }
        self.state = EditState::Editing {
            id: record.id.clone(),
        };
        self.draft = Draft::from_record(record);
    }

    /// Resets the draft and returns to `Idle`.
    pub fn clear(&mut self) {
        self.state = EditState::Idle;
        self.draft = Draft::default();
    }

    pub async fn commit(
        &mut self,
        owner: Profile,
        value: f64,
        note: &str,
    ) -> Result<CommitOutcome, SyncError> {
        self.draft = Draft {
            value: Some(value),
            note: note.to_string(),
        };
        let value = GlucoseValue::new(value)?;

        let outcome = match &self.state {
            EditState::Editing { id } => {
                let patch = MeasurementPatch {
                    value: Some(value),
                    note: Some(note.to_string()),
                };
                self.channel
                    .submit_update(&self.collection, id, patch)
                    .await?;
                CommitOutcome::Updated { id: id.clone() }
            }
            EditState::Idle => {
                let document = NewMeasurement {
                    value,
                    note: note.to_string(),
                    timestamp: Utc::now(),
                    owner,
                };
                let id = self
                    .channel
                    .submit_create(&self.collection, document)
                    .await?;
                CommitOutcome::Created { id }
            }
        };

        info!("committed {outcome:?}");
        self.clear();
        Ok(outcome)
    }

    /// Deletes `id` only if `confirm` agrees; declining never reaches the channel.
    pub async fn request_delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<DeleteOutcome, SyncError> {
        if !confirm(id) {
            info!("delete of {id} declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.channel.submit_delete(&self.collection, id).await?;

        if self.state.editing_id() == Some(id) {
            warn!("record {id} deleted while being edited; discarding draft");
            self.clear();
        }
        Ok(DeleteOutcome::Deleted)
    }
}
