use serde::Serialize;

use crate::models::MeasurementRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum EditState {
    /// Form holds a fresh-entry draft.
    Idle,
    /// Form holds an overwrite of the record with this id.
    Editing { id: String },
}

impl Default for EditState {
    fn default() -> Self {
        EditState::Idle
    }
}

impl EditState {
    pub fn editing_id(&self) -> Option<&str> {
        match self {
            EditState::Idle => None,
            EditState::Editing { id } => Some(id),
        }
    }
}

/// Form fields as the user last left them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub value: Option<f64>,
    pub note: String,
}

impl Draft {
    pub fn from_record(record: &MeasurementRecord) -> Self {
        Self {
            value: Some(record.value.get()),
            note: record.note.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.note.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Created { id: String },
    Updated { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}
