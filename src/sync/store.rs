use log::{debug, warn};

use crate::{channel::Snapshot, models::MeasurementRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { records: usize },
    /// Snapshot was older than (or the same as) the last applied one and was ignored.
    Stale { seq: u64, last_applied: u64 },
}

/// In-memory mirror of the remote collection, in arrival order.
///
/// The only way in is [`LocalRecordStore::apply`]: each snapshot replaces the
/// whole contents, which is also how deletions show up.
#[derive(Debug, Default)]
pub struct LocalRecordStore {
    records: Vec<MeasurementRecord>,
    last_seq: Option<u64>,
}

impl LocalRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, snapshot: Snapshot) -> ApplyOutcome {
        if let (Some(seq), Some(last_applied)) = (snapshot.seq, self.last_seq) {
            if seq <= last_applied {
                warn!("ignoring stale snapshot {seq} (last applied {last_applied})");
                return ApplyOutcome::Stale { seq, last_applied };
            }
        }

        if snapshot.seq.is_some() {
            self.last_seq = snapshot.seq;
        }
        self.records = snapshot.records;
        debug!(
            "applied snapshot {:?} with {} record(s)",
            self.last_seq,
            self.records.len()
        );

        ApplyOutcome::Applied {
            records: self.records.len(),
        }
    }

    /// Drops the sequence marker so a fresh subscription can start over.
    pub fn forget_sequence(&mut self) {
        self.last_seq = None;
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&MeasurementRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
