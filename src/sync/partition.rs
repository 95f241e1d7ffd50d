use crate::models::{MeasurementRecord, Profile};

/// Read-only slice of the store that belongs to one profile, in arrival order.
#[derive(Debug, Clone)]
pub struct PartitionView<'a> {
    profile: Profile,
    rows: Vec<&'a MeasurementRecord>,
}

pub fn partition(records: &[MeasurementRecord], profile: Profile) -> PartitionView<'_> {
    PartitionView {
        profile,
        rows: records
            .iter()
            .filter(|record| record.owner == profile)
            .collect(),
    }
}

impl<'a> PartitionView<'a> {
    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn rows(&self) -> &[&'a MeasurementRecord] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a MeasurementRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reading with the newest timestamp, for the chart headline.
    pub fn latest(&self) -> Option<&'a MeasurementRecord> {
        self.rows.iter().copied().max_by_key(|record| record.timestamp)
    }
}
