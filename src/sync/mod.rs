pub mod partition;
pub mod store;

pub use partition::{partition, PartitionView};
pub use store::{ApplyOutcome, LocalRecordStore};
