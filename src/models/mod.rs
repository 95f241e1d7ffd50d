pub mod fitness;
pub mod measurement;
pub mod profile;

pub use fitness::FitnessSample;
pub use measurement::{GlucoseValue, MeasurementPatch, MeasurementRecord, NewMeasurement};
pub use profile::Profile;
