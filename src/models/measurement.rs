//! Blood-sugar readings as they travel through the document channel.
//!
//! A reading that has not been persisted yet is a [`NewMeasurement`]; only the
//! store assigns ids, so every [`MeasurementRecord`] carries one. Edits are
//! expressed as a [`MeasurementPatch`], which has no way to touch the owner or
//! the timestamp.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

use super::Profile;

/// Reading in mg/dL. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(try_from = "f64", into = "f64")]
pub struct GlucoseValue(f64);

impl GlucoseValue {
    pub fn new(value: f64) -> Result<Self, SyncError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(SyncError::Validation(format!(
                "reading must be a positive number, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for GlucoseValue {
    type Error = SyncError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GlucoseValue> for f64 {
    fn from(value: GlucoseValue) -> Self {
        value.0
    }
}

impl fmt::Display for GlucoseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mg/dL", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementRecord {
    pub id: String,
    pub value: GlucoseValue,
    #[serde(default)]
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub owner: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMeasurement {
    pub value: GlucoseValue,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub owner: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MeasurementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<GlucoseValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_positive_and_non_finite_readings() {
        assert!(GlucoseValue::new(0.0).is_err());
        assert!(GlucoseValue::new(-12.0).is_err());
        assert!(GlucoseValue::new(f64::NAN).is_err());
        assert!(GlucoseValue::new(f64::INFINITY).is_err());
        assert_eq!(GlucoseValue::new(120.0).unwrap().get(), 120.0);
    }

    #[test]
    fn document_shape_matches_the_collection() {
        let raw = json!({
            "id": "a",
            "value": 120,
            "note": "after lunch",
            "timestamp": "2024-05-01T08:30:00Z",
            "owner": "mom"
        });
        let record: MeasurementRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.value.get(), 120.0);
        assert_eq!(record.owner, Profile::Mom);
        assert_eq!(record.value.to_string(), "120 mg/dL");

        let bad = json!({
            "id": "b",
            "value": 0,
            "note": "",
            "timestamp": "2024-05-01T08:30:00Z",
            "owner": "mom"
        });
        assert!(serde_json::from_value::<MeasurementRecord>(bad).is_err());
    }
}
