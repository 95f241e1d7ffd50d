use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent step count reported by the fitness provider for a query window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FitnessSample {
    pub steps: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}
