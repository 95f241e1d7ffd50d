use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{GlucoseValue, Profile};

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_owner(value: &str) -> Result<Profile> {
    value
        .parse::<Profile>()
        .map_err(|err| anyhow!("invalid owner: {err}"))
}

pub fn parse_value(value: f64) -> Result<GlucoseValue> {
    GlucoseValue::new(value).map_err(|err| anyhow!("invalid value: {err}"))
}
