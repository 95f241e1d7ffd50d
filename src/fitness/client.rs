use chrono::{Duration, Utc};
use reqwest::{header::AUTHORIZATION, Client};
use url::Url;

use super::types::{AggregateRequest, AggregateResponse};
use crate::{error::SyncError, models::FitnessSample, oauth::BearerToken};

// Set to false to silence query logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_AGGREGATE_URL: &str =
    "https://www.googleapis.com/fitness/v1/users/me/dataset:aggregate";

/// What a step query produced when the provider answered.
#[derive(Debug)]
pub enum QueryOutcome {
    Sample(FitnessSample),
    /// Well-formed answer with no step value in it.
    Empty,
    /// Body did not have the aggregate shape. Treated as "no sample" by callers.
    Malformed(SyncError),
}

/// Step-count reader for the fitness provider's aggregate endpoint.
#[derive(Clone)]
pub struct FitnessClient {
    http: Client,
    endpoint: Url,
}

impl FitnessClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }

    /// Most recent step count over the last `window_minutes`.
    ///
    /// Network and HTTP failures are errors. A window that cannot be
    /// represented is rejected before any request is made.
    pub async fn query_recent_steps(
        &self,
        token: &BearerToken,
        window_minutes: i64,
    ) -> Result<QueryOutcome, SyncError> {
        let window_end = Utc::now();
        let window_start = Duration::try_minutes(window_minutes)
            .filter(|window| *window > Duration::zero())
            .and_then(|window| window_end.checked_sub_signed(window))
            .ok_or_else(|| {
                SyncError::Validation(format!(
                    "step window of {window_minutes} minute(s) is out of range"
                ))
            })?;
        let request = AggregateRequest::step_count(
            window_start.timestamp_millis(),
            window_end.timestamp_millis(),
        );

        log_debug!(
            "querying steps from {} to {}",
            window_start.to_rfc3339(),
            window_end.to_rfc3339()
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .json(&request)
            .send()
            .await
            .map_err(|err| SyncError::transport("aggregate query", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::transport(
                "aggregate query",
                format!("status {status}: {body}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|err| SyncError::transport("aggregate query", err))?;

        let parsed = match serde_json::from_str::<AggregateResponse>(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                log_warn!("aggregate response is not in the expected shape: {err}");
                return Ok(QueryOutcome::Malformed(SyncError::Decode(err.to_string())));
            }
        };

        let Some(steps) = parsed.latest_step_count() else {
            log_info!("no step sample in the last {window_minutes} minute(s)");
            return Ok(QueryOutcome::Empty);
        };

        Ok(QueryOutcome::Sample(FitnessSample {
            steps,
            window_start,
            window_end,
        }))
    }
}
