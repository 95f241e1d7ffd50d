use std::{env, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::{
    fitness::DEFAULT_AGGREGATE_URL,
    models::Profile,
    oauth::{OAuthConfig, DEFAULT_AUTH_URL, FITNESS_READ_SCOPE},
};

pub const DEFAULT_COLLECTION: &str = "bloodSugarData";
pub const DEFAULT_STEP_WINDOW_MINUTES: i64 = 60;
/// One week.
pub const MAX_STEP_WINDOW_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_dir: PathBuf,
    pub collection: String,
    pub profile: Profile,
    pub oauth: OAuthConfig,
    pub fitness_url: Url,
    pub step_window_minutes: i64,
    pub debug: bool,
    /// Location the browser shell came back to after the authorization page.
    pub return_location: Option<String>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any `FAMSYNC_*` source; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let profile = match get("FAMSYNC_PROFILE") {
            Some(raw) => raw
                .parse::<Profile>()
                .map_err(|err| anyhow!("FAMSYNC_PROFILE: {err}"))?,
            None => Profile::default(),
        };

        let auth_url = get("FAMSYNC_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let auth_url = Url::parse(&auth_url).context("FAMSYNC_AUTH_URL is not a valid URL")?;

        let fitness_url =
            get("FAMSYNC_FITNESS_URL").unwrap_or_else(|| DEFAULT_AGGREGATE_URL.to_string());
        let fitness_url =
            Url::parse(&fitness_url).context("FAMSYNC_FITNESS_URL is not a valid URL")?;

        let step_window_minutes = match get("FAMSYNC_STEP_WINDOW_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|minutes| (1..=MAX_STEP_WINDOW_MINUTES).contains(minutes))
                .ok_or_else(|| {
                    anyhow!(
                        "FAMSYNC_STEP_WINDOW_MINUTES must be between 1 and \
                         {MAX_STEP_WINDOW_MINUTES}, got {raw}"
                    )
                })?,
            None => DEFAULT_STEP_WINDOW_MINUTES,
        };

        let debug = get("FAMSYNC_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            data_dir: get("FAMSYNC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("famsync-data")),
            collection: get("FAMSYNC_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            profile,
            oauth: OAuthConfig {
                auth_url,
                client_id: get("FAMSYNC_CLIENT_ID").unwrap_or_default(),
                redirect_uri: get("FAMSYNC_REDIRECT_URI")
                    .unwrap_or_else(|| "http://localhost:3000".to_string()),
                scope: FITNESS_READ_SCOPE.to_string(),
            },
            fitness_url,
            step_window_minutes,
            debug,
            return_location: get("FAMSYNC_RETURN_LOCATION"),
        })
    }

    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join("famsync.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
