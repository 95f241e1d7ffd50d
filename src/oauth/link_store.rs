use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::Profile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSettings {
    #[serde(default)]
    fitness_links: BTreeMap<Profile, bool>,
}

/// Durable per-profile "fitness account linked" flags.
///
/// Backed by one JSON settings file holding a single `fitnessLinks` map. The
/// file is read once at startup and rewritten whenever a link is recorded.
pub struct LinkStore {
    path: PathBuf,
    data: RwLock<PersistedSettings>,
}

impl LinkStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                PersistedSettings::default()
            })
        } else {
            PersistedSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn is_linked(&self, profile: Profile) -> bool {
        self.read()
            .fitness_links
            .get(&profile)
            .copied()
            .unwrap_or(false)
    }

    pub fn links(&self) -> BTreeMap<Profile, bool> {
        self.read().fitness_links.clone()
    }

    /// Records the link for `profile`. There is no way to unset it.
    ///
    /// Memory only changes once the file has been written.
    pub fn mark_linked(&self, profile: Profile) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut updated = guard.clone();
        updated.fitness_links.insert(profile, true);
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PersistedSettings> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &PersistedSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
