use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// One of the family members whose readings are tracked independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Mom,
    Dad,
    Son,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Mom
    }
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Mom, Profile::Dad, Profile::Son];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Mom => "mom",
            Profile::Dad => "dad",
            Profile::Son => "son",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Profile::Mom => "Mom",
            Profile::Dad => "Dad",
            Profile::Son => "Son",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mom" => Ok(Profile::Mom),
            "dad" => Ok(Profile::Dad),
            "son" => Ok(Profile::Son),
            other => Err(SyncError::Validation(format!("unknown profile '{other}'"))),
        }
    }
}
