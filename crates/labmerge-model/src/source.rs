use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Which of the two input collections a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Participant,
    Trial,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Trial => "trial",
        }
    }

    /// The opposite collection.
    pub fn other(self) -> Self {
        match self {
            Self::Participant => Self::Trial,
            Self::Trial => Self::Participant,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "participant" | "participants" => Ok(Self::Participant),
            "trial" | "trials" => Ok(Self::Trial),
            _ => Err(ModelError::InvalidSourceKind(value.to_string())),
        }
    }
}

/// Source scope of an identifier rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceScope {
    Participant,
    Trial,
    #[default]
    Both,
}

impl SourceScope {
    pub fn includes(self, kind: SourceKind) -> bool {
        match self {
            Self::Both => true,
            Self::Participant => kind == SourceKind::Participant,
            Self::Trial => kind == SourceKind::Trial,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Trial => "trial",
            Self::Both => "both",
        }
    }
}
