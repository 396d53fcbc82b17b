//! Pipeline mode enum.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The pipeline variant selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// The scheduled daily production run.
    #[default]
    Daily,
    /// An ad-hoc special edition.
    Special,
    /// A dry run; steps with external side effects should short-circuit.
    Test,
}

impl PipelineMode {
    /// Returns the lowercase tag of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Special => "special",
            Self::Test => "test",
        }
    }

    /// Returns true for the dry-run mode.
    #[must_use]
    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "special" => Ok(Self::Special),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(PipelineMode::Daily.to_string(), "daily");
        assert_eq!(PipelineMode::Special.to_string(), "special");
        assert_eq!(PipelineMode::Test.to_string(), "test");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Daily".parse::<PipelineMode>().unwrap(), PipelineMode::Daily);
        assert_eq!(" test ".parse::<PipelineMode>().unwrap(), PipelineMode::Test);
        assert_eq!(
            "weekly".parse::<PipelineMode>(),
            Err(ConfigError::UnknownMode("weekly".to_string()))
        );
    }

    #[test]
    fn test_mode_serialize() {
        let json = serde_json::to_string(&PipelineMode::Special).unwrap();
        assert_eq!(json, r#""special""#);

        let mode: PipelineMode = serde_json::from_str(r#""test""#).unwrap();
        assert!(mode.is_test());
    }
}
