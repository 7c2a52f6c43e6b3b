//! Processing mode definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a frame is processed.
///
/// Single-shot favours quality (heavier pose model, high-quality resampling);
/// streaming favours latency for live webcam frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Independent uploaded photo
    #[default]
    SingleShot,
    /// Continuous live frames
    Streaming,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::SingleShot => "single_shot",
            ProcessingMode::Streaming => "streaming",
        }
    }

    /// Whether pose estimation treats each image independently.
    pub fn is_static_image(&self) -> bool {
        matches!(self, ProcessingMode::SingleShot)
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown processing mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for ProcessingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_shot" | "single-shot" | "static" => Ok(ProcessingMode::SingleShot),
            "streaming" | "live" => Ok(ProcessingMode::Streaming),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("live".parse::<ProcessingMode>().unwrap(), ProcessingMode::Streaming);
        assert_eq!("single_shot".parse::<ProcessingMode>().unwrap(), ProcessingMode::SingleShot);
        assert!("burst".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn test_static_image_flag() {
        assert!(ProcessingMode::SingleShot.is_static_image());
        assert!(!ProcessingMode::Streaming.is_static_image());
    }
}
