//! Pipeline stages and stage-tagged failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use vtryon_media::MediaError;
use vtryon_storage::StorageError;

/// Steps of a try-on request, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Validate,
    ResolveGarment,
    DetectPose,
    Composite,
    Persist,
    Respond,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::ResolveGarment => "resolve_garment",
            Self::DetectPose => "detect_pose",
            Self::Composite => "composite",
            Self::Persist => "persist",
            Self::Respond => "respond",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classes, each mapping to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// Malformed or missing input (400)
    Validation,
    /// User image, garment item or file missing (404)
    NotFound,
    /// Input understood but unusable, e.g. no person in frame (422)
    Unprocessable,
    /// Garment host failed or timed out (502)
    Upstream,
    /// Live client over its request budget (429)
    RateLimited,
    /// Anything else (500)
    Internal,
}

impl PipelineErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Unprocessable => "unprocessable",
            Self::Upstream => "upstream",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }
}

/// A pipeline failure tagged with the stage it happened in.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub kind: PipelineErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, kind: PipelineErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn validation(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::new(stage, PipelineErrorKind::Validation, message)
    }

    pub fn not_found(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::new(stage, PipelineErrorKind::NotFound, message)
    }

    pub fn internal(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::new(stage, PipelineErrorKind::Internal, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            PipelineStage::Validate,
            PipelineErrorKind::RateLimited,
            "Too many requests. Please slow down.",
        )
    }

    /// Classify a media failure in a given stage.
    pub fn from_media(stage: PipelineStage, error: MediaError) -> Self {
        let kind = match (&error, stage) {
            (MediaError::PoseNotDetected, _) => PipelineErrorKind::Unprocessable,
            // A garment that does not decode came back broken from its host
            (MediaError::Decode(_), PipelineStage::ResolveGarment) => PipelineErrorKind::Upstream,
            (MediaError::FileNotFound(_), _) => PipelineErrorKind::NotFound,
            (e, PipelineStage::Validate) if e.is_unprocessable_input() => PipelineErrorKind::Unprocessable,
            _ => PipelineErrorKind::Internal,
        };
        let message = match &error {
            MediaError::PoseNotDetected => "Could not detect a person in the image".to_string(),
            other => other.to_string(),
        };
        Self::new(stage, kind, message)
    }

    /// Classify a storage failure in a given stage.
    pub fn from_storage(stage: PipelineStage, error: StorageError) -> Self {
        match error {
            StorageError::Media(media) => Self::from_media(stage, media),
            StorageError::NotFound(what) => Self::not_found(stage, format!("Not found: {}", what)),
            StorageError::InvalidKey(key) => Self::validation(stage, format!("Invalid filename: {}", key)),
            e @ (StorageError::FetchFailed(_) | StorageError::FetchTimeout { .. }) => {
                Self::new(stage, PipelineErrorKind::Upstream, e.to_string())
            }
            e => Self::internal(stage, e.to_string()),
        }
    }

    /// Collapse any failure into an internal error, keeping the stage.
    pub fn into_internal(self) -> Self {
        Self {
            kind: PipelineErrorKind::Internal,
            ..self
        }
    }
}
