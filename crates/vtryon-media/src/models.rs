//! ONNX model discovery and loading.

use std::path::{Path, PathBuf};

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Directories searched when no explicit model path is configured.
const MODEL_DIRS: &[&str] = &["./models", "./backend/models", "/app/models"];

/// Resolve a model file, preferring an explicitly configured path.
///
/// A configured path that does not exist is an error rather than a silent
/// fallback to the search directories.
pub fn resolve_model_path(configured: Option<&Path>, file_name: &str) -> MediaResult<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(MediaError::model_not_found(path.display().to_string()));
    }

    for dir in MODEL_DIRS {
        let candidate = Path::new(dir).join(file_name);
        debug!(path = %candidate.display(), "Checking model location");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(MediaError::model_not_found(format!(
        "{} (searched {})",
        file_name,
        MODEL_DIRS.join(", ")
    )))
}

/// Build an optimized ORT session from a model file.
pub fn load_session(model_path: &Path) -> MediaResult<Session> {
    if !model_path.exists() {
        return Err(MediaError::model_not_found(model_path.display().to_string()));
    }

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::inference_failed(format!("ORT read model file: {e}")))?;

    let session = Session::builder()
        .map_err(|e| MediaError::inference_failed(format!("ORT session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::inference_failed(format!("ORT opt level: {e}")))?
        .commit_from_memory(model_bytes.as_slice())
        .map_err(|e| MediaError::inference_failed(format!("ORT load model: {e}")))?;

    info!(path = %model_path.display(), "Loaded ONNX model");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configured_path_wins() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("custom.onnx");
        std::fs::write(&model, b"onnx").unwrap();

        let resolved = resolve_model_path(Some(&model), "ignored.onnx").unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_missing_configured_path_is_error() {
        let err = resolve_model_path(Some(Path::new("/nonexistent/pose.onnx")), "pose.onnx").unwrap_err();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }

    #[test]
    fn test_load_session_missing_file() {
        let err = load_session(Path::new("/nonexistent/model.onnx")).unwrap_err();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }
}
