//! Helpers for locating model files and building ONNX Runtime sessions.

use crate::core::config::{InferenceConfig, OrtGraphOptimizationLevel};
use crate::core::constants::DEFAULT_MODEL_FILE;
use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::path::{Path, PathBuf};

/// Resolves an artifact path to the ONNX file it holds.
///
/// A file artifact is used as is. A directory artifact must contain
/// `model.onnx`.
pub fn resolve_model_file(artifact_path: &Path) -> ClassifyResult<PathBuf> {
    if artifact_path.is_file() {
        return Ok(artifact_path.to_path_buf());
    }
    if artifact_path.is_dir() {
        let candidate = artifact_path.join(DEFAULT_MODEL_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(ClassifyError::model_load_error(
            artifact_path,
            format!("artifact directory has no {}", DEFAULT_MODEL_FILE),
            None::<SimpleError>,
        ));
    }
    Err(ClassifyError::model_load_error(
        artifact_path,
        "artifact doesn't exist",
        None::<SimpleError>,
    ))
}

/// Builds one session for `model_file` with the configured runtime settings.
pub fn load_session(model_file: &Path, config: &InferenceConfig) -> ClassifyResult<Session> {
    let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
    let builder = apply_ort_config(builder, config)?;
    builder.commit_from_file(model_file).map_err(|e| {
        ClassifyError::model_load_error(model_file, "failed to create ONNX session", Some(e))
    })
}

fn apply_ort_config(
    mut builder: SessionBuilder,
    config: &InferenceConfig,
) -> Result<SessionBuilder, ort::Error> {
    if let Some(intra) = config.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = config.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(level) = config.optimization_level {
        let mapped = match level {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_file_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model-v1.0.0.onnx");
        std::fs::write(&file, b"onnx").unwrap();

        assert_eq!(resolve_model_file(&file).unwrap(), file);
    }

    #[test]
    fn test_resolve_directory_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("model-v1.0.0");
        std::fs::create_dir(&artifact).unwrap();

        assert!(matches!(
            resolve_model_file(&artifact),
            Err(ClassifyError::ModelLoad { .. })
        ));

        std::fs::write(artifact.join("model.onnx"), b"onnx").unwrap();
        assert_eq!(
            resolve_model_file(&artifact).unwrap(),
            artifact.join("model.onnx")
        );
    }

    #[test]
    fn test_resolve_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_model_file(&dir.path().join("model-v9.9.9")).unwrap_err();
        assert!(err.is_bootstrap_fatal());
    }
}
