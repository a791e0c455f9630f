//! Service configuration.
//!
//! [`ServiceConfig`] collects everything the service needs at bootstrap. It can
//! be deserialized from a JSON file and is then overridden field by field from
//! the command line (see `main.rs`). [`ServiceConfig::validate`] must pass before
//! the configuration is used.

use crate::core::constants::{
    DEFAULT_CLASS_LABELS, DEFAULT_HOST, DEFAULT_INPUT_SHAPE, DEFAULT_LOG_DIR,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL_DIR, DEFAULT_PORT, EXPECTED_CLASS_COUNT,
};
use crate::core::errors::{ClassifyError, ClassifyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Execution mode of the service.
///
/// The mode selects the default log verbosity and whether internal error
/// details are echoed to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    /// Verbose logging, detailed error messages.
    Development,
    /// Informational logging, generic messages for unexpected errors.
    #[default]
    Production,
}

impl ExecutionMode {
    /// Parses a mode name case-insensitively. Unknown names fall back to
    /// [`ExecutionMode::Production`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "DEVELOPMENT" | "DEV" => Self::Development,
            _ => Self::Production,
        }
    }

    /// Default `tracing` filter directive for this mode.
    pub fn log_level(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production => "info",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "DEVELOPMENT"),
            Self::Production => write!(f, "PRODUCTION"),
        }
    }
}

/// Policy used to pick one artifact from the model directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum ModelSelection {
    /// The artifact with the highest version tag.
    #[default]
    Latest,
    /// The first artifact whose version tag equals the given version.
    Version(String),
    /// The artifact with exactly this name.
    Name(String),
}

impl std::fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest version"),
            Self::Version(v) => write!(f, "version '{}'", v),
            Self::Name(n) => write!(f, "name '{}'", n),
        }
    }
}

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Configuration of the inference runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of ONNX Runtime sessions in the pool. Each session serves one
    /// prediction at a time.
    pub session_pool_size: usize,
    /// Name of the model input; the first declared input when unset.
    pub input_name: Option<String>,
    /// Number of threads used to parallelize execution within nodes.
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes.
    pub inter_threads: Option<usize>,
    /// Graph optimization level.
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            session_pool_size: 1,
            input_name: None,
            intra_threads: None,
            inter_threads: None,
            optimization_level: None,
        }
    }
}

/// Complete configuration of the classification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Directory scanned for model artifacts.
    pub model_dir: PathBuf,
    /// Which artifact to load.
    pub selection: ModelSelection,
    /// Ordered class labels, one per model output score.
    pub class_labels: Vec<String>,
    /// Input size `(height, width)` used when the model declares none.
    pub default_input_size: (usize, usize),
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Inference runtime settings.
    pub inference: InferenceConfig,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: u64,
    /// Directory receiving the rolling log file; console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            selection: ModelSelection::Latest,
            class_labels: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
            default_input_size: DEFAULT_INPUT_SHAPE,
            mode: ExecutionMode::Production,
            inference: InferenceConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
        }
    }
}

impl ServiceConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: &Path) -> ClassifyResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            ClassifyError::config_error(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Checks the configuration for values the service cannot run with.
    pub fn validate(&self) -> ClassifyResult<()> {
        if self.class_labels.len() != EXPECTED_CLASS_COUNT {
            return Err(ClassifyError::config_error_with_context(
                "class_labels",
                &format!("{:?}", self.class_labels),
                &format!("exactly {} labels are required", EXPECTED_CLASS_COUNT),
            ));
        }
        if self.class_labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ClassifyError::config_error_with_context(
                "class_labels",
                &format!("{:?}", self.class_labels),
                "labels must not be empty",
            ));
        }
        let unique: HashSet<&str> = self.class_labels.iter().map(String::as_str).collect();
        if unique.len() != self.class_labels.len() {
            return Err(ClassifyError::config_error_with_context(
                "class_labels",
                &format!("{:?}", self.class_labels),
                "labels must be distinct",
            ));
        }

        let (height, width) = self.default_input_size;
        if height == 0 || width == 0 {
            return Err(ClassifyError::config_error_with_context(
                "default_input_size",
                &format!("{}x{}", height, width),
                "dimensions must be positive",
            ));
        }

        if self.inference.session_pool_size == 0 {
            return Err(ClassifyError::config_error_with_context(
                "inference.session_pool_size",
                "0",
                "at least one session is required",
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ClassifyError::config_error_with_context(
                "max_upload_bytes",
                "0",
                "must be positive",
            ));
        }

        match &self.selection {
            ModelSelection::Version(v) | ModelSelection::Name(v) if v.trim().is_empty() => {
                Err(ClassifyError::config_error_with_context(
                    "selection",
                    v,
                    "selector value must not be empty",
                ))
            }
            _ => Ok(()),
        }
    }
}
