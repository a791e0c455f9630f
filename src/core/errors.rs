//! Error types for the classification service.
//!
//! Every stage of the service reports failures through [`ClassifyError`]. The
//! variants fall into three groups, see [`ErrorClass`]:
//!
//! * bootstrap-fatal errors stop the service before it accepts traffic,
//! * request-recoverable errors are reported to the client that caused them,
//! * unexpected errors are logged in full and reported generically in production.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Convenient result alias for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Enum representing the pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Turning request input into raw image bytes.
    Decoding,
    /// Resizing the decoded image.
    Resize,
    /// Converting pixels into a tensor.
    TensorOperation,
    /// Running the model.
    Predicting,
    /// Shaping the model output into a response.
    PostProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Decoding => write!(f, "decoding"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Predicting => write!(f, "prediction"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
        }
    }
}

/// How an error must be treated by the layer that finally observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service must refuse to start.
    BootstrapFatal,
    /// Caused by one request's input; reported back to that client.
    RequestRecoverable,
    /// Anything else; logged with full detail.
    Unexpected,
}

/// Enum representing the errors that can occur in the classification service.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The model directory does not exist or is not a directory.
    #[error("model directory '{}' doesn't exist", path.display())]
    DirectoryNotFound {
        /// The path that was scanned.
        path: PathBuf,
    },

    /// The model directory contains no entry recognized as a model artifact.
    #[error("no model artifacts found in '{}'", path.display())]
    NoArtifactsFound {
        /// The path that was scanned.
        path: PathBuf,
    },

    /// The configured selection policy matched no artifact.
    #[error("no model artifact matches {selector}")]
    ArtifactNotFound {
        /// Human readable description of the selection policy.
        selector: String,
    },

    /// The model could not be loaded.
    #[error("failed to load model from '{}': {reason}", path.display())]
    ModelLoad {
        /// The artifact path that failed to load.
        path: PathBuf,
        /// What went wrong.
        reason: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required request field is absent.
    #[error("{field} key is missing. please check input parameters again.")]
    MissingField {
        /// Name of the missing field or multipart part.
        field: String,
    },

    /// The request body is not valid JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The image input has a type that cannot carry image data.
    #[error("unsupported input kind '{kind}', expected binary data or a base64 string")]
    UnsupportedInputKind {
        /// The kind of input that was received.
        kind: String,
    },

    /// The base64 payload could not be decoded.
    #[error("invalid base64 image data: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),

    /// The bytes are not a decodable image.
    #[error("unreadable image: {0}")]
    UnreadableImage(#[source] image::ImageError),

    /// A resize target has an unsupported shape.
    #[error("invalid resize spec: {message}")]
    InvalidResizeSpec {
        /// A message describing the problem.
        message: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error occurred while running a pipeline stage.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during model inference.
    #[error("inference with model '{model_name}' failed: {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl ClassifyError {
    /// Creates a model load error, optionally chaining the underlying cause.
    pub fn model_load_error(
        path: &Path,
        reason: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ModelLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an unsupported input kind error.
    pub fn unsupported_input(kind: impl Into<String>) -> Self {
        Self::UnsupportedInputKind { kind: kind.into() }
    }

    /// Creates an invalid resize spec error.
    pub fn invalid_resize(message: impl Into<String>) -> Self {
        Self::InvalidResizeSpec {
            message: message.into(),
        }
    }

    /// Creates an error for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an error for configuration problems.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the offending field and value.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates an error for a failed pipeline stage.
    pub fn processing_error(
        stage: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed inference call.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Classifies the error for the layer that reports it.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DirectoryNotFound { .. }
            | Self::NoArtifactsFound { .. }
            | Self::ArtifactNotFound { .. }
            | Self::ModelLoad { .. }
            | Self::ConfigError { .. } => ErrorClass::BootstrapFatal,
            Self::MissingField { .. }
            | Self::InvalidJson(_)
            | Self::UnsupportedInputKind { .. }
            | Self::InvalidEncoding(_)
            | Self::UnreadableImage(_)
            | Self::InvalidResizeSpec { .. }
            | Self::InvalidInput { .. } => ErrorClass::RequestRecoverable,
            Self::Processing { .. }
            | Self::Inference { .. }
            | Self::Session(_)
            | Self::Tensor(_)
            | Self::Io(_) => ErrorClass::Unexpected,
        }
    }

    /// Returns true when the error was caused by one request's input.
    pub fn is_request_recoverable(&self) -> bool {
        self.class() == ErrorClass::RequestRecoverable
    }

    /// Returns true when the error must abort startup.
    pub fn is_bootstrap_fatal(&self) -> bool {
        self.class() == ErrorClass::BootstrapFatal
    }
}

impl From<image::ImageError> for ClassifyError {
    fn from(error: image::ImageError) -> Self {
        Self::UnreadableImage(error)
    }
}

impl From<base64::DecodeError> for ClassifyError {
    fn from(error: base64::DecodeError) -> Self {
        Self::InvalidEncoding(error)
    }
}

/// A minimal error carrying only a message, used as a source where the
/// failing operation has no error value of its own.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new simple error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
