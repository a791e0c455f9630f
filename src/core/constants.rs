//! Constants used throughout the classification service.

/// Prefix every model artifact name must start with.
pub const MODEL_PREFIX: &str = "model";

/// File looked up inside a directory artifact.
pub const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// The default directory scanned for model artifacts.
pub const DEFAULT_MODEL_DIR: &str = "model";

/// The default input shape (height, width) used when the model does not
/// declare one.
pub const DEFAULT_INPUT_SHAPE: (usize, usize) = (128, 128);

/// The default ordered class labels of the binary classifier.
pub const DEFAULT_CLASS_LABELS: [&str; 2] = ["Cat", "Dog"];

/// Number of labels the classifier is expected to produce scores for.
pub const EXPECTED_CLASS_COUNT: usize = 2;

/// The default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// The default port.
pub const DEFAULT_PORT: u16 = 8080;

/// The default maximum accepted request body size, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// The default directory receiving the rolling log file.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "api";

/// Number of rotated log files kept on disk.
pub const MAX_LOG_FILES: usize = 7;

/// Environment variable selecting the execution mode.
pub const EXECUTION_MODE_ENV: &str = "CLASSIFIER_ENV";

/// Message returned for unexpected failures in production mode.
pub const GENERIC_FAILURE_MESSAGE: &str = "classification failed due to an internal error.";
