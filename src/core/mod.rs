//! Core building blocks of the classification service.
//!
//! * [`errors`] - Error type and classification
//! * [`config`] - Service and runtime configuration
//! * [`constants`] - Defaults shared across modules
//! * [`batch`] - Tensor aliases and batch-axis helpers
//! * [`traits`] - The `ImageClassifier` seam
//! * [`inference`] - ONNX Runtime engine

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{Tensor2D, Tensor3D, Tensor4D};
pub use config::{ExecutionMode, InferenceConfig, ModelSelection, ServiceConfig};
pub use errors::{ClassifyError, ClassifyResult, ErrorClass, ProcessingStage};
pub use traits::ImageClassifier;
