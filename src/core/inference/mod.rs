//! ONNX Runtime integration.
//!
//! This module centralizes session creation and the pooled [`OrtInfer`]
//! engine that implements [`crate::core::traits::ImageClassifier`].

pub mod ort_infer;
pub mod session;

pub use ort_infer::OrtInfer;
pub use session::{load_session, resolve_model_file};
