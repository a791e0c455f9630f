//! Predictors module
//!
//! High-level prediction API on top of a loaded [`crate::core::ImageClassifier`].

pub mod classifier;

pub use classifier::InferenceEngine;
