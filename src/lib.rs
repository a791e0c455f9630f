//! # OAR Classify
//!
//! An HTTP inference service that classifies images with a versioned ONNX
//! binary classifier.
//!
//! ## Features
//!
//! - Versioned model artifacts discovered in a model directory
//! - Selection of the latest, a specific version, or an exact artifact name
//! - Images accepted as multipart uploads or base64 text in JSON
//! - Automatic resize to the input size the model declares
//! - ONNX Runtime integration with a small session pool
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, tensor helpers and the ONNX engine
//! * [`models`] - Model artifact registry and version selection
//! * [`processors`] - Image decoding and resizing
//! * [`predictors`] - The inference engine used by request handlers
//! * [`api`] - warp routes, handlers and response envelopes
//! * [`app`] - Startup sequence and shared application context
//! * [`utils`] - Image helpers and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_classify::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::default();
//! let ctx = Arc::new(AppContext::bootstrap(&config)?);
//! warp::serve(routes(ctx)).run(([0, 0, 0, 0], 8080)).await;
//! # Ok(())
//! # }
//! ```
//!
//! ### Classifying without HTTP
//!
//! ```rust,no_run
//! use oar_classify::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = AppContext::bootstrap(&ServiceConfig::default())?;
//! let bytes = std::fs::read("cat.png")?;
//! let result = classify(&ctx, ImageSource::Binary(bytes))?;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod core;
pub mod models;
pub mod predictors;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_classify::prelude::*;
/// ```
///
/// For lower-level pieces (the ONNX engine, tensor helpers, the registry's
/// free functions), import directly from the respective modules.
pub mod prelude {
    pub use crate::api::{classify, routes, ApiResponse, ClassificationResult};
    pub use crate::app::AppContext;
    pub use crate::core::{
        ClassifyError, ClassifyResult, ExecutionMode, ImageClassifier, ModelSelection,
        ServiceConfig,
    };
    pub use crate::models::{ModelArtifact, ModelRegistry, VersionTag};
    pub use crate::predictors::InferenceEngine;
    pub use crate::processors::{ImageDecoder, ImageSource, ResizeSpec};
}
