//! Application context and bootstrap.
//!
//! The loaded model, the class labels, and the resolved input size are built
//! once at startup into an [`AppContext`] that the HTTP layer shares behind an
//! `Arc`. Nothing here is reloaded while the process runs.

use crate::core::config::{ExecutionMode, ServiceConfig};
use crate::core::errors::ClassifyResult;
use crate::models::{ModelArtifact, ModelRegistry};
use crate::predictors::InferenceEngine;
use crate::processors::ResizeSpec;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// Process-wide state shared by all request handlers.
#[derive(Debug)]
pub struct AppContext {
    engine: InferenceEngine,
    class_labels: Vec<String>,
    input_resize: ResizeSpec,
    mode: ExecutionMode,
    artifact: Option<ModelArtifact>,
    max_upload_bytes: u64,
    request_counter: AtomicU64,
}

impl AppContext {
    /// Runs the startup sequence: scan the model directory, select an
    /// artifact, load it, and resolve the input size.
    ///
    /// # Errors
    ///
    /// Any error is bootstrap-fatal; the service must not start.
    pub fn bootstrap(config: &ServiceConfig) -> ClassifyResult<Self> {
        config.validate()?;

        let registry = ModelRegistry::discover(&config.model_dir)?;
        info!(
            dir = %registry.dir().display(),
            artifacts = registry.artifacts().len(),
            "model directory scanned"
        );

        let artifact = registry.select(&config.selection)?.clone();
        if artifact.version.is_unversioned() {
            warn!(
                name = %artifact.name,
                "selected model artifact has no version tag"
            );
        }
        info!("model path found : {}", artifact.path.display());

        let engine = InferenceEngine::load(
            &artifact.path,
            &config.inference,
            config.default_input_size,
        )
        .inspect_err(|e| error!("Error in loading model: {}", e))?;
        info!(model = %engine.model_name(), "ML model loaded successfully.");

        let mut context = Self::new(engine, config)?;
        context.artifact = Some(artifact);
        Ok(context)
    }

    /// Builds a context around an already loaded engine.
    pub fn new(engine: InferenceEngine, config: &ServiceConfig) -> ClassifyResult<Self> {
        config.validate()?;

        let (height, width) = engine.input_shape();
        let input_resize = ResizeSpec::from_hw(height, width)?;
        if engine.has_declared_input_shape() {
            info!("input resize parameter {} (declared by model)", input_resize);
        } else {
            info!("input resize parameter {} (configured default)", input_resize);
        }

        Ok(Self {
            engine,
            class_labels: config.class_labels.clone(),
            input_resize,
            mode: config.mode,
            artifact: None,
            max_upload_bytes: config.max_upload_bytes,
            request_counter: AtomicU64::new(0),
        })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Ordered class labels, one per score.
    pub fn class_labels(&self) -> &[String] {
        &self.class_labels
    }

    /// Size every input image is resized to.
    pub fn input_resize(&self) -> &ResizeSpec {
        &self.input_resize
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// The artifact the engine was loaded from, when bootstrapped from disk.
    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Returns a new id for request-scoped log spans.
    pub fn next_request_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
