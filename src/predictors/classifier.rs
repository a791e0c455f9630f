//! The inference engine used by request handlers.

use crate::core::batch::{ensure_batched, Tensor2D};
use crate::core::config::InferenceConfig;
use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use crate::core::inference::OrtInfer;
use crate::core::traits::ImageClassifier;
use ndarray::{ArrayD, Axis};
use std::path::Path;
use std::sync::Arc;

/// Wraps the single loaded model of the process.
///
/// The engine is cheap to clone and is shared by all request handlers. The
/// model is never mutated after load.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    model: Arc<dyn ImageClassifier>,
    fallback_shape: (usize, usize),
}

impl InferenceEngine {
    /// Loads the ONNX model held by `artifact_path`.
    ///
    /// `fallback_shape` is the `(height, width)` reported by
    /// [`input_shape`](Self::input_shape) when the model does not declare one.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::ModelLoad`] when the artifact holds no usable
    /// model.
    pub fn load(
        artifact_path: &Path,
        config: &InferenceConfig,
        fallback_shape: (usize, usize),
    ) -> ClassifyResult<Self> {
        let model = OrtInfer::load(artifact_path, config)?;
        Ok(Self::from_model(Arc::new(model), fallback_shape))
    }

    /// Wraps an already loaded model.
    pub fn from_model(model: Arc<dyn ImageClassifier>, fallback_shape: (usize, usize)) -> Self {
        Self {
            model,
            fallback_shape,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Spatial input size `(height, width)` the model expects.
    pub fn input_shape(&self) -> (usize, usize) {
        self.model.input_shape().unwrap_or(self.fallback_shape)
    }

    /// Returns true when the input shape comes from the model itself rather
    /// than the configured fallback.
    pub fn has_declared_input_shape(&self) -> bool {
        self.model.input_shape().is_some()
    }

    /// Runs the model and returns one score row per batch item.
    ///
    /// A 3-D `[height, width, channels]` tensor is promoted to a batch of one.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidInput`] when the tensor rank is not 3 or
    /// 4, the batch is empty, or the spatial size differs from
    /// [`input_shape`](Self::input_shape).
    pub fn predict(&self, tensor: ArrayD<f32>) -> ClassifyResult<Tensor2D> {
        let batch = ensure_batched(tensor)?;

        let expected = self.input_shape();
        let actual = (batch.shape()[1], batch.shape()[2]);
        if actual != expected {
            return Err(ClassifyError::invalid_input(format!(
                "model '{}' expects {}x{} (height x width) images, got {}x{}",
                self.model.name(),
                expected.0,
                expected.1,
                actual.0,
                actual.1
            )));
        }

        let scores = self.model.predict_batch(&batch)?;
        if scores.nrows() != batch.shape()[0] {
            return Err(ClassifyError::inference_error(
                self.model.name(),
                &format!(
                    "returned {} score rows for a batch of {}",
                    scores.nrows(),
                    batch.shape()[0]
                ),
                SimpleError::new("batch size mismatch"),
            ));
        }
        Ok(scores)
    }

    /// Runs the model on a single image and returns its score vector.
    pub fn predict_one(&self, tensor: ArrayD<f32>) -> ClassifyResult<Vec<f32>> {
        let scores = self.predict(tensor)?;
        Ok(scores.index_axis(Axis(0), 0).to_vec())
    }
}
