//! Traits at the seam between the service and the inference runtime.

use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::errors::ClassifyResult;

/// A loaded image classification model.
///
/// Implementations are shared across request handlers, so `predict_batch`
/// takes `&self` and must be safe to call from several threads at once. A
/// runtime that needs exclusive access per call has to provide its own
/// locking (see [`crate::core::inference::OrtInfer`]).
pub trait ImageClassifier: Send + Sync + std::fmt::Debug {
    /// Name of the model, used in logs and error messages.
    fn name(&self) -> &str;

    /// Spatial input size `(height, width)` declared by the model, if any.
    fn input_shape(&self) -> Option<(usize, usize)>;

    /// Runs the model on a `[batch, height, width, channels]` tensor and
    /// returns one row of class scores per batch item.
    fn predict_batch(&self, batch: &Tensor4D) -> ClassifyResult<Tensor2D>;
}
