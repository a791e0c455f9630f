//! ONNX Runtime classifier backed by a pool of sessions.

use super::session::{load_session, resolve_model_file};
use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::config::InferenceConfig;
use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use crate::core::traits::ImageClassifier;
use ndarray::ArrayView2;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Runs an ONNX classification graph.
///
/// Running a session needs exclusive access, so every session sits behind a
/// `Mutex`. Concurrent callers are spread round-robin over the pool and wait
/// on the lock when all sessions are busy.
pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    output_name: String,
    input_shape: Option<(usize, usize)>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_shape", &self.input_shape)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Loads the model held by `artifact_path` (an `.onnx` file or a directory
    /// containing `model.onnx`) into a pool of sessions.
    pub fn load(artifact_path: &Path, config: &InferenceConfig) -> ClassifyResult<Self> {
        let model_file = resolve_model_file(artifact_path)?;
        let pool_size = config.session_pool_size.max(1);

        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(load_session(&model_file, config)?);
        }

        let first = &sessions[0];
        let input = match &config.input_name {
            Some(name) => first.inputs.iter().find(|i| &i.name == name),
            None => first.inputs.first(),
        }
        .ok_or_else(|| {
            ClassifyError::model_load_error(
                artifact_path,
                match &config.input_name {
                    Some(name) => format!("model has no input named '{}'", name),
                    None => "model declares no inputs".to_string(),
                },
                None::<SimpleError>,
            )
        })?;
        let input_name = input.name.clone();
        let input_shape = match &input.input_type {
            ValueType::Tensor { shape, .. } => {
                spatial_dims(&shape.iter().copied().collect::<Vec<i64>>())
            }
            _ => None,
        };

        let output_name = first
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                ClassifyError::model_load_error(
                    artifact_path,
                    "model declares no outputs",
                    None::<SimpleError>,
                )
            })?;

        let model_name = artifact_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        debug!(
            model = %model_name,
            input = %input_name,
            output = %output_name,
            ?input_shape,
            pool_size,
            "ONNX sessions created"
        );

        Ok(Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next_idx: AtomicUsize::new(0),
            input_name,
            output_name,
            input_shape,
            model_path: model_file,
            model_name,
        })
    }

    /// Returns the model file backing this engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }
}

impl ImageClassifier for OrtInfer {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        self.input_shape
    }

    fn predict_batch(&self, batch: &Tensor4D) -> ClassifyResult<Tensor2D> {
        let batch_size = batch.shape()[0];
        let input_shape = batch.shape().to_vec();

        let input_tensor = TensorRef::from_array_view(batch.view()).map_err(|e| {
            ClassifyError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {:?}", input_shape),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[idx].lock().map_err(|_| {
            ClassifyError::inference_error(
                &self.model_name,
                &format!("failed to acquire session {}/{}", idx, self.sessions.len()),
                SimpleError::new("session lock poisoned"),
            )
        })?;

        let outputs = session.run(inputs).map_err(|e| {
            ClassifyError::inference_error(
                &self.model_name,
                &format!("forward pass failed for input shape {:?}", input_shape),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassifyError::inference_error(
                    &self.model_name,
                    &format!("failed to extract output '{}' as f32", self.output_name),
                    e,
                )
            })?;

        let num_classes = match output_shape.len() {
            2 if output_shape[0] as usize == batch_size => output_shape[1] as usize,
            _ => {
                return Err(ClassifyError::inference_error(
                    &self.model_name,
                    &format!(
                        "expected output of shape [{}, classes], got {:?}",
                        batch_size, output_shape
                    ),
                    SimpleError::new("unexpected output tensor shape"),
                ));
            }
        };

        let view = ArrayView2::from_shape((batch_size, num_classes), output_data)?;
        Ok(view.to_owned())
    }
}

/// Extracts `(height, width)` from a declared `[batch, height, width, channels]`
/// shape. Dynamic (non-positive) dimensions yield `None`.
fn spatial_dims(shape: &[i64]) -> Option<(usize, usize)> {
    match shape {
        [_, h, w, _] if *h > 0 && *w > 0 => Some((*h as usize, *w as usize)),
        _ => None,
    }
}
