//! Tensor aliases and batch-axis helpers.
//!
//! Image tensors use the `[batch, height, width, channels]` layout throughout
//! the service.

use crate::core::errors::{ClassifyError, ClassifyResult};
use ndarray::{ArrayD, Axis, Ix3, Ix4};

/// A 2-dimensional tensor, one row of class scores per batch item.
pub type Tensor2D = ndarray::Array2<f32>;

/// A 3-dimensional tensor, a single image as `[height, width, channels]`.
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4-dimensional tensor, a batch of images as `[batch, height, width, channels]`.
pub type Tensor4D = ndarray::Array4<f32>;

/// Adds a leading batch axis of length one.
pub fn add_batch_axis(image: Tensor3D) -> Tensor4D {
    image.insert_axis(Axis(0))
}

/// Converts a tensor of unknown rank into a batch.
///
/// A 3-D tensor is treated as a single unbatched image and promoted to a batch
/// of one; a 4-D tensor is passed through. Any other rank, and an empty batch,
/// is rejected.
pub fn ensure_batched(tensor: ArrayD<f32>) -> ClassifyResult<Tensor4D> {
    let batch = match tensor.ndim() {
        3 => add_batch_axis(tensor.into_dimensionality::<Ix3>()?),
        4 => tensor.into_dimensionality::<Ix4>()?,
        other => {
            return Err(ClassifyError::invalid_input(format!(
                "expected a 3-D image or 4-D batch tensor, got {} dimensions with shape {:?}",
                other,
                tensor.shape()
            )));
        }
    };

    if batch.shape()[0] == 0 {
        return Err(ClassifyError::invalid_input("batch tensor is empty"));
    }
    Ok(batch)
}
