//! Resize targets and the resampling step of the preprocessing pipeline.

use crate::core::errors::{ClassifyError, ClassifyResult};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The filter used for every resize. Changing it changes the pixels the model
/// sees, so it must match the one used when preparing training data.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Target size of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResizeSpec {
    /// A square of this side length.
    Square(u32),
    /// Explicit width and height.
    Size { width: u32, height: u32 },
}

impl ResizeSpec {
    /// Builds a spec from the `(height, width)` pair reported by a model.
    pub fn from_hw(height: usize, width: usize) -> ClassifyResult<Self> {
        let to_u32 = |v: usize| {
            u32::try_from(v)
                .map_err(|_| ClassifyError::invalid_resize(format!("dimension {} is too large", v)))
        };
        Self::from_dims(&[to_u32(width)?, to_u32(height)?])
    }

    /// Builds a spec from one dimension (square) or two (`[width, height]`).
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidResizeSpec`] for any other number of
    /// dimensions or a zero dimension.
    pub fn from_dims(dims: &[u32]) -> ClassifyResult<Self> {
        if dims.contains(&0) {
            return Err(ClassifyError::invalid_resize(format!(
                "dimensions must be positive, got {:?}",
                dims
            )));
        }
        match dims {
            [side] => Ok(Self::Square(*side)),
            [width, height] => Ok(Self::Size {
                width: *width,
                height: *height,
            }),
            _ => Err(ClassifyError::invalid_resize(format!(
                "expected one or two dimensions, got {}",
                dims.len()
            ))),
        }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match *self {
            Self::Square(side) => (side, side),
            Self::Size { width, height } => (width, height),
        }
    }
}

impl std::fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

impl FromStr for ResizeSpec {
    type Err = ClassifyError;

    /// Parses `"128"`, `"128x96"` or `"128,96"` (width first).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims = s
            .split(|c: char| c == 'x' || c == 'X' || c == ',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|_| {
                    ClassifyError::invalid_resize(format!("'{}' is not a valid size", s))
                })
            })
            .collect::<ClassifyResult<Vec<u32>>>()?;
        Self::from_dims(&dims)
    }
}

/// Resizes `image` to `spec` with [`RESIZE_FILTER`], ignoring aspect ratio.
///
/// An image that already has the target size is returned unchanged, so
/// repeated resizes to the same target do not resample again.
pub fn resize_image(image: &DynamicImage, spec: &ResizeSpec) -> DynamicImage {
    let (width, height) = spec.dimensions();
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image.resize_exact(width, height, RESIZE_FILTER)
}
