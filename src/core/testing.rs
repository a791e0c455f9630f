//! Test fixtures shared by unit tests.

use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use crate::core::traits::ImageClassifier;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, Axis};
use std::io::Cursor;
use std::time::Duration;

/// Scores a batch from the mean pixel intensity: `softmax([m, 1 - m])` with
/// `m` the mean scaled to `[0, 1]`.
#[derive(Debug)]
pub struct MeanSoftmaxClassifier {
    pub shape: Option<(usize, usize)>,
}

impl ImageClassifier for MeanSoftmaxClassifier {
    fn name(&self) -> &str {
        "mean-softmax"
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    fn predict_batch(&self, batch: &Tensor4D) -> ClassifyResult<Tensor2D> {
        let rows = batch.shape()[0];
        let mut out = Array2::<f32>::zeros((rows, 2));
        for (i, image) in batch.axis_iter(Axis(0)).enumerate() {
            let mean = image.mean().unwrap_or(0.0) / 255.0;
            let (a, b) = (mean.exp(), (1.0 - mean).exp());
            out[[i, 0]] = a / (a + b);
            out[[i, 1]] = b / (a + b);
        }
        Ok(out)
    }
}

/// Scores each image as `[1 - m, m]` with `m` its mean intensity in `[0, 1]`,
/// holding the call for `delay` so concurrent callers overlap.
#[derive(Debug)]
pub struct SlowBrightnessClassifier {
    pub delay: Duration,
}

impl ImageClassifier for SlowBrightnessClassifier {
    fn name(&self) -> &str {
        "slow-brightness"
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        None
    }

    fn predict_batch(&self, batch: &Tensor4D) -> ClassifyResult<Tensor2D> {
        std::thread::sleep(self.delay);
        let mut out = Array2::<f32>::zeros((batch.shape()[0], 2));
        for (i, image) in batch.axis_iter(Axis(0)).enumerate() {
            let bright = image.mean().unwrap_or(0.0) / 255.0;
            out[[i, 0]] = 1.0 - bright;
            out[[i, 1]] = bright;
        }
        Ok(out)
    }
}

/// Always fails, like a runtime error inside the model.
#[derive(Debug)]
pub struct FailingClassifier;

impl ImageClassifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        None
    }

    fn predict_batch(&self, _batch: &Tensor4D) -> ClassifyResult<Tensor2D> {
        Err(ClassifyError::inference_error(
            "failing",
            "forward pass",
            SimpleError::new("kernel exploded at /opt/runtime/internal.cc:42"),
        ))
    }
}

/// A deterministic RGB gradient image.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Encodes an image into PNG bytes.
pub fn png_bytes(image: DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

/// PNG bytes of a single-colour gray RGB image.
pub fn solid_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb([value, value, value]),
    )))
}

/// PNG bytes of an RGB gradient.
pub fn rgb_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(DynamicImage::ImageRgb8(gradient_image(width, height)))
}
