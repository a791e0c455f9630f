//! Request image input and the image-to-tensor pipeline.
//!
//! Input arrives either as raw bytes (multipart upload) or as base64 text (JSON
//! body). [`ImageSource`] tags the two kinds and [`ImageDecoder`] turns either
//! into the `[1, height, width, channels]` tensor the model consumes:
//!
//! ```text
//! bytes -> decode -> resize -> [H, W, C] -> [1, H, W, C]
//! ```
//!
//! The pixel values are passed through unscaled since the model applies its own
//! preprocessing.

use super::resize::{resize_image, ResizeSpec};
use crate::core::batch::{add_batch_axis, Tensor3D, Tensor4D};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::utils::image::{decode_image_bytes, image_to_tensor};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;

/// Image data as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Raw encoded image bytes.
    Binary(Vec<u8>),
    /// Base64 encoded image bytes, without any data URL prefix.
    Base64Text(String),
}

impl ImageSource {
    /// Interprets a JSON value as base64 image text.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnsupportedInputKind`] for anything but a
    /// string.
    pub fn from_json(value: &serde_json::Value) -> ClassifyResult<Self> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(Self::Base64Text(s.clone())),
            Value::Null => Err(ClassifyError::unsupported_input("null")),
            Value::Bool(_) => Err(ClassifyError::unsupported_input("boolean")),
            Value::Number(_) => Err(ClassifyError::unsupported_input("number")),
            Value::Array(_) => Err(ClassifyError::unsupported_input("array")),
            Value::Object(_) => Err(ClassifyError::unsupported_input("object")),
        }
    }

    /// Drops a `data:<mime>;base64,` style prefix from base64 text.
    ///
    /// Everything up to and including the first comma is removed. Text without
    /// a comma and binary sources are returned unchanged.
    pub fn without_data_url_prefix(self) -> Self {
        match self {
            Self::Base64Text(text) => Self::Base64Text(strip_data_url_prefix(&text).to_string()),
            binary => binary,
        }
    }
}

/// Returns the payload after the first comma, or the whole text if there is
/// none.
pub fn strip_data_url_prefix(text: &str) -> &str {
    match text.split_once(',') {
        Some((_, payload)) => payload,
        None => text,
    }
}

/// Single-use decoder holding the raw bytes of one image.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    bytes: Vec<u8>,
}

impl ImageDecoder {
    /// Normalizes an [`ImageSource`] into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidEncoding`] when base64 text does not
    /// decode.
    pub fn new(source: ImageSource) -> ClassifyResult<Self> {
        let bytes = match source {
            ImageSource::Binary(bytes) => bytes,
            ImageSource::Base64Text(text) => STANDARD.decode(text.trim())?,
        };
        Ok(Self { bytes })
    }

    /// Wraps raw image bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The raw encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the bytes into an image.
    pub fn decode_image(&self) -> ClassifyResult<DynamicImage> {
        decode_image_bytes(&self.bytes)
    }

    /// Decodes and optionally resizes the image.
    pub fn to_image(&self, resize: Option<&ResizeSpec>) -> ClassifyResult<DynamicImage> {
        let image = self.decode_image()?;
        Ok(match resize {
            Some(spec) => resize_image(&image, spec),
            None => image,
        })
    }

    /// Decodes, optionally resizes, and converts to `[height, width, channels]`.
    pub fn to_tensor(&self, resize: Option<&ResizeSpec>) -> ClassifyResult<Tensor3D> {
        image_to_tensor(&self.to_image(resize)?)
    }

    /// Produces the `[1, height, width, channels]` model input.
    pub fn to_model_input(&self, resize: Option<&ResizeSpec>) -> ClassifyResult<Tensor4D> {
        Ok(add_batch_axis(self.to_tensor(resize)?))
    }
}
