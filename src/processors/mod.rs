//! Image preprocessing.
//!
//! * [`decode`] - Input kinds and the bytes-to-tensor pipeline
//! * [`resize`] - Resize targets and resampling

pub mod decode;
pub mod resize;

pub use decode::{strip_data_url_prefix, ImageDecoder, ImageSource};
pub use resize::{resize_image, ResizeSpec, RESIZE_FILTER};
