//! Utility functions for image decoding and tensor conversion.

use crate::core::batch::Tensor3D;
use crate::core::errors::{ClassifyError, ClassifyResult};
use image::{ColorType, DynamicImage};

/// Decodes an in-memory image, guessing the format from its content.
///
/// # Errors
///
/// Returns [`ClassifyError::UnreadableImage`] when the bytes are empty, the
/// format is unknown, or the data is corrupt.
pub fn decode_image_bytes(bytes: &[u8]) -> ClassifyResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(ClassifyError::UnreadableImage)
}

/// Number of channels the tensor of an image of this color type has.
///
/// Follows the image's own mode: grayscale keeps one channel, RGBA keeps four.
pub fn channel_count(color: ColorType) -> usize {
    match color {
        ColorType::L8 | ColorType::L16 => 1,
        ColorType::La8 | ColorType::La16 => 2,
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => 4,
        _ => 3,
    }
}

/// Converts an image into a `[height, width, channels]` tensor.
///
/// Values are the 8-bit channel values as `f32` in `0.0..=255.0`; no scaling
/// or channel reordering is applied. 16-bit and float images are reduced to
/// 8 bits in the same channel layout.
pub fn image_to_tensor(image: &DynamicImage) -> ClassifyResult<Tensor3D> {
    let height = image.height() as usize;
    let width = image.width() as usize;
    let channels = channel_count(image.color());

    let raw = match channels {
        1 => image.to_luma8().into_raw(),
        2 => image.to_luma_alpha8().into_raw(),
        4 => image.to_rgba8().into_raw(),
        _ => image.to_rgb8().into_raw(),
    };
    let data: Vec<f32> = raw.into_iter().map(f32::from).collect();

    Ok(Tensor3D::from_shape_vec((height, width, channels), data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_rgb_tensor_layout() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([10, 20, 30]));
        let tensor = image_to_tensor(&DynamicImage::ImageRgb8(img)).unwrap();

        assert_eq!(tensor.shape(), &[2, 3, 3]);
        assert_eq!(tensor[[1, 2, 0]], 10.0);
        assert_eq!(tensor[[1, 2, 1]], 20.0);
        assert_eq!(tensor[[1, 2, 2]], 30.0);
        assert_eq!(tensor[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_channels_follow_mode() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));
        let tensor = image_to_tensor(&gray).unwrap();
        assert_eq!(tensor.shape(), &[4, 4, 1]);
        assert_eq!(tensor[[3, 3, 0]], 255.0);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let tensor = image_to_tensor(&rgba).unwrap();
        assert_eq!(tensor.shape(), &[2, 2, 4]);
        assert_eq!(tensor[[0, 0, 3]], 4.0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_image_bytes(b"definitely not an image"),
            Err(ClassifyError::UnreadableImage(_))
        ));
        assert!(decode_image_bytes(&[]).is_err());
    }
}
