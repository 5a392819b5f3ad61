//! Plane to image conversion.
//!
//! A decoded plane is a row-major run of samples in the series byte order.
//! It is turned into a grayscale image:
//!
//! - `uint8` → 8-bit gray
//! - `uint16` → 16-bit gray
//! - `uint32` / `float` → 16-bit gray, linearly stretched from the plane's
//!   minimum to its maximum

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};

use crate::error::ExportError;
use crate::format::{ByteOrder, PixelType, SeriesMetadata};

/// Convert a decoded plane into a grayscale image.
///
/// # Errors
/// `BufferSize` if `data` is not exactly one plane of `metadata`.
pub fn plane_to_image(
    data: &[u8],
    metadata: &SeriesMetadata,
    byte_order: ByteOrder,
) -> Result<DynamicImage, ExportError> {
    let expected = metadata.plane_size();
    if data.len() != expected {
        return Err(ExportError::BufferSize {
            expected,
            actual: data.len(),
        });
    }

    let (width, height) = (metadata.size_x, metadata.size_y);
    let size_error = || ExportError::BufferSize {
        expected,
        actual: data.len(),
    };

    let image = match metadata.pixel_type {
        PixelType::Uint8 => {
            let buffer = GrayImage::from_raw(width, height, data.to_vec()).ok_or_else(size_error)?;
            DynamicImage::ImageLuma8(buffer)
        }
        PixelType::Uint16 => {
            let samples: Vec<u16> = data
                .chunks_exact(2)
                .map(|c| byte_order.read_u16(c))
                .collect();
            let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples)
                .ok_or_else(size_error)?;
            DynamicImage::ImageLuma16(buffer)
        }
        PixelType::Uint32 => {
            let samples: Vec<f64> = data
                .chunks_exact(4)
                .map(|c| byte_order.read_u32(c) as f64)
                .collect();
            stretch_to_luma16(width, height, &samples).ok_or_else(size_error)?
        }
        PixelType::Float => {
            let samples: Vec<f64> = data
                .chunks_exact(4)
                .map(|c| f32::from_bits(byte_order.read_u32(c)) as f64)
                .collect();
            stretch_to_luma16(width, height, &samples).ok_or_else(size_error)?
        }
    };

    Ok(image)
}

/// Map samples linearly onto `0..=65535`. Non-finite samples become 0.
fn stretch_to_luma16(width: u32, height: u32, samples: &[f64]) -> Option<DynamicImage> {
    let (min, max) = samples
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let scaled: Vec<u16> = samples
        .iter()
        .map(|&v| {
            if v.is_finite() && range > 0.0 {
                (((v - min) / range) * u16::MAX as f64).round() as u16
            } else {
                0
            }
        })
        .collect();

    ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, scaled).map(DynamicImage::ImageLuma16)
}

/// Encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Bytes, ExportError> {
    let mut output = Cursor::new(Vec::new());
    image.write_to(&mut output, ImageFormat::Png)?;
    Ok(Bytes::from(output.into_inner()))
}

/// Write an image to `path` as PNG.
pub fn save_png(image: &DynamicImage, path: &Path) -> Result<(), ExportError> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
