//! Image decoding.
//!
//! The pipeline only depends on the [`Decoder`] trait. [`ImageDecoder`] is the
//! built-in implementation for PNG and TIFF files; other formats (DICOM
//! included) are handled by plugging in a different decoder.

mod png;
mod tiff;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::error::{OdmError, Result};
use crate::models::PixelArray;

/// Turns a file path into a pixel array.
pub trait Decoder: Send + Sync {
    /// Decode `path`, failing with [`OdmError::Decode`] for corrupt or
    /// unsupported files.
    fn decode(&self, path: &Path) -> Result<PixelArray>;
}

impl<D: Decoder + ?Sized> Decoder for &D {
    fn decode(&self, path: &Path) -> Result<PixelArray> {
        (**self).decode(path)
    }
}

/// PNG/TIFF decoder producing single-channel intensity grids.
///
/// Samples keep the file's native units (0-255 for 8-bit data, 0-65535 for
/// 16-bit data, raw values for float TIFFs). Colour images are reduced to
/// the mean of their RGB channels; alpha is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

/// Extensions [`ImageDecoder`] can read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "tif", "tiff"];

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<PixelArray> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| OdmError::decode(path, "No file extension found"))?;

        let decoded = match extension.as_str() {
            "tif" | "tiff" => tiff::decode_tiff(path),
            "png" => png::decode_png(path),
            _ => Err(format!("Unsupported file format: {}", extension)),
        };

        let (width, height, data) = decoded.map_err(|message| OdmError::decode(path, message))?;
        PixelArray::grayscale(width, height, data)
            .map_err(|e| OdmError::decode(path, e.to_string()))
    }
}

/// Collapse interleaved samples to one intensity per pixel.
///
/// `channels` counts samples per pixel in `samples`; when `has_alpha` is set
/// the last sample of each pixel is ignored.
pub(crate) fn to_intensity<T: Copy + Into<f64>>(
    samples: &[T],
    channels: usize,
    has_alpha: bool,
) -> Vec<f32> {
    if channels == 1 {
        return samples.iter().map(|&v| v.into() as f32).collect();
    }
    let color = if has_alpha { channels - 1 } else { channels };
    samples
        .chunks_exact(channels)
        .map(|px| {
            let sum: f64 = px[..color].iter().map(|&v| v.into()).sum();
            (sum / color as f64) as f32
        })
        .collect()
}

/// Check a decoded buffer holds `width * height * channels` samples.
pub(crate) fn check_len(len: usize, width: u32, height: u32, channels: usize) -> std::result::Result<(), String> {
    let expected = width as usize * height as usize * channels;
    if len != expected {
        return Err(format!(
            "buffer size mismatch: expected {}, got {}",
            expected, len
        ));
    }
    Ok(())
}
