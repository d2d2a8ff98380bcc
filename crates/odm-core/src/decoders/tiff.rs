//! TIFF decoder

use std::path::Path;

use super::{check_len, to_intensity};

/// Decode a TIFF file into `(width, height, intensities)`.
pub(crate) fn decode_tiff<P: AsRef<Path>>(path: P) -> Result<(u32, u32, Vec<f32>), String> {
    use std::fs::File;
    use std::io::BufReader;
    use tiff::decoder::{DecodingResult, Limits};

    let file = File::open(path.as_ref()).map_err(|e| format!("Failed to open TIFF file: {}", e))?;

    // Full-field mammograms run to several hundred MB uncompressed
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;

    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Failed to create TIFF decoder: {}", e))?
        .with_limits(limits);

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("Failed to get TIFF dimensions: {}", e))?;

    let color_type = decoder
        .colortype()
        .map_err(|e| format!("Failed to get TIFF color type: {}", e))?;

    let (channels, has_alpha) = match color_type {
        tiff::ColorType::Gray(_) => (1, false),
        tiff::ColorType::GrayA(_) => (2, true),
        tiff::ColorType::RGB(_) => (3, false),
        tiff::ColorType::RGBA(_) => (4, true),
        other => return Err(format!("Unsupported TIFF color type: {:?}", other)),
    };

    let image_data = decoder
        .read_image()
        .map_err(|e| format!("Failed to read TIFF image data: {}", e))?;

    let data = match image_data {
        DecodingResult::U8(buf) => intensity(&buf, width, height, channels, has_alpha)?,
        DecodingResult::U16(buf) => intensity(&buf, width, height, channels, has_alpha)?,
        DecodingResult::U32(buf) => intensity(&buf, width, height, channels, has_alpha)?,
        DecodingResult::U64(buf) => {
            let wide: Vec<f64> = buf.iter().map(|&v| v as f64).collect();
            intensity(&wide, width, height, channels, has_alpha)?
        }
        DecodingResult::F32(buf) => intensity(&buf, width, height, channels, has_alpha)?,
        DecodingResult::F64(buf) => intensity(&buf, width, height, channels, has_alpha)?,
        DecodingResult::F16(buf) => {
            let wide: Vec<f32> = buf.iter().map(|&v| v.to_f32()).collect();
            intensity(&wide, width, height, channels, has_alpha)?
        }
        DecodingResult::I8(_)
        | DecodingResult::I16(_)
        | DecodingResult::I32(_)
        | DecodingResult::I64(_) => {
            return Err("Signed integer TIFF formats not supported".to_string());
        }
    };

    Ok((width, height, data))
}

fn intensity<T: Copy + Into<f64>>(
    buf: &[T],
    width: u32,
    height: u32,
    channels: usize,
    has_alpha: bool,
) -> Result<Vec<f32>, String> {
    check_len(buf.len(), width, height, channels)?;
    Ok(to_intensity(buf, channels, has_alpha))
}
