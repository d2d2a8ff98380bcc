//! PNG decoder

use std::path::Path;

use super::{check_len, to_intensity};

/// Decode a PNG file into `(width, height, intensities)`.
pub(crate) fn decode_png<P: AsRef<Path>>(path: P) -> Result<(u32, u32, Vec<f32>), String> {
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(path.as_ref()).map_err(|e| format!("Failed to open PNG file: {}", e))?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .map_err(|e| format!("Failed to read PNG info: {}", e))?;

    let info = reader.info();
    let width = info.width;
    let height = info.height;
    let color_type = info.color_type;
    let bit_depth = info.bit_depth;

    let buffer_size = reader
        .output_buffer_size()
        .ok_or_else(|| "Failed to determine PNG buffer size".to_string())?;
    let mut buf = vec![0u8; buffer_size];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|e| format!("Failed to read PNG frame: {}", e))?;
    let bytes = &buf[..frame_info.buffer_size()];

    let (channels, has_alpha) = match color_type {
        png::ColorType::Grayscale => (1, false),
        png::ColorType::GrayscaleAlpha => (2, true),
        png::ColorType::Rgb => (3, false),
        png::ColorType::Rgba => (4, true),
        png::ColorType::Indexed => return Err("Indexed PNG not supported".to_string()),
    };

    let data = match bit_depth {
        png::BitDepth::Eight => {
            check_len(bytes.len(), width, height, channels)?;
            to_intensity(bytes, channels, has_alpha)
        }
        png::BitDepth::Sixteen => {
            check_len(bytes.len(), width, height, channels * 2)?;
            // PNG 16-bit is big-endian
            let samples: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            to_intensity(&samples, channels, has_alpha)
        }
        other => {
            return Err(format!(
                "Unsupported PNG bit depth {:?} for {:?}",
                other, color_type
            ))
        }
    };

    Ok((width, height, data))
}
