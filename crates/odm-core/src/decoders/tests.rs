//! Tests for image decoders

use super::*;
use std::fs::File;
use std::io::BufWriter;
use tempfile::tempdir;

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    color: ::png::ColorType,
    depth: ::png::BitDepth,
    bytes: &[u8],
) {
    let file = File::create(path).unwrap();
    let mut encoder = ::png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(bytes).unwrap();
}

#[test]
fn test_decode_gray8_png() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gray.png");
    write_png(
        &path,
        2,
        2,
        ::png::ColorType::Grayscale,
        ::png::BitDepth::Eight,
        &[0, 64, 128, 255],
    );

    let pixels = ImageDecoder.decode(&path).unwrap();
    assert_eq!(pixels.shape(), (2, 2, 1));
    assert_eq!(pixels.data, vec![0.0, 64.0, 128.0, 255.0]);
}

#[test]
fn test_decode_gray16_png_keeps_native_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gray16.PNG");
    let bytes: Vec<u8> = [1000u16, 65535]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();
    write_png(
        &path,
        2,
        1,
        ::png::ColorType::Grayscale,
        ::png::BitDepth::Sixteen,
        &bytes,
    );

    let pixels = ImageDecoder.decode(&path).unwrap();
    assert_eq!(pixels.data, vec![1000.0, 65535.0]);
}

#[test]
fn test_decode_rgba_png_averages_color_and_drops_alpha() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rgba.png");
    write_png(
        &path,
        1,
        1,
        ::png::ColorType::Rgba,
        ::png::BitDepth::Eight,
        &[30, 60, 90, 0],
    );

    let pixels = ImageDecoder.decode(&path).unwrap();
    assert_eq!(pixels.data, vec![60.0]);
}

#[test]
fn test_corrupt_file_is_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not a png").unwrap();

    match ImageDecoder.decode(&path) {
        Err(OdmError::Decode { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected Decode error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_extension_is_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.dcm");
    std::fs::write(&path, b"DICM").unwrap();

    let err = ImageDecoder.decode(&path).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format: dcm"));
}

#[test]
fn test_missing_extension_is_decode_error() {
    let err = ImageDecoder.decode(Path::new("no_extension")).unwrap_err();
    assert!(matches!(err, OdmError::Decode { .. }));
}

#[test]
fn test_to_intensity_gray_alpha() {
    let samples: [u8; 4] = [10, 255, 20, 0];
    assert_eq!(to_intensity(&samples, 2, true), vec![10.0, 20.0]);
}
