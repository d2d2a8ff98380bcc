//! 8-bit intensity histogram extractor.

use rayon::prelude::*;

use super::FeatureExtractor;
use crate::error::Result;
use crate::models::{Histogram, NormalizationSpec, PixelArray, HISTOGRAM_BINS};
use crate::normalize::normalize;

/// Sample count above which binning is split across rayon workers.
const PARALLEL_THRESHOLD: usize = 1 << 20;

/// Samples per parallel work unit.
const CHUNK_SIZE: usize = 1 << 16;

/// Quantize one sample to an 8-bit level.
///
/// Fractions are truncated and out-of-range values saturate (negative and NaN
/// to 0, anything above 255 to 255). Lossy by construction so that images
/// normalized with different strategies land on comparable buckets.
#[inline]
pub fn quantize(value: f32) -> u8 {
    value as u8
}

fn bin_into(mut counts: Vec<u64>, samples: &[f32]) -> Vec<u64> {
    for &v in samples {
        counts[quantize(v) as usize] += 1;
    }
    counts
}

/// Bin raw samples into a 256-bucket histogram.
pub fn bin_samples(samples: &[f32]) -> Histogram {
    let counts = if samples.len() >= PARALLEL_THRESHOLD {
        samples
            .par_chunks(CHUNK_SIZE)
            .fold(|| vec![0u64; HISTOGRAM_BINS], bin_into)
            .reduce(
                || vec![0u64; HISTOGRAM_BINS],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            )
    } else {
        bin_into(vec![0u64; HISTOGRAM_BINS], samples)
    };
    Histogram::from_counts(counts)
}

/// Full 0-255 intensity histogram, optionally after normalization.
pub struct HistogramExtractor;

impl FeatureExtractor for HistogramExtractor {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["hist"]
    }

    fn extract(
        &self,
        pixels: &PixelArray,
        normalization: Option<&NormalizationSpec>,
    ) -> Result<Histogram> {
        match normalization {
            Some(spec) => Ok(bin_samples(&normalize(pixels, spec)?.data)),
            None => Ok(bin_samples(&pixels.data)),
        }
    }
}
