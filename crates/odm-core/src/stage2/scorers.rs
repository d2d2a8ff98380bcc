//! Built-in scorer.

use crate::error::Result;
use crate::features::histogram_batch;
use crate::models::{NormalizationSpec, PixelArray};

use super::Scorer;

/// Maximum entropy of a 256-bucket histogram, in bits.
const MAX_ENTROPY_BITS: f64 = 8.0;

/// Scores each image by how little intensity information it carries:
/// `8 - H(histogram)`. Blank, clipped or near-binary images score high.
///
/// Scores depend only on the image itself, so they stay comparable across
/// batches.
#[derive(Debug, Clone, Default)]
pub struct HistogramEntropyScorer {
    pub normalization: Option<NormalizationSpec>,
}

impl HistogramEntropyScorer {
    pub fn new(normalization: Option<NormalizationSpec>) -> Self {
        Self { normalization }
    }
}

impl Scorer for HistogramEntropyScorer {
    fn score(&self, batch: &[PixelArray]) -> Result<Vec<f64>> {
        let histograms = histogram_batch(batch, self.normalization.as_ref())?;
        Ok(histograms
            .iter()
            .map(|h| MAX_ENTROPY_BITS - h.entropy())
            .collect())
    }
}
