//! Feature extraction.
//!
//! Histograms are the only feature kind today. Extractors are registered by
//! name so new kinds can be added without touching the callers, and the
//! single-image vs batch input shape is carried by [`FeatureInput`] rather
//! than inspected at runtime.

mod histogram;


pub use histogram::{bin_samples, quantize, HistogramExtractor};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::error::{OdmError, Result};
use crate::models::{Histogram, NormalizationSpec, PixelArray};

/// Computes a feature for one image.
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Extract the feature, normalizing first when `normalization` is set.
    fn extract(
        &self,
        pixels: &PixelArray,
        normalization: Option<&NormalizationSpec>,
    ) -> Result<Histogram>;
}

/// Name -> extractor lookup table.
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    extractors: HashMap<String, Arc<dyn FeatureExtractor>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the histogram extractor ("histogram" / "hist").
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HistogramExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn FeatureExtractor>) {
        for alias in extractor.aliases() {
            self.extractors
                .insert(alias.to_string(), Arc::clone(&extractor));
        }
        self.extractors
            .insert(extractor.name().to_string(), extractor);
    }

    pub fn get(&self, feature_type: &str) -> Result<&Arc<dyn FeatureExtractor>> {
        self.extractors
            .get(feature_type)
            .ok_or_else(|| OdmError::UnsupportedFeatureType(feature_type.to_string()))
    }
}

static DEFAULT_REGISTRY: OnceLock<FeatureRegistry> = OnceLock::new();

/// Process-wide registry of built-in extractors.
pub fn default_registry() -> &'static FeatureRegistry {
    DEFAULT_REGISTRY.get_or_init(FeatureRegistry::with_builtin)
}

/// One image or an ordered batch of images.
#[derive(Debug, Clone, Copy)]
pub enum FeatureInput<'a> {
    Single(&'a PixelArray),
    Batch(&'a [PixelArray]),
}

/// Mirrors the shape of the [`FeatureInput`] it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutput {
    Single(Histogram),
    Batch(Vec<Histogram>),
}

impl FeatureOutput {
    /// Flatten to a list, one entry per input image.
    pub fn into_vec(self) -> Vec<Histogram> {
        match self {
            FeatureOutput::Single(h) => vec![h],
            FeatureOutput::Batch(hs) => hs,
        }
    }
}

/// Histogram of one image.
pub fn histogram(pixels: &PixelArray, normalization: Option<&NormalizationSpec>) -> Result<Histogram> {
    HistogramExtractor.extract(pixels, normalization)
}

/// Histograms of a batch, in input order.
pub fn histogram_batch(
    batch: &[PixelArray],
    normalization: Option<&NormalizationSpec>,
) -> Result<Vec<Histogram>> {
    batch
        .iter()
        .map(|pixels| HistogramExtractor.extract(pixels, normalization))
        .collect()
}

/// Extract the named feature for one image or a batch.
///
/// `feature_type` must name a registered extractor ("hist" or "histogram"
/// out of the box). When `timing` is set the elapsed time is logged; the
/// result is unaffected.
pub fn get_features(
    input: FeatureInput<'_>,
    feature_type: &str,
    normalization: Option<&NormalizationSpec>,
    timing: bool,
) -> Result<FeatureOutput> {
    let start = Instant::now();
    let extractor = default_registry().get(feature_type)?;

    let output = match input {
        FeatureInput::Single(pixels) => {
            FeatureOutput::Single(extractor.extract(pixels, normalization)?)
        }
        FeatureInput::Batch(batch) => FeatureOutput::Batch(
            batch
                .iter()
                .map(|pixels| extractor.extract(pixels, normalization))
                .collect::<Result<Vec<_>>>()?,
        ),
    };

    if timing {
        log::info!(
            "Get features ({}): {:.6}s",
            feature_type,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(output)
}
