//! Pixel normalization strategies.
//!
//! Strategies implement [`Normalizer`] and are looked up by name in a
//! [`NormalizerRegistry`]. The free function [`normalize`] dispatches through
//! the process-wide registry holding the built-in strategies.

mod strategies;

#[cfg(test)]
mod tests;

pub use strategies::{Equalize, MaxScale, MinMax, Robust, ZScore};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::error::{OdmError, Result};
use crate::models::{NormalizationSpec, PixelArray};

/// A pure, shape-preserving transform of pixel samples.
pub trait Normalizer: Send + Sync {
    /// Canonical registry name.
    fn name(&self) -> &'static str;

    /// Alternative names this strategy is also registered under.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Map `data` to a new buffer of the same length.
    fn apply(&self, data: &[f32], spec: &NormalizationSpec) -> Result<Vec<f32>>;

    /// Closed interval every finite output lies in, if the strategy bounds it.
    fn output_range(&self, _spec: &NormalizationSpec) -> Result<Option<(f32, f32)>> {
        Ok(None)
    }
}

/// Name -> strategy lookup table.
#[derive(Clone, Default)]
pub struct NormalizerRegistry {
    strategies: HashMap<String, Arc<dyn Normalizer>>,
}

impl NormalizerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding minmax, max, zscore, robust and equalize.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MinMax));
        registry.register(Arc::new(MaxScale));
        registry.register(Arc::new(ZScore));
        registry.register(Arc::new(Robust));
        registry.register(Arc::new(Equalize));
        registry
    }

    /// Add a strategy under its name and aliases, replacing earlier entries.
    pub fn register(&mut self, normalizer: Arc<dyn Normalizer>) {
        for alias in normalizer.aliases() {
            self.strategies
                .insert(alias.to_string(), Arc::clone(&normalizer));
        }
        self.strategies
            .insert(normalizer.name().to_string(), normalizer);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Normalizer>> {
        self.strategies
            .get(name)
            .ok_or_else(|| OdmError::UnknownStrategy(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Sorted list of every registered name, aliases included.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Normalize one image with the named strategy.
    pub fn normalize(&self, pixels: &PixelArray, spec: &NormalizationSpec) -> Result<PixelArray> {
        let strategy = self.get(&spec.name)?;
        if pixels.is_empty() {
            return Err(OdmError::invalid(
                format!("normalization '{}'", spec.name),
                "pixel array is empty",
            ));
        }
        let data = strategy.apply(&pixels.data, spec)?;
        if data.len() != pixels.data.len() {
            return Err(OdmError::invalid(
                format!("normalization '{}'", spec.name),
                format!(
                    "strategy changed sample count from {} to {}",
                    pixels.data.len(),
                    data.len()
                ),
            ));
        }
        Ok(pixels.with_data(data))
    }
}

static DEFAULT_REGISTRY: OnceLock<NormalizerRegistry> = OnceLock::new();

/// Process-wide registry of built-in strategies.
pub fn default_registry() -> &'static NormalizerRegistry {
    DEFAULT_REGISTRY.get_or_init(NormalizerRegistry::with_builtin)
}

/// Normalize `pixels` with the built-in strategy named by `spec`.
pub fn normalize(pixels: &PixelArray, spec: &NormalizationSpec) -> Result<PixelArray> {
    default_registry().normalize(pixels, spec)
}

/// [`normalize`] that logs elapsed time when `timing` is set.
pub fn normalize_timed(
    pixels: &PixelArray,
    spec: &NormalizationSpec,
    timing: bool,
) -> Result<PixelArray> {
    let start = Instant::now();
    let result = normalize(pixels, spec);
    if timing {
        log::info!(
            "Normalize ({}): {:.6}s",
            spec.name,
            start.elapsed().as_secs_f64()
        );
    }
    result
}
