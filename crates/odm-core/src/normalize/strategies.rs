//! Built-in normalization strategies.

use super::Normalizer;
use crate::error::{OdmError, Result};
use crate::models::NormalizationSpec;
use crate::stats::{mean_std, quantile_sorted, sorted_finite};

/// Finite min and max of a buffer, `None` when nothing is finite.
fn finite_bounds(data: &[f32]) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn invalid(spec: &NormalizationSpec, message: impl Into<String>) -> OdmError {
    OdmError::invalid(format!("normalization '{}'", spec.name), message)
}

/// Linear rescale of `[min, max]` onto `[lo, hi]`.
pub struct MinMax;

impl MinMax {
    fn target(spec: &NormalizationSpec) -> Result<(f32, f32)> {
        let lo = spec.param("lo", 0.0)?;
        let hi = spec.param("hi", 255.0)?;
        if hi <= lo {
            return Err(invalid(
                spec,
                format!("'hi' ({}) must be greater than 'lo' ({})", hi, lo),
            ));
        }
        Ok((lo as f32, hi as f32))
    }
}

impl Normalizer for MinMax {
    fn name(&self) -> &'static str {
        "minmax"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["min-max", "min_max"]
    }

    fn apply(&self, data: &[f32], spec: &NormalizationSpec) -> Result<Vec<f32>> {
        let (lo, hi) = Self::target(spec)?;
        let Some((min, max)) = finite_bounds(data) else {
            return Ok(vec![lo; data.len()]);
        };
        let span = max - min;
        if span <= 0.0 {
            return Ok(vec![lo; data.len()]);
        }
        let scale = (hi - lo) / span;
        Ok(data
            .iter()
            .map(|&v| ((v - min) * scale + lo).clamp(lo, hi))
            .collect())
    }

    fn output_range(&self, spec: &NormalizationSpec) -> Result<Option<(f32, f32)>> {
        Self::target(spec).map(Some)
    }
}

/// Divide by the maximum sample, then multiply by `scale`.
pub struct MaxScale;

impl MaxScale {
    fn scale(spec: &NormalizationSpec) -> Result<f32> {
        let scale = spec.param("scale", 255.0)?;
        if scale <= 0.0 {
            return Err(invalid(spec, format!("'scale' must be positive, got {}", scale)));
        }
        Ok(scale as f32)
    }
}

impl Normalizer for MaxScale {
    fn name(&self) -> &'static str {
        "max"
    }

    fn apply(&self, data: &[f32], spec: &NormalizationSpec) -> Result<Vec<f32>> {
        let scale = Self::scale(spec)?;
        let max = finite_bounds(data).map(|(_, hi)| hi).unwrap_or(0.0);
        if max <= 0.0 {
            return Ok(vec![0.0; data.len()]);
        }
        Ok(data
            .iter()
            .map(|&v| (v / max * scale).clamp(0.0, scale))
            .collect())
    }

    fn output_range(&self, spec: &NormalizationSpec) -> Result<Option<(f32, f32)>> {
        Ok(Some((0.0, Self::scale(spec)?)))
    }
}

/// Standard score: `(x - mean) / std`. Unbounded.
pub struct ZScore;

impl Normalizer for ZScore {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["z-score", "gaussian"]
    }

    fn apply(&self, data: &[f32], _spec: &NormalizationSpec) -> Result<Vec<f32>> {
        let (mean, std) = mean_std(data);
        if std <= f64::EPSILON {
            return Ok(vec![0.0; data.len()]);
        }
        Ok(data
            .iter()
            .map(|&v| ((v as f64 - mean) / std) as f32)
            .collect())
    }
}

/// `(x - median) / IQR`. Unbounded, insensitive to a few extreme pixels.
pub struct Robust;

impl Normalizer for Robust {
    fn name(&self) -> &'static str {
        "robust"
    }

    fn apply(&self, data: &[f32], _spec: &NormalizationSpec) -> Result<Vec<f32>> {
        let sorted = sorted_finite(data.iter().map(|&v| v as f64));
        if sorted.is_empty() {
            return Ok(vec![0.0; data.len()]);
        }
        let median = quantile_sorted(&sorted, 0.5);
        let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
        if iqr <= f64::EPSILON {
            return Ok(vec![0.0; data.len()]);
        }
        Ok(data
            .iter()
            .map(|&v| ((v as f64 - median) / iqr) as f32)
            .collect())
    }
}

/// Histogram equalization onto `[0, 255]`.
///
/// Samples are bucketed over their own `[min, max]` range into `bins`
/// buckets and remapped through the cumulative distribution.
pub struct Equalize;

impl Equalize {
    const OUTPUT_MAX: f32 = 255.0;
    const MAX_BINS: f64 = 65536.0;

    fn bins(spec: &NormalizationSpec) -> Result<usize> {
        let bins = spec.param("bins", 256.0)?;
        if !(2.0..=Self::MAX_BINS).contains(&bins) || bins.fract() != 0.0 {
            return Err(invalid(
                spec,
                format!(
                    "'bins' must be an integer in [2, {}], got {}",
                    Self::MAX_BINS,
                    bins
                ),
            ));
        }
        Ok(bins as usize)
    }
}

impl Normalizer for Equalize {
    fn name(&self) -> &'static str {
        "equalize"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["histeq", "equalization"]
    }

    fn apply(&self, data: &[f32], spec: &NormalizationSpec) -> Result<Vec<f32>> {
        let bins = Self::bins(spec)?;
        let Some((min, max)) = finite_bounds(data) else {
            return Ok(vec![0.0; data.len()]);
        };
        let span = max - min;
        if span <= 0.0 {
            return Ok(vec![0.0; data.len()]);
        }

        let bucket_of = |v: f32| -> usize {
            let t = ((v - min) / span).clamp(0.0, 1.0);
            ((t * (bins - 1) as f32) as usize).min(bins - 1)
        };

        let mut cdf = vec![0u64; bins];
        for &v in data.iter().filter(|v| v.is_finite()) {
            cdf[bucket_of(v)] += 1;
        }
        for i in 1..bins {
            cdf[i] += cdf[i - 1];
        }

        let total = cdf[bins - 1];
        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
        if total <= cdf_min {
            return Ok(vec![0.0; data.len()]);
        }
        let denom = (total - cdf_min) as f32;

        Ok(data
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    return 0.0;
                }
                let c = cdf[bucket_of(v)].saturating_sub(cdf_min) as f32;
                (c / denom * Self::OUTPUT_MAX).clamp(0.0, Self::OUTPUT_MAX)
            })
            .collect())
    }

    fn output_range(&self, spec: &NormalizationSpec) -> Result<Option<(f32, f32)>> {
        Self::bins(spec)?;
        Ok(Some((0.0, Self::OUTPUT_MAX)))
    }
}
