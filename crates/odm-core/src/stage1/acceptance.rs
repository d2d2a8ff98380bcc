//! Usability rules applied to each image's histogram.

use crate::config::AcceptanceConfig;
use crate::models::Histogram;

/// Decides whether an image is structurally usable from its histogram.
pub trait AcceptancePredicate: Send + Sync {
    fn accept(&self, histogram: &Histogram) -> bool;

    /// Human-readable summary for logs.
    fn describe(&self) -> String;
}

/// Rejects degenerate histograms: too few occupied buckets, or one bucket
/// holding too much of the image (blank, saturated, or binary images).
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRule {
    pub min_nonempty_bins: usize,
    pub max_peak_fraction: f64,
}

impl From<&AcceptanceConfig> for HistogramRule {
    fn from(config: &AcceptanceConfig) -> Self {
        Self {
            min_nonempty_bins: config.min_nonempty_bins,
            max_peak_fraction: config.max_peak_fraction,
        }
    }
}

impl Default for HistogramRule {
    fn default() -> Self {
        Self::from(&AcceptanceConfig::default())
    }
}

impl AcceptancePredicate for HistogramRule {
    fn accept(&self, histogram: &Histogram) -> bool {
        let total = histogram.total();
        if total == 0 || histogram.non_empty_bins() < self.min_nonempty_bins {
            return false;
        }
        let peak_fraction = histogram.peak() as f64 / total as f64;
        peak_fraction <= self.max_peak_fraction
    }

    fn describe(&self) -> String {
        format!(
            "non-empty bins >= {}, peak fraction <= {}",
            self.min_nonempty_bins, self.max_peak_fraction
        )
    }
}
