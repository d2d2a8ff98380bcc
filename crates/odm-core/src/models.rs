//! Data model shared by both pipeline stages.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OdmError, Result};

/// Number of intensity levels a histogram is quantized to (8-bit).
pub const HISTOGRAM_BINS: usize = 256;

/// One image's intensity grid.
///
/// Samples are stored row-major, interleaved when `channels > 1`. Values are
/// kept in the source's native units (e.g. 0-65535 for 16-bit scans) so that
/// normalization strategies see the real dynamic range.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Samples per pixel (1 for the grayscale grids the decoder produces)
    pub channels: u8,

    /// Raw sample values
    pub data: Vec<f32>,
}

impl PixelArray {
    /// Build a pixel array, checking that the buffer matches the shape.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if expected == 0 {
            return Err(OdmError::invalid(
                "pixel array",
                format!("empty shape {}x{}x{}", width, height, channels),
            ));
        }
        if data.len() != expected {
            return Err(OdmError::invalid(
                "pixel array",
                format!(
                    "buffer size mismatch: expected {}, got {}",
                    expected,
                    data.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel array from a row-major buffer.
    pub fn grayscale(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        Self::new(width, height, 1, data)
    }

    /// Same shape, new samples. Used by normalizers.
    pub(crate) fn with_data(&self, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }
}

/// A named normalization strategy plus its options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizationSpec {
    /// Registered strategy name (e.g. "minmax", "zscore")
    pub name: String,

    /// Strategy-specific options
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl NormalizationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Read a numeric option, falling back to `default` when absent.
    pub fn param(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            Some(value) if !value.is_finite() => Err(OdmError::invalid(
                format!("normalization '{}'", self.name),
                format!("parameter '{}' must be finite, got {}", key, value),
            )),
            Some(value) => Ok(*value),
            None => Ok(default),
        }
    }
}

/// 256-bucket intensity histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    pub(crate) fn from_counts(counts: Vec<u64>) -> Self {
        debug_assert_eq!(counts.len(), HISTOGRAM_BINS);
        Self { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of samples binned.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of buckets holding at least one sample.
    pub fn non_empty_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Count in the most populated bucket.
    pub fn peak(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Shannon entropy of the bucket distribution, in bits.
    pub fn entropy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        self.counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

/// Stage 1 outcome for one visited file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub path: PathBuf,

    /// Whether the file passed the acceptance predicate
    pub accepted: bool,

    /// Extracted feature, retained only when `keep_histograms` is set
    pub histogram: Option<Histogram>,

    /// Decode/extract failure message, if the file could not be processed
    pub error: Option<String>,
}

/// Per-image score returned by the stage 2 scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub path: PathBuf,
    pub score: f64,
}

/// Stage 2 split of the manifest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    pub good: Vec<PathBuf>,
    pub bad: Vec<PathBuf>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.good.len() + self.bad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.good.is_empty() && self.bad.is_empty()
    }

    /// Observed fraction of paths flagged as bad.
    pub fn bad_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.bad.len() as f64 / self.len() as f64
        }
    }
}

/// Which end of the score distribution counts as "bad".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierTail {
    /// Highest scores are outliers
    #[default]
    High,
    /// Lowest scores are outliers
    Low,
}

impl FromStr for OutlierTail {
    type Err = OdmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "high" => Ok(OutlierTail::High),
            "low" => Ok(OutlierTail::Low),
            other => Err(OdmError::ConfigValidation(format!(
                "tail must be 'high' or 'low', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierTail::High => write!(f, "high"),
            OutlierTail::Low => write!(f, "low"),
        }
    }
}
