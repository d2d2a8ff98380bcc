//! Per-stage option structs, their defaults, and validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OdmError, Result};
use crate::models::{NormalizationSpec, OutlierTail};
use crate::normalize::default_registry;

/// Check a normalization spec names a registered strategy with usable
/// parameters.
fn validate_normalization(field: &str, spec: &NormalizationSpec) -> Result<()> {
    if spec.name.trim().is_empty() {
        return Err(OdmError::ConfigValidation(format!(
            "{} name must not be empty",
            field
        )));
    }
    default_registry()
        .get(&spec.name)
        .and_then(|strategy| strategy.output_range(spec))
        .map(|_| ())
        .map_err(|e| OdmError::ConfigValidation(format!("{}: {}", field, e)))
}

/// Stage 1 (histogram screening) options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage1Config {
    /// Directory scanned (recursively) for input images
    pub data_root: PathBuf,
    /// Manifest of accepted paths written at the end of the stage
    pub final_file: PathBuf,
    /// File extension filter, with or without the leading dot
    pub ext: String,
    /// Files per dispatched batch
    pub batch_size: usize,
    /// Worker threads in the stage 1 pool
    pub max_workers: usize,
    /// Log elapsed time per batch and for the whole stage
    pub timing: bool,
    /// Sort the scanned file list instead of keeping enumeration order
    pub sort_files: bool,
    /// Normalization applied before binning
    pub normalization: Option<NormalizationSpec>,
    /// Histogram rule deciding whether an image is usable
    pub acceptance: AcceptanceConfig,
    /// Keep each image's histogram in the stage report
    pub keep_histograms: bool,
}

impl Default for Stage1Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            final_file: PathBuf::from("stage1_good_paths.txt"),
            ext: ".dcm".to_string(),
            batch_size: 100,
            max_workers: num_cpus::get(),
            timing: false,
            sort_files: false,
            normalization: None,
            acceptance: AcceptanceConfig::default(),
            keep_histograms: false,
        }
    }
}

impl Stage1Config {
    pub fn validate(&self) -> Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(OdmError::ConfigValidation("data_root must not be empty".into()));
        }
        if self.final_file.as_os_str().is_empty() {
            return Err(OdmError::ConfigValidation("final_file must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(OdmError::ConfigValidation("batch_size must be positive".into()));
        }
        if self.max_workers == 0 {
            return Err(OdmError::ConfigValidation("max_workers must be positive".into()));
        }
        if let Some(spec) = &self.normalization {
            validate_normalization("stage1.normalization", spec)?;
        }
        self.acceptance.validate()
    }
}

/// Parameters of the built-in histogram acceptance rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Minimum number of non-empty histogram buckets
    pub min_nonempty_bins: usize,
    /// Maximum share of pixels allowed in the single fullest bucket (1.0 disables)
    pub max_peak_fraction: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            min_nonempty_bins: 5,
            max_peak_fraction: 1.0,
        }
    }
}

impl AcceptanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_nonempty_bins > crate::models::HISTOGRAM_BINS {
            return Err(OdmError::ConfigValidation(format!(
                "acceptance.min_nonempty_bins must be at most {}, got {}",
                crate::models::HISTOGRAM_BINS,
                self.min_nonempty_bins
            )));
        }
        if !(self.max_peak_fraction > 0.0 && self.max_peak_fraction <= 1.0) {
            return Err(OdmError::ConfigValidation(format!(
                "acceptance.max_peak_fraction must be in (0, 1], got {}",
                self.max_peak_fraction
            )));
        }
        Ok(())
    }
}

/// Stage 2 (outlier partitioning) options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage2Config {
    /// Manifest to partition; falls back to the stage 1 `final_file`
    pub caselist: Option<PathBuf>,
    /// Expected proportion of outliers, in (0, 1)
    pub contamination: f64,
    /// Images per scorer call
    pub batch_size: usize,
    pub good_output: PathBuf,
    pub bad_output: PathBuf,
    pub timing: bool,
    /// Log per-batch progress
    pub verbose: bool,
    /// Which end of the score distribution is "bad"
    pub tail: OutlierTail,
    /// Normalization used by the built-in scorer
    pub normalization: Option<NormalizationSpec>,
}

impl Default for Stage2Config {
    fn default() -> Self {
        Self {
            caselist: None,
            contamination: 0.015,
            batch_size: 100,
            good_output: PathBuf::from("good_paths.txt"),
            bad_output: PathBuf::from("bad_paths.txt"),
            timing: false,
            verbose: false,
            tail: OutlierTail::High,
            normalization: None,
        }
    }
}

impl Stage2Config {
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(OdmError::ConfigValidation(format!(
                "contamination must be in (0, 1), got {}",
                self.contamination
            )));
        }
        if self.batch_size == 0 {
            return Err(OdmError::ConfigValidation("batch_size must be positive".into()));
        }
        if let Some(caselist) = &self.caselist {
            if caselist.as_os_str().is_empty() {
                return Err(OdmError::ConfigValidation("caselist must not be empty".into()));
            }
        }
        if self.good_output.as_os_str().is_empty() || self.bad_output.as_os_str().is_empty() {
            return Err(OdmError::ConfigValidation(
                "good_output and bad_output must not be empty".into(),
            ));
        }
        if self.good_output == self.bad_output {
            return Err(OdmError::ConfigValidation(
                "good_output and bad_output must be different files".into(),
            ));
        }
        if let Some(spec) = &self.normalization {
            validate_normalization("stage2.normalization", spec)?;
        }
        Ok(())
    }
}
