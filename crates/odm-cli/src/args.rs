//! Argument structs for the stage commands.
//!
//! Every flag is optional and only overrides the loaded config when given.

use std::path::PathBuf;

use clap::Args;
use odm_core::config::{OdmConfig, Stage1Config, Stage2Config};

use crate::parsers::{merge_normalization, parse_tail};

/// Stage 1 (histogram screening) overrides.
#[derive(Args, Clone, Debug, Default)]
pub struct Stage1Args {
    /// Directory scanned recursively for images
    #[arg(long, value_name = "DIR")]
    pub data_root: Option<PathBuf>,

    /// Manifest of accepted paths to write
    #[arg(long, value_name = "FILE")]
    pub final_file: Option<PathBuf>,

    /// File extension to pick up (e.g. .png)
    #[arg(long, value_name = "EXT")]
    pub ext: Option<String>,

    /// Files per batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 'j', long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Log elapsed time per batch and for the whole stage
    #[arg(long)]
    pub timing: bool,

    /// Process files in sorted order instead of directory order
    #[arg(long)]
    pub sort: bool,

    /// Normalization strategy applied before binning
    /// (minmax, max, zscore, robust, equalize)
    #[arg(long, value_name = "NAME")]
    pub norm: Option<String>,

    /// Normalization parameter, repeatable (e.g. --norm-param hi=1.0)
    #[arg(long, value_name = "KEY=VALUE")]
    pub norm_param: Vec<String>,

    /// Minimum number of non-empty histogram buckets for acceptance
    #[arg(long, value_name = "N")]
    pub min_bins: Option<usize>,

    /// Maximum share of pixels in the fullest bucket (0-1]
    #[arg(long, value_name = "FRACTION")]
    pub max_peak: Option<f64>,
}

impl Stage1Args {
    pub fn apply(&self, config: &mut Stage1Config) -> Result<(), String> {
        if let Some(data_root) = &self.data_root {
            config.data_root = data_root.clone();
        }
        if let Some(final_file) = &self.final_file {
            config.final_file = final_file.clone();
        }
        if let Some(ext) = &self.ext {
            config.ext = ext.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = max_workers;
        }
        if self.timing {
            config.timing = true;
        }
        if self.sort {
            config.sort_files = true;
        }
        if let Some(min_bins) = self.min_bins {
            config.acceptance.min_nonempty_bins = min_bins;
        }
        if let Some(max_peak) = self.max_peak {
            config.acceptance.max_peak_fraction = max_peak;
        }
        config.normalization = merge_normalization(
            config.normalization.take(),
            self.norm.as_deref(),
            &self.norm_param,
        )?;
        Ok(())
    }
}

/// Stage 2 (outlier partitioning) overrides.
#[derive(Args, Clone, Debug, Default)]
pub struct Stage2Args {
    /// Manifest to partition (default: stage 1 final file)
    #[arg(long, value_name = "FILE")]
    pub caselist: Option<PathBuf>,

    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Images per scorer call
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Log elapsed time per batch and for the whole stage
    #[arg(long)]
    pub timing: bool,

    /// Normalization used by the entropy scorer
    #[arg(long, value_name = "NAME")]
    pub norm: Option<String>,

    /// Normalization parameter, repeatable (e.g. --norm-param hi=1.0)
    #[arg(long, value_name = "KEY=VALUE")]
    pub norm_param: Vec<String>,
}

impl Stage2Args {
    pub fn apply(&self, config: &mut Stage2Config) -> Result<(), String> {
        if let Some(caselist) = &self.caselist {
            config.caselist = Some(caselist.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.timing {
            config.timing = true;
        }
        config.normalization = merge_normalization(
            config.normalization.take(),
            self.norm.as_deref(),
            &self.norm_param,
        )?;
        self.partition.apply(config)
    }
}

/// Partitioning options accepted by both `stage2` and `run`.
#[derive(Args, Clone, Debug, Default)]
pub struct PartitionArgs {
    /// Expected share of outliers, in (0, 1)
    #[arg(long, value_name = "FRACTION")]
    pub contamination: Option<f64>,

    /// Output list of good paths
    #[arg(long, value_name = "FILE")]
    pub good_output: Option<PathBuf>,

    /// Output list of bad paths
    #[arg(long, value_name = "FILE")]
    pub bad_output: Option<PathBuf>,

    /// Which scores count as outliers: "high" (default) or "low"
    #[arg(long, value_name = "TAIL")]
    pub tail: Option<String>,
}

impl PartitionArgs {
    pub fn apply(&self, config: &mut Stage2Config) -> Result<(), String> {
        if let Some(contamination) = self.contamination {
            config.contamination = contamination;
        }
        if let Some(good_output) = &self.good_output {
            config.good_output = good_output.clone();
        }
        if let Some(bad_output) = &self.bad_output {
            config.bad_output = bad_output.clone();
        }
        if let Some(tail) = &self.tail {
            config.tail = parse_tail(tail)?;
        }
        Ok(())
    }
}

/// Arguments for `run`: stage 1 overrides plus the partitioning options.
#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub stage1: Stage1Args,

    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Images per scorer call in stage 2
    #[arg(long, value_name = "N")]
    pub score_batch_size: Option<usize>,

    /// Normalization applied before the stage 2 entropy scorer
    #[arg(long, value_name = "NAME")]
    pub score_norm: Option<String>,

    /// Stage 2 normalization parameter, repeatable (e.g. --score-norm-param lo=0)
    #[arg(long, value_name = "KEY=VALUE")]
    pub score_norm_param: Vec<String>,
}

impl RunArgs {
    /// Apply overrides; stage 2 always reads the manifest stage 1 writes.
    pub fn apply(&self, config: &mut OdmConfig) -> Result<(), String> {
        self.stage1.apply(&mut config.stage1)?;
        self.partition.apply(&mut config.stage2)?;
        if let Some(batch_size) = self.score_batch_size {
            config.stage2.batch_size = batch_size;
        }
        config.stage2.normalization = merge_normalization(
            config.stage2.normalization.take(),
            self.score_norm.as_deref(),
            &self.score_norm_param,
        )?;
        if self.stage1.timing {
            config.stage2.timing = true;
        }
        config.stage2.caselist = Some(config.stage1.final_file.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use odm_core::models::OutlierTail;

    #[derive(Parser)]
    struct Stage1Cli {
        #[command(flatten)]
        args: Stage1Args,
    }

    #[derive(Parser)]
    struct Stage2Cli {
        #[command(flatten)]
        args: Stage2Args,
    }

    #[derive(Parser)]
    struct RunCli {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_stage1_overrides() {
        let cli = Stage1Cli::try_parse_from([
            "odm",
            "--data-root",
            "/scans",
            "--ext",
            "png",
            "--batch-size",
            "16",
            "-j",
            "3",
            "--norm",
            "minmax",
            "--norm-param",
            "hi=1",
            "--norm-param",
            "lo=0",
            "--min-bins",
            "10",
        ])
        .unwrap();

        let mut config = Stage1Config::default();
        cli.args.apply(&mut config).unwrap();
        assert_eq!(config.data_root, PathBuf::from("/scans"));
        assert_eq!(config.ext, "png");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.acceptance.min_nonempty_bins, 10);
        let norm = config.normalization.unwrap();
        assert_eq!(norm.name, "minmax");
        assert_eq!(norm.params.get("hi"), Some(&1.0));
        assert_eq!(norm.params.get("lo"), Some(&0.0));
    }

    #[test]
    fn test_stage1_no_flags_keeps_config() {
        let cli = Stage1Cli::try_parse_from(["odm"]).unwrap();
        let mut config = Stage1Config {
            batch_size: 7,
            ..Stage1Config::default()
        };
        let before = config.clone();
        cli.args.apply(&mut config).unwrap();
        assert_eq!(config, before);
    }

    #[test]
    fn test_stage2_overrides() {
        let cli = Stage2Cli::try_parse_from([
            "odm",
            "--caselist",
            "final.txt",
            "--contamination",
            "0.2",
            "--tail",
            "low",
            "--good-output",
            "g.txt",
            "--bad-output",
            "b.txt",
        ])
        .unwrap();

        let mut config = Stage2Config::default();
        cli.args.apply(&mut config).unwrap();
        assert_eq!(config.caselist, Some(PathBuf::from("final.txt")));
        assert_eq!(config.contamination, 0.2);
        assert_eq!(config.tail, OutlierTail::Low);
        assert_eq!(config.good_output, PathBuf::from("g.txt"));
        assert_eq!(config.bad_output, PathBuf::from("b.txt"));
    }

    #[test]
    fn test_stage2_bad_tail() {
        let cli = Stage2Cli::try_parse_from(["odm", "--tail", "sideways"]).unwrap();
        assert!(cli.args.apply(&mut Stage2Config::default()).is_err());
    }

    #[test]
    fn test_run_points_stage2_at_stage1_manifest() {
        let cli = RunCli::try_parse_from([
            "odm",
            "--final-file",
            "out/final.txt",
            "--batch-size",
            "4",
            "--score-batch-size",
            "9",
            "--contamination",
            "0.1",
        ])
        .unwrap();

        let mut config = OdmConfig::default();
        config.stage2.caselist = Some(PathBuf::from("elsewhere.txt"));
        cli.args.apply(&mut config).unwrap();
        assert_eq!(config.stage1.batch_size, 4);
        assert_eq!(config.stage2.batch_size, 9);
        assert_eq!(config.stage2.contamination, 0.1);
        assert_eq!(config.caselist(), PathBuf::from("out/final.txt").as_path());
    }

    #[test]
    fn test_run_scorer_normalization_is_separate() {
        let cli = RunCli::try_parse_from([
            "odm",
            "--norm",
            "zscore",
            "--score-norm",
            "minmax",
            "--score-norm-param",
            "hi=255",
        ])
        .unwrap();

        let mut config = OdmConfig::default();
        cli.args.apply(&mut config).unwrap();
        assert_eq!(config.stage1.normalization.unwrap().name, "zscore");
        let scorer_norm = config.stage2.normalization.unwrap();
        assert_eq!(scorer_norm.name, "minmax");
        assert_eq!(scorer_norm.params.get("hi"), Some(&255.0));
    }

    #[test]
    fn test_run_without_score_norm_keeps_config() {
        let cli = RunCli::try_parse_from(["odm", "--norm", "zscore"]).unwrap();
        let mut config = OdmConfig::default();
        cli.args.apply(&mut config).unwrap();
        assert!(config.stage2.normalization.is_none());

        let cli = RunCli::try_parse_from(["odm", "--score-norm-param", "garbage"]).unwrap();
        assert!(cli.args.apply(&mut OdmConfig::default()).is_err());
    }
}
