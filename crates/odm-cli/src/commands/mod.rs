//! Command implementations for the odm CLI.

mod run;
mod stage1;
mod stage2;

// Re-export all command functions
pub use run::cmd_run;
pub use stage1::cmd_stage1;
pub use stage2::cmd_stage2;

use std::path::Path;

use odm_core::config::{self, OdmConfig, Stage1Config, Stage2Config};
use odm_core::Stage2Report;

use crate::logging::init_logging;

/// Load the config, install the logger and apply the global flags.
pub fn prepare(config_path: Option<&Path>, verbose: bool) -> Result<OdmConfig, String> {
    let handle = config::load_config(config_path).map_err(|e| e.to_string())?;
    config::set_verbose(verbose);

    if let Some(path) = init_logging(verbose, handle.config.log_dir.as_deref())? {
        eprintln!("Logging to {}", path.display());
    }
    config::log_config_source(&handle);

    let mut config = handle.config;
    if verbose {
        config.stage2.verbose = true;
    }
    Ok(config)
}

fn log_stage1_properties(config: &Stage1Config) {
    log::info!("Stage 1 properties:");
    log::info!("  data_root: {}", config.data_root.display());
    log::info!("  final_file: {}", config.final_file.display());
    log::info!("  ext: {}", config.ext);
    log::info!("  batch_size: {}", config.batch_size);
    log::info!("  max_workers: {}", config.max_workers);
    log::info!("  sort_files: {}", config.sort_files);
    log::info!("  timing: {}", config.timing);
    match &config.normalization {
        Some(spec) => log::info!("  normalization: {} {:?}", spec.name, spec.params),
        None => log::info!("  normalization: none"),
    }
    log::info!(
        "  acceptance: min_nonempty_bins={}, max_peak_fraction={}",
        config.acceptance.min_nonempty_bins,
        config.acceptance.max_peak_fraction
    );
}

fn log_stage2_properties(config: &Stage2Config, caselist: &Path) {
    log::info!("Stage 2 properties:");
    log::info!("  caselist: {}", caselist.display());
    log::info!("  contamination: {}", config.contamination);
    log::info!("  tail: {}", config.tail);
    log::info!("  batch_size: {}", config.batch_size);
    log::info!("  good_output: {}", config.good_output.display());
    log::info!("  bad_output: {}", config.bad_output.display());
    log::info!("  timing: {}", config.timing);
    match &config.normalization {
        Some(spec) => log::info!("  normalization: {} {:?}", spec.name, spec.params),
        None => log::info!("  normalization: none"),
    }
}

fn print_partition(config: &Stage2Config, report: &Stage2Report) {
    println!("Good paths written to {}", config.good_output.display());
    println!("Bad paths written to {}", config.bad_output.display());
    println!("number of good paths: {}", report.partition.good.len());
    println!("number of bad paths: {}", report.partition.bad.len());
}
