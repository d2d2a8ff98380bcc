use odm_core::config::OdmConfig;
use odm_core::stage1::run_stage1;
use odm_core::ImageDecoder;

use super::log_stage1_properties;
use crate::args::Stage1Args;

/// Screen the data root and write the accepted-path manifest.
pub fn cmd_stage1(mut config: OdmConfig, args: &Stage1Args) -> Result<(), String> {
    args.apply(&mut config.stage1)?;
    config.stage1.validate().map_err(|e| e.to_string())?;
    log_stage1_properties(&config.stage1);

    let report = run_stage1(&config.stage1, ImageDecoder).map_err(|e| e.to_string())?;

    println!("Manifest written to {}", config.stage1.final_file.display());
    println!("number of accepted paths: {}", report.accepted);
    println!(
        "number of rejected paths: {} ({} unreadable)",
        report.rejected, report.failed
    );
    Ok(())
}
