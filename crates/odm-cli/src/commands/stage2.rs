use odm_core::config::OdmConfig;
use odm_core::stage2::{run_stage2, HistogramEntropyScorer};
use odm_core::ImageDecoder;

use super::{log_stage2_properties, print_partition};
use crate::args::Stage2Args;

/// Partition the caselist into good and bad path lists.
pub fn cmd_stage2(mut config: OdmConfig, args: &Stage2Args) -> Result<(), String> {
    args.apply(&mut config.stage2)?;
    config.stage2.validate().map_err(|e| e.to_string())?;

    let caselist = config.caselist().to_path_buf();
    log_stage2_properties(&config.stage2, &caselist);

    let scorer = HistogramEntropyScorer::new(config.stage2.normalization.clone());
    let report = run_stage2(&config.stage2, &caselist, ImageDecoder, scorer)
        .map_err(|e| e.to_string())?;

    print_partition(&config.stage2, &report);
    Ok(())
}
