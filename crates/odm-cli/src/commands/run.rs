use odm_core::config::OdmConfig;
use odm_core::stage1::run_stage1;
use odm_core::stage2::{run_stage2, HistogramEntropyScorer};
use odm_core::ImageDecoder;

use super::{log_stage1_properties, log_stage2_properties, print_partition};
use crate::args::RunArgs;

/// Run stage 1, then stage 2 on the manifest stage 1 wrote.
///
/// A stage 2 failure leaves the stage 1 manifest in place.
pub fn cmd_run(mut config: OdmConfig, args: &RunArgs) -> Result<(), String> {
    args.apply(&mut config)?;
    config.validate().map_err(|e| e.to_string())?;

    let caselist = config.caselist().to_path_buf();
    log_stage1_properties(&config.stage1);
    log_stage2_properties(&config.stage2, &caselist);

    let stage1 = run_stage1(&config.stage1, ImageDecoder)
        .map_err(|e| format!("Stage 1 failed: {}", e))?;
    println!("Manifest written to {}", caselist.display());
    println!("number of accepted paths: {}", stage1.accepted);

    let scorer = HistogramEntropyScorer::new(config.stage2.normalization.clone());
    let stage2 = run_stage2(&config.stage2, &caselist, ImageDecoder, scorer)
        .map_err(|e| format!("Stage 2 failed: {}", e))?;

    print_partition(&config.stage2, &stage2);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use odm_core::manifest::read_manifest;
    use std::fs::{self, File};
    use std::io::BufWriter;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    /// 16x16 8-bit grayscale PNG cycling through `levels` evenly spaced values.
    fn write_levels_png(path: &Path, levels: usize) {
        let step = 256 / levels;
        let bytes: Vec<u8> = (0..256).map(|i| ((i % levels) * step) as u8).collect();
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(BufWriter::new(file), 16, 16);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&bytes).unwrap();
    }

    fn run_config(root: &Path) -> OdmConfig {
        let mut config = OdmConfig::default();
        config.stage1.data_root = root.join("scans");
        config.stage1.final_file = root.join("out").join("final.txt");
        config.stage1.ext = ".png".to_string();
        config.stage1.max_workers = 2;
        config.stage1.batch_size = 3;
        config.stage2.good_output = root.join("out").join("good.txt");
        config.stage2.bad_output = root.join("out").join("bad.txt");
        config.stage2.batch_size = 2;
        config
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempdir().unwrap();
        let scans = dir.path().join("scans");
        fs::create_dir(&scans).unwrap();

        // 8 levels = 3 bits of entropy, the least informative accepted image
        for (name, levels) in [("a", 8), ("b", 16), ("c", 32), ("d", 64), ("e", 128)] {
            write_levels_png(&scans.join(format!("{}.png", name)), levels);
        }
        write_levels_png(&scans.join("flat.png"), 1);
        fs::write(scans.join("broken.png"), b"not a png").unwrap();

        let config = run_config(dir.path());
        let args = RunArgs {
            stage1: crate::args::Stage1Args {
                sort: true,
                ..Default::default()
            },
            partition: crate::args::PartitionArgs {
                contamination: Some(0.2),
                ..Default::default()
            },
            ..Default::default()
        };
        cmd_run(config.clone(), &args).unwrap();

        let expected: Vec<PathBuf> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| scans.join(format!("{}.png", n)))
            .collect();
        assert_eq!(read_manifest(&config.stage1.final_file).unwrap(), expected);
        assert_eq!(
            read_manifest(&config.stage2.bad_output).unwrap(),
            vec![expected[0].clone()]
        );
        assert_eq!(
            read_manifest(&config.stage2.good_output).unwrap(),
            expected[1..].to_vec()
        );
    }

    #[test]
    fn test_run_stage2_failure_keeps_manifest() {
        let dir = tempdir().unwrap();
        let scans = dir.path().join("scans");
        fs::create_dir(&scans).unwrap();
        write_levels_png(&scans.join("flat.png"), 1);

        // Nothing is accepted, so stage 2 finds an empty manifest
        let config = run_config(dir.path());
        let err = cmd_run(config.clone(), &RunArgs::default()).unwrap_err();
        assert!(err.starts_with("Stage 2 failed"));
        assert!(config.stage1.final_file.exists());
        assert!(!config.stage2.good_output.exists());
    }

    #[test]
    fn test_run_rejects_invalid_config_before_any_stage() {
        let dir = tempdir().unwrap();
        let mut config = run_config(dir.path());
        config.stage2.contamination = 1.5;
        assert!(cmd_run(config.clone(), &RunArgs::default()).is_err());
        assert!(!config.stage1.final_file.exists());
    }
}
