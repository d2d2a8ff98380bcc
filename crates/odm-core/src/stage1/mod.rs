//! Stage 1: histogram screening.
//!
//! Scans a data root for files with the configured extension, decodes and
//! bins them in fixed-size batches on a bounded rayon pool, and keeps the
//! paths whose histogram passes the acceptance predicate. A run moves through
//! [`Stage1State`] `Scanning -> Dispatching -> Aggregating -> Done`.
//!
//! A file that fails to decode or extract is logged and counted as rejected;
//! it never aborts its batch. Failing to build the pool aborts the stage.

mod acceptance;


pub use acceptance::{AcceptancePredicate, HistogramRule};

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::config::Stage1Config;
use crate::decoders::Decoder;
use crate::error::{OdmError, Result};
use crate::features::histogram;
use crate::manifest::write_manifest;
use crate::models::{Histogram, ImageRecord};
use crate::normalize::default_registry;

/// Lifecycle of a stage 1 run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage1State {
    Scanning,
    Dispatching,
    Aggregating,
    Done,
}

impl fmt::Display for Stage1State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage1State::Scanning => "scanning",
            Stage1State::Dispatching => "dispatching",
            Stage1State::Aggregating => "aggregating",
            Stage1State::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a stage 1 run.
#[derive(Debug, Clone)]
pub struct Stage1Report {
    /// Accepted paths in scan order
    pub manifest: Vec<PathBuf>,
    /// One record per scanned file, in scan order
    pub records: Vec<ImageRecord>,
    pub accepted: usize,
    /// Rejected files, failures included
    pub rejected: usize,
    /// Files that could not be decoded or binned
    pub failed: usize,
    pub state: Stage1State,
    pub elapsed: Duration,
}

/// Normalize an extension filter: no leading dot, lowercase.
fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Whether `path` carries the (already normalized) extension.
/// An empty filter matches every file.
fn matches_ext(path: &Path, ext: &str) -> bool {
    if ext.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.to_lowercase() == ext)
}

/// List files under `root` (recursively) whose extension matches `ext`.
///
/// Order is whatever the filesystem enumerates, directory by directory,
/// unless `sort` is set. That order is carried through to the manifest.
pub fn scan_directory(root: &Path, ext: &str, sort: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(OdmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("data root is not a directory: {}", root.display()),
        )));
    }

    let ext = normalize_ext(ext);
    let mut files = Vec::new();
    collect_files(root, &ext, &mut files)?;

    if sort {
        files.sort();
    }
    Ok(files)
}

/// Symlinked directories are not descended into, so every file is listed
/// once. Symlinked files are kept when they resolve to a regular file.
fn collect_files(dir: &Path, ext: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(&path, ext, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            log::debug!("Not following directory link {}", path.display());
        } else if path.is_file() && matches_ext(&path, ext) {
            files.push(path);
        }
    }
    Ok(())
}

/// Stage 1 batch loader and worker pool.
pub struct Stage1Runner<'a, D: Decoder> {
    config: &'a Stage1Config,
    decoder: D,
    predicate: Box<dyn AcceptancePredicate + 'a>,
    state: Stage1State,
}

impl<'a, D: Decoder> Stage1Runner<'a, D> {
    /// Runner using the configured [`HistogramRule`].
    pub fn new(config: &'a Stage1Config, decoder: D) -> Self {
        let rule = HistogramRule::from(&config.acceptance);
        Self::with_predicate(config, decoder, Box::new(rule))
    }

    /// Runner with a custom acceptance predicate.
    pub fn with_predicate(
        config: &'a Stage1Config,
        decoder: D,
        predicate: Box<dyn AcceptancePredicate + 'a>,
    ) -> Self {
        Self {
            config,
            decoder,
            predicate,
            state: Stage1State::Scanning,
        }
    }

    pub fn state(&self) -> Stage1State {
        self.state
    }

    fn transition(&mut self, next: Stage1State) {
        log::debug!("Stage 1: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Scan the configured data root and process everything found.
    pub fn run(&mut self) -> Result<Stage1Report> {
        let start = Instant::now();
        self.state = Stage1State::Scanning;
        let files = scan_directory(&self.config.data_root, &self.config.ext, self.config.sort_files)?;
        log::info!(
            "Found {} files matching '{}' under {}",
            files.len(),
            self.config.ext,
            self.config.data_root.display()
        );
        self.process(files, start)
    }

    /// Process an explicit file list, keeping its order.
    pub fn run_files(&mut self, files: Vec<PathBuf>) -> Result<Stage1Report> {
        let start = Instant::now();
        self.state = Stage1State::Scanning;
        self.process(files, start)
    }

    fn process(&mut self, files: Vec<PathBuf>, start: Instant) -> Result<Stage1Report> {
        // Unknown strategy or bad parameters are fatal, never a per-file rejection
        if let Some(spec) = &self.config.normalization {
            default_registry().get(&spec.name)?.output_range(spec)?;
        }

        self.transition(Stage1State::Dispatching);
        let pool = build_pool(self.config.max_workers)?;

        let batch_size = self.config.batch_size.max(1);
        let total_batches = files.len().div_ceil(batch_size);
        let mut batches_out: Vec<Vec<ImageRecord>> = Vec::with_capacity(total_batches);

        for (batch_idx, batch) in files.chunks(batch_size).enumerate() {
            let batch_start = Instant::now();

            // Indexed collect: results land in input order whatever order
            // the workers finish in.
            let records: Vec<ImageRecord> =
                pool.install(|| batch.par_iter().map(|path| self.process_file(path)).collect());

            let accepted = records.iter().filter(|r| r.accepted).count();
            log::info!(
                "[batch {}/{}] accepted {}/{}",
                batch_idx + 1,
                total_batches,
                accepted,
                records.len()
            );
            if self.config.timing {
                log::info!(
                    "Batch {} time: {:.3}s",
                    batch_idx + 1,
                    batch_start.elapsed().as_secs_f64()
                );
            }
            batches_out.push(records);
        }

        self.transition(Stage1State::Aggregating);
        let records: Vec<ImageRecord> = batches_out.into_iter().flatten().collect();
        let manifest: Vec<PathBuf> = records
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.path.clone())
            .collect();
        let failed = records.iter().filter(|r| r.error.is_some()).count();
        let accepted = manifest.len();
        let rejected = records.len() - accepted;

        self.transition(Stage1State::Done);
        let elapsed = start.elapsed();
        if self.config.timing {
            log::info!("Stage 1 time: {:.3}s", elapsed.as_secs_f64());
        }

        Ok(Stage1Report {
            manifest,
            records,
            accepted,
            rejected,
            failed,
            state: self.state,
            elapsed,
        })
    }

    /// Decode, bin and judge one file. Never fails: problems become a
    /// rejected record carrying the error message.
    fn process_file(&self, path: &Path) -> ImageRecord {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.extract(path)))
            .unwrap_or_else(|_| Err(OdmError::decode(path, "decoder panicked")));

        match outcome {
            Ok(hist) => {
                let accepted = self.predicate.accept(&hist);
                if !accepted {
                    log::debug!("Rejected {} ({})", path.display(), self.predicate.describe());
                }
                ImageRecord {
                    path: path.to_path_buf(),
                    accepted,
                    histogram: self.config.keep_histograms.then_some(hist),
                    error: None,
                }
            }
            Err(err) => {
                log::warn!("Skipping {}: {}", path.display(), err);
                ImageRecord {
                    path: path.to_path_buf(),
                    accepted: false,
                    histogram: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn extract(&self, path: &Path) -> Result<Histogram> {
        let pixels = self.decoder.decode(path)?;
        histogram(&pixels, self.config.normalization.as_ref())
    }
}

fn build_pool(max_workers: usize) -> Result<rayon::ThreadPool> {
    if max_workers == 0 {
        return Err(OdmError::PoolSetup(
            "max_workers must be at least 1".to_string(),
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .thread_name(|i| format!("odm-stage1-{}", i))
        .build()
        .map_err(|e| OdmError::PoolSetup(e.to_string()))
}

/// Run stage 1 end to end and write the manifest to `final_file`.
pub fn run_stage1<D: Decoder>(config: &Stage1Config, decoder: D) -> Result<Stage1Report> {
    config.validate()?;
    let mut runner = Stage1Runner::new(config, decoder);
    let report = runner.run()?;

    write_manifest(&config.final_file, &report.manifest)?;
    log::info!(
        "Stage 1 complete: {} accepted, {} rejected ({} failed); manifest written to {}",
        report.accepted,
        report.rejected,
        report.failed,
        config.final_file.display()
    );
    Ok(report)
}
