//! Stage 2: contamination-based outlier partitioning.
//!
//! Every manifest entry is decoded and scored in batches of `batch_size`, one
//! blocking [`Scorer`] call per batch. Once all scores are in, a single
//! global threshold is taken at the contamination quantile and the manifest
//! is split into good and bad lists, both in manifest order.
//!
//! Tail convention:
//! - [`OutlierTail::High`] (default): bad iff `score > quantile(1 - c)`.
//! - [`OutlierTail::Low`]: bad iff `score < quantile(c)`.
//!
//! Quantiles interpolate linearly between order statistics. Ties at the
//! threshold land on the good side, so the bad share is at most roughly `c`.
//!
//! Unlike stage 1, any decode or scorer failure aborts the stage: a partial
//! score set would shift the quantile.

mod scorers;


pub use scorers::HistogramEntropyScorer;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{is_verbose, Stage2Config};
use crate::decoders::Decoder;
use crate::error::{OdmError, Result};
use crate::manifest::{load_caselist, write_manifest};
use crate::models::{OutlierTail, Partition, PixelArray, ScoreRecord};
use crate::stats::{quantile_sorted, sorted_finite};

/// Produces one outlier score per image, in input order.
pub trait Scorer: Send + Sync {
    fn score(&self, batch: &[PixelArray]) -> Result<Vec<f64>>;
}

impl<S: Scorer + ?Sized> Scorer for &S {
    fn score(&self, batch: &[PixelArray]) -> Result<Vec<f64>> {
        (**self).score(batch)
    }
}

/// Outcome of a stage 2 run.
#[derive(Debug, Clone)]
pub struct Stage2Report {
    pub partition: Partition,
    /// One score per manifest entry, in manifest order
    pub scores: Vec<ScoreRecord>,
    /// Global threshold; `None` for an empty manifest
    pub threshold: Option<f64>,
    pub tail: OutlierTail,
    pub elapsed: Duration,
}

/// Threshold separating good from bad scores for `contamination` and `tail`.
///
/// Returns `None` when there are no finite scores.
pub fn compute_threshold(scores: &[f64], contamination: f64, tail: OutlierTail) -> Option<f64> {
    let sorted = sorted_finite(scores.iter().copied());
    if sorted.is_empty() {
        return None;
    }
    let q = match tail {
        OutlierTail::High => 1.0 - contamination,
        OutlierTail::Low => contamination,
    };
    Some(quantile_sorted(&sorted, q))
}

/// Whether `score` falls in the bad tail.
pub fn is_outlier(score: f64, threshold: f64, tail: OutlierTail) -> bool {
    match tail {
        OutlierTail::High => score > threshold,
        OutlierTail::Low => score < threshold,
    }
}

/// Splits a manifest into good and bad paths using an external scorer.
pub struct OutlierPartitioner<D: Decoder, S: Scorer> {
    decoder: D,
    scorer: S,
    tail: OutlierTail,
    timing: bool,
    verbose: bool,
}

impl<D: Decoder, S: Scorer> OutlierPartitioner<D, S> {
    pub fn new(decoder: D, scorer: S) -> Self {
        Self {
            decoder,
            scorer,
            tail: OutlierTail::default(),
            timing: false,
            verbose: false,
        }
    }

    /// Partitioner carrying the tail, timing and verbose settings of `config`.
    pub fn from_config(config: &Stage2Config, decoder: D, scorer: S) -> Self {
        Self::new(decoder, scorer)
            .with_tail(config.tail)
            .with_timing(config.timing)
            .with_verbose(config.verbose)
    }

    pub fn with_tail(mut self, tail: OutlierTail) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tail(&self) -> OutlierTail {
        self.tail
    }

    /// Split `manifest` so roughly `contamination` of it lands in `bad`.
    ///
    /// An empty manifest gives an empty partition.
    pub fn partition(
        &self,
        manifest: &[PathBuf],
        contamination: f64,
        batch_size: usize,
    ) -> Result<Partition> {
        Ok(self.evaluate(manifest, contamination, batch_size)?.partition)
    }

    /// Score, threshold and split `manifest`, keeping the scores.
    pub fn evaluate(
        &self,
        manifest: &[PathBuf],
        contamination: f64,
        batch_size: usize,
    ) -> Result<Stage2Report> {
        let start = Instant::now();
        if !(contamination > 0.0 && contamination < 1.0) {
            return Err(OdmError::invalid(
                "contamination",
                format!("must be in (0, 1), got {}", contamination),
            ));
        }
        if batch_size == 0 {
            return Err(OdmError::invalid("batch_size", "must be positive"));
        }

        let scores = self.score_manifest(manifest, batch_size)?;
        let values: Vec<f64> = scores.iter().map(|r| r.score).collect();
        let threshold = compute_threshold(&values, contamination, self.tail);

        let mut partition = Partition::default();
        if let Some(threshold) = threshold {
            for record in &scores {
                if is_outlier(record.score, threshold, self.tail) {
                    partition.bad.push(record.path.clone());
                } else {
                    partition.good.push(record.path.clone());
                }
            }
            log::info!(
                "Threshold {:.6} ({} tail, contamination {}): {} good, {} bad",
                threshold,
                self.tail,
                contamination,
                partition.good.len(),
                partition.bad.len()
            );
        }

        let elapsed = start.elapsed();
        if self.timing {
            log::info!("Stage 2 time: {:.3}s", elapsed.as_secs_f64());
        }

        Ok(Stage2Report {
            partition,
            scores,
            threshold,
            tail: self.tail,
            elapsed,
        })
    }

    /// Decode and score every entry, one scorer call per batch.
    pub fn score_manifest(&self, manifest: &[PathBuf], batch_size: usize) -> Result<Vec<ScoreRecord>> {
        let batch_size = batch_size.max(1);
        let total_batches = manifest.len().div_ceil(batch_size);
        let verbose = self.verbose || is_verbose();
        let mut records = Vec::with_capacity(manifest.len());

        for (batch_idx, paths) in manifest.chunks(batch_size).enumerate() {
            let batch_start = Instant::now();

            let pixels = paths
                .iter()
                .map(|path| self.decoder.decode(path))
                .collect::<Result<Vec<_>>>()?;

            let scores = self.scorer.score(&pixels).map_err(|err| match err {
                OdmError::Scorer { .. } => err,
                other => OdmError::Scorer {
                    batch: batch_idx,
                    message: other.to_string(),
                },
            })?;
            check_scores(batch_idx, paths.len(), &scores)?;

            records.extend(
                paths
                    .iter()
                    .zip(scores)
                    .map(|(path, score)| ScoreRecord {
                        path: path.clone(),
                        score,
                    }),
            );

            if verbose {
                log::info!(
                    "[batch {}/{}] scored {} images ({} total)",
                    batch_idx + 1,
                    total_batches,
                    paths.len(),
                    records.len()
                );
            }
            if self.timing {
                log::info!(
                    "Batch {} time: {:.3}s",
                    batch_idx + 1,
                    batch_start.elapsed().as_secs_f64()
                );
            }
        }

        Ok(records)
    }
}

/// Scores must be one finite value per input.
fn check_scores(batch: usize, expected: usize, scores: &[f64]) -> Result<()> {
    if scores.len() != expected {
        return Err(OdmError::Scorer {
            batch,
            message: format!("expected {} scores, got {}", expected, scores.len()),
        });
    }
    if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
        return Err(OdmError::Scorer {
            batch,
            message: format!("non-finite score {} at position {}", scores[pos], pos),
        });
    }
    Ok(())
}

/// Run stage 2 end to end: read `caselist`, partition it, write the good and
/// bad lists.
pub fn run_stage2<D: Decoder, S: Scorer>(
    config: &Stage2Config,
    caselist: &Path,
    decoder: D,
    scorer: S,
) -> Result<Stage2Report> {
    config.validate()?;
    let manifest = load_caselist(caselist)?;
    log::info!("Loaded {} paths from {}", manifest.len(), caselist.display());

    let partitioner = OutlierPartitioner::from_config(config, decoder, scorer);
    let report = partitioner.evaluate(&manifest, config.contamination, config.batch_size)?;

    write_manifest(&config.good_output, &report.partition.good)?;
    write_manifest(&config.bad_output, &report.partition.bad)?;
    log::info!(
        "Stage 2 complete: {} good -> {}, {} bad -> {}",
        report.partition.good.len(),
        config.good_output.display(),
        report.partition.bad.len(),
        config.bad_output.display()
    );
    Ok(report)
}
