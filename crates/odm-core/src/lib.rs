//! ODM Core Library
//!
//! Two-stage outlier screening for medical image corpora: histogram-based
//! usability screening (stage 1) and contamination-based partitioning of the
//! accepted images by an external scorer (stage 2).

pub mod config;
pub mod decoders;
pub mod error;
pub mod features;
pub mod manifest;
pub mod models;
pub mod normalize;
pub mod stage1;
pub mod stage2;
mod stats;

// Re-export commonly used types
pub use decoders::{Decoder, ImageDecoder};
pub use error::{OdmError, Result};
pub use features::{get_features, histogram, histogram_batch, FeatureInput, FeatureOutput};
pub use models::{
    Histogram, ImageRecord, NormalizationSpec, OutlierTail, Partition, PixelArray, ScoreRecord,
};
pub use normalize::normalize;
pub use stage1::{run_stage1, Stage1Report, Stage1Runner, Stage1State};
pub use stage2::{run_stage2, HistogramEntropyScorer, OutlierPartitioner, Scorer, Stage2Report};
