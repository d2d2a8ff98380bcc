//! Unified error type for the odm pipeline.
//!
//! Stage 1 absorbs per-file `Decode` failures as rejections; every other
//! variant propagates to the stage boundary.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdmError {
    /// The requested normalization strategy is not registered.
    #[error("Unknown normalization strategy: {0}")]
    UnknownStrategy(String),

    /// The requested feature type has no registered extractor.
    #[error("Feature type not supported: {0}")]
    UnsupportedFeatureType(String),

    /// A file could not be decoded into a pixel array.
    #[error("Failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// The scorer failed or returned unusable scores for a batch.
    #[error("Scorer failed on batch {batch}: {message}")]
    Scorer { batch: usize, message: String },

    /// A manifest or output list could not be read or written.
    #[error("Manifest error for {}: {message}", path.display())]
    ManifestIo { path: PathBuf, message: String },

    /// Invalid CLI or config-file value.
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// A strategy parameter or pixel array failed validation.
    #[error("Invalid parameter for {context}: {message}")]
    InvalidParameter { context: String, message: String },

    /// The stage 1 worker pool could not be created.
    #[error("Failed to set up worker pool: {0}")]
    PoolSetup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OdmError {
    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        OdmError::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        OdmError::ManifestIo {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        OdmError::InvalidParameter {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OdmError>;
