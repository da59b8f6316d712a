use thiserror::Error;

use crate::emotion::domain::category_mapper::MappingError;

/// Errors that reach callers of the analyzer.
///
/// Backend failures never appear here: they are absorbed by the cascade.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed input frame (zero dimension, wrong channel count, short buffer).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    /// Rejected category mapping table.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] MappingError),
    /// Rejected call argument, e.g. a zero sampling interval.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The image or video file could not be opened or decoded at all.
    #[error("cannot read source: {0}")]
    Source(String),
}
