//! Error types for the measurement engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by the analysis entry points.
///
/// `NoResults` is deliberately separate from `Input`: an image that
/// segments and filters down to zero accepted regions is a reportable
/// outcome, not a malfunction.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Missing/unreadable image or malformed parameter set.
    #[error("invalid input: {message}")]
    Input { message: String },

    /// Segmentation plus filtering produced zero accepted regions.
    #[error("no results: {message}")]
    NoResults { message: String },

    /// Numeric degeneracy beyond what normalization can absorb.
    #[error("computation failed: {message}")]
    Computation { message: String },
}

impl AnalysisError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn no_results(message: impl Into<String>) -> Self {
        Self::NoResults {
            message: message.into(),
        }
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }
}
