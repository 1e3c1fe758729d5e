use std::path::PathBuf;

use thiserror::Error;

/// Failure modes that terminate one unit of work. Sibling units are
/// never affected; retry is the caller's concern.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("shape mismatch ({context}): got {got}, expected {want}")]
    ShapeMismatch {
        context: &'static str,
        got: String,
        want: String,
    },

    #[error("importance map for '{emotion}' missing at {}", path.display())]
    MissingMap { emotion: String, path: PathBuf },

    #[error("incomplete score grid: {got} of {want} volume-emotion pairs scored")]
    IncompleteScores { got: usize, want: usize },

    #[error("fetch of {what} failed: {reason}")]
    FetchFailure { what: String, reason: String },

    #[error("persist failed: {reason}")]
    PersistFailure { reason: String },
}

impl RunError {
    pub fn shape(context: &'static str, got: impl ToString, want: impl ToString) -> Self {
        Self::ShapeMismatch {
            context,
            got: got.to_string(),
            want: want.to_string(),
        }
    }

    /// Stable label for user-visible failure lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::MissingMap { .. } => "missing_map",
            Self::IncompleteScores { .. } => "incomplete_scores",
            Self::FetchFailure { .. } => "fetch_failure",
            Self::PersistFailure { .. } => "persist_failure",
        }
    }
}
