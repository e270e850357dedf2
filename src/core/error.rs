//! Fatal normalization errors.
//!
//! Only these abort a normalization. Everything else degrades and is reported
//! as a [`Diagnostic`](crate::domain::Diagnostic).

use thiserror::Error;

/// Submission rejected before anything was produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one tag is required")]
    EmptyTagSet,
}

/// The existing record could not be read, so there is nothing safe to merge against
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot load existing content {id}: {reason}")]
pub struct StaleReadError {
    pub id: String,
    pub reason: String,
}

impl StaleReadError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by the normalizer entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    StaleRead(#[from] StaleReadError),
}
