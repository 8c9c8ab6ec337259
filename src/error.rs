// src/error.rs
use thiserror::Error;

/// Conditions that end a run. Already-made posts are never rolled back.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed to fetch feed: {0}")]
    Feed(String),

    #[error("failed to fetch any listings ({views} views tried): {last}")]
    AllListingsFailed { views: usize, last: String },

    #[error("too many posting errors ({errors}): aborting")]
    ErrorBudgetExhausted { errors: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MirrorError::Feed(_) => "feed",
            MirrorError::AllListingsFailed { .. } => "listings",
            MirrorError::ErrorBudgetExhausted { .. } => "error_budget",
            MirrorError::Config(_) => "config",
        }
    }
}
