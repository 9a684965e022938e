//! CLI error types and conversions

use crate::feed::{ErrorCategory, FeedError};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Feed download error
    #[error("feed error: {0}")]
    FeedError(#[from] FeedError),

    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serializing output failed
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Bad parameters or credentials exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FeedError(e) if e.category() == ErrorCategory::Configuration => 2,
            _ => 1,
        }
    }
}
