//! Error types for recplay-loader
//!
//! Every per-resource failure is a [`ResourceError`]. The orchestrator
//! reduces it to a [`LoadErrorKind`] via [`ResourceError::kind`]; only the
//! first one raised in an attempt is kept.

use crate::builders::BuildError;
use crate::fetcher::FetchError;
use recplay_common::LoadErrorKind;
use thiserror::Error;

/// Failure while resolving a declared resource or the media batch
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Source path suffix has no decode strategy
    #[error("Unsupported resource type: {0}")]
    Unsupported(String),

    /// Body could not be decoded for its strategy
    #[error("Decode error in {path}: {message}")]
    Decode { path: String, message: String },

    /// Builder rejected the decoded value
    #[error("Build error in {path}: {source}")]
    Build {
        path: String,
        #[source]
        source: BuildError,
    },

    /// Request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] FetchError),

    /// No media candidate probe succeeded
    #[error("No media found for record {0}")]
    NoMedia(String),
}

impl ResourceError {
    /// Classify into the user-facing taxonomy
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            ResourceError::Unsupported(_)
            | ResourceError::Decode { .. }
            | ResourceError::Build { .. } => LoadErrorKind::BadRequest,
            ResourceError::Transport(_) | ResourceError::NoMedia(_) => LoadErrorKind::NotFound,
        }
    }
}
