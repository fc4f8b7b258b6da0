//! Common error types for recplay

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Common result type for recplay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across recplay crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML document could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Terminal error code of a load attempt
///
/// Surfaced verbatim to the error presentation. Only two kinds exist:
/// the resource was unusable, or it could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadErrorKind {
    /// Malformed or unsupported resource, decode or build failure
    BadRequest,
    /// Transport failure, or no media candidate exists
    NotFound,
}

impl LoadErrorKind {
    /// Stable code string handed to the error presentation
    pub fn code(&self) -> &'static str {
        match self {
            LoadErrorKind::BadRequest => "BAD_REQUEST",
            LoadErrorKind::NotFound => "NOT_FOUND",
        }
    }

    /// HTTP-style status matching the code
    pub fn status(&self) -> u16 {
        match self {
            LoadErrorKind::BadRequest => 400,
            LoadErrorKind::NotFound => 404,
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
