//! # recplay Common Library
//!
//! Shared code for the recplay loader and its consumers:
//! - Loader configuration (TOML + environment resolution)
//! - Event types (LoaderEvent enum) and the EventBus
//! - Error types, including the user-facing load error codes
//! - Start-time parsing and formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use config::{DeclaredResource, LoaderConfig, MediaCandidate};
pub use error::{Error, LoadErrorKind, Result};
pub use events::{EventBus, LoaderEvent};
