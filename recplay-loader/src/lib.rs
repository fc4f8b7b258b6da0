//! recplay-loader library interface
//!
//! Loads every resource a recorded session needs before playback can start:
//! declared documents (structured data, markup, vector graphics, text) and
//! media presence probes, fetched concurrently for one record id.
//!
//! # Flow
//! route → [`LoadRequest`] → [`LoadAttempt::start`] → fetch / classify /
//! build per resource + media batch → completion gate → feedback delay →
//! [`LoadState::Ready`] with a [`PlaybackHandoff`].

pub mod builders;
pub mod classifier;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod orchestrator;
pub mod route;

pub use crate::builders::{BuilderRegistry, Content, ContentBuilder};
pub use crate::error::ResourceError;
pub use crate::fetcher::{HttpFetcher, ResourceFetcher};
pub use crate::orchestrator::{LoadAttempt, LoadState, LoadedDataSet, PlaybackHandoff};
pub use crate::route::{Layout, LoadRequest, RecordId, RouteContext};
pub use recplay_common::LoadErrorKind;
