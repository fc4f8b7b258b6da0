//! Routing context
//!
//! Turns a playback URL (`.../<record_id>?layout=<layout>&t=<time>`) or a
//! bare record id into a [`LoadRequest`].

use recplay_common::human_time::parse_start_time;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Routing errors
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Invalid playback URL: {0}")]
    InvalidUrl(String),
}

/// Validated record identifier
///
/// Non-empty; ASCII alphanumerics, `-` and `_` only, so it is safe to
/// place in a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Validate a raw identifier, `None` when invalid
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback layout requested by the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Content and media side by side
    #[default]
    Standard,
    /// Content only
    Content,
    /// Media only
    Media,
    /// Chrome-less player
    Disabled,
}

impl Layout {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Layout::Standard),
            "content" => Some(Layout::Content),
            "media" => Some(Layout::Media),
            "disabled" => Some(Layout::Disabled),
            _ => None,
        }
    }
}

/// Input of one load attempt
///
/// Fixed for the attempt's lifetime. An absent `record_id` makes the
/// attempt fail with BAD_REQUEST before any request is issued.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadRequest {
    pub record_id: Option<RecordId>,
    pub layout: Layout,
    /// Playback start offset in seconds
    pub start_time: Option<f64>,
}

impl LoadRequest {
    /// Request for a raw record id; invalid ids become absent
    pub fn new(record_id: Option<&str>) -> Self {
        Self {
            record_id: record_id.and_then(RecordId::parse),
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_start_time(mut self, start_time: Option<f64>) -> Self {
        self.start_time = start_time;
        self
    }
}

/// Playback URL parsing
pub struct RouteContext;

impl RouteContext {
    /// Parse a playback URL
    ///
    /// The record id is the last non-empty path segment. Unknown layouts
    /// and unparsable start times are ignored with a warning.
    pub fn parse(url: &str) -> Result<LoadRequest, RouteError> {
        let url = Url::parse(url).map_err(|e| RouteError::InvalidUrl(e.to_string()))?;

        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string);

        let mut request = LoadRequest::new(segment.as_deref());

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "layout" => match Layout::parse(&value) {
                    Some(layout) => request.layout = layout,
                    None => warn!(layout = %value, "Unknown layout, using default"),
                },
                "t" => match parse_start_time(&value) {
                    Ok(seconds) => request.start_time = Some(seconds),
                    Err(e) => warn!("Ignoring start time: {}", e),
                },
                _ => {}
            }
        }

        Ok(request)
    }
}
