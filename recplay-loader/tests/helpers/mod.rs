//! Test Helper Utilities
//!
//! Shared utilities for testing recplay-loader

#![allow(dead_code)]

pub mod mock_server;
pub mod scripted_fetcher;

// Re-export commonly used items
pub use mock_server::MockRecordServer;
pub use scripted_fetcher::{Reply, ScriptedFetcher};

use recplay_common::{DeclaredResource, LoaderConfig, MediaCandidate};

/// Base URL used by scripted tests
pub const BASE_URL: &str = "http://recordings.test/presentation";
/// Record id used by scripted tests
pub const RECORD_ID: &str = "rec-1";

/// Config with the given resources, media candidates and feedback delay
pub fn test_config(resources: &[(&str, &str)], medias: &[&str], feedback_ms: u64) -> LoaderConfig {
    let mut config = LoaderConfig::default();
    config.base_url = BASE_URL.to_string();
    config.resources = resources
        .iter()
        .map(|(name, path)| DeclaredResource::new(*name, *path))
        .collect();
    config.medias = medias.iter().map(|tag| MediaCandidate::new(*tag)).collect();
    config.feedback.timeout_ms = feedback_ms;
    config
}

/// Full URL of a record resource in scripted tests
pub fn url(path: &str) -> String {
    format!("{}/{}/{}", BASE_URL, RECORD_ID, path)
}

/// Sample metadata document
pub fn metadata_json() -> String {
    r#"{"id": "rec-1", "name": "Weekly sync", "start_time": 1000, "end_time": 61000, "participants": 3}"#
        .to_string()
}

/// Sample shared notes document
pub fn notes_html() -> String {
    "<html><head><title>notes</title></head><body><p>Agenda</p></body></html>".to_string()
}
