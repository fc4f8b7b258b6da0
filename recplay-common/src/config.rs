//! Loader configuration loading and resolution
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RECPLAY_CONFIG`)
//! 3. User config file (`~/.config/recplay/loader.toml`)
//! 4. Compiled defaults (fallback)
//!
//! The base URL has its own override chain: CLI, then `RECPLAY_BASE_URL`,
//! then whatever the resolved file (or the defaults) say.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RECPLAY_CONFIG";
/// Environment variable overriding the resource base URL
pub const BASE_URL_ENV_VAR: &str = "RECPLAY_BASE_URL";
/// Data set key reserved for the media probe batch
pub const MEDIA_KEY: &str = "media";

const DEFAULT_BASE_URL: &str = "http://localhost/presentation";
const DEFAULT_FEEDBACK_TIMEOUT_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A named remote resource that must resolve before a load can complete
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeclaredResource {
    /// Logical name, used as the data set key
    pub name: String,
    /// Path relative to the record's base URL
    pub path: String,
}

impl DeclaredResource {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Media container variant probed for existence
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MediaCandidate {
    pub tag: String,
}

impl MediaCandidate {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

/// Loading feedback settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Publish per-resource progress to observers
    pub enabled: bool,
    /// Minimum time the loading feedback stays up after data is complete
    pub timeout_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: DEFAULT_FEEDBACK_TIMEOUT_MS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Base URL; resources live under `{base_url}/{record_id}/`
    pub base_url: String,
    /// Transport timeout applied by the HTTP client
    pub request_timeout_secs: u64,
    pub feedback: FeedbackConfig,
    pub logging: LoggingConfig,
    /// Declared resources, in configuration order; each name selects the
    /// content builder applied to the resource
    pub resources: Vec<DeclaredResource>,
    /// Media candidates probed under `video/webcams.<tag>`
    pub medias: Vec<MediaCandidate>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            feedback: FeedbackConfig::default(),
            logging: LoggingConfig::default(),
            resources: vec![
                DeclaredResource::new("metadata", "metadata.json"),
                DeclaredResource::new("captions", "captions.json"),
                DeclaredResource::new("notes", "notes.html"),
                DeclaredResource::new("shapes", "shapes.svg"),
                DeclaredResource::new("cursor", "cursor.xml"),
                DeclaredResource::new("panzooms", "panzooms.xml"),
                DeclaredResource::new("chat", "slides_new.xml"),
            ],
            medias: vec![MediaCandidate::new("webm"), MediaCandidate::new("mp4")],
        }
    }
}

impl LoaderConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check structural constraints the loader relies on
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            if resource.name.trim().is_empty() {
                return Err(Error::Config("Resource name must not be empty".to_string()));
            }
            if resource.path.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Resource '{}' has an empty path",
                    resource.name
                )));
            }
            if resource.name == MEDIA_KEY {
                return Err(Error::Config(format!(
                    "Resource name '{}' is reserved for media probes",
                    MEDIA_KEY
                )));
            }
            if !names.insert(resource.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate resource name '{}'",
                    resource.name
                )));
            }
        }

        if self.medias.is_empty() {
            return Err(Error::Config(
                "At least one media candidate is required".to_string(),
            ));
        }
        if self.medias.iter().any(|m| m.tag.trim().is_empty()) {
            return Err(Error::Config("Media tags must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn feedback_duration(&self) -> Duration {
        Duration::from_millis(self.feedback.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Resolves the effective [`LoaderConfig`] from CLI, environment and files
#[derive(Debug, Default, Clone)]
pub struct ConfigResolver {
    cli_config: Option<PathBuf>,
    cli_base_url: Option<String>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config file given on the command line
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.cli_config = path;
        self
    }

    /// Base URL given on the command line
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.cli_base_url = base_url;
        self
    }

    /// Resolve the configuration
    ///
    /// An explicitly named file (CLI or environment) must exist. The
    /// per-user file is optional: when absent, compiled defaults are used.
    pub fn resolve(&self) -> Result<LoaderConfig> {
        let mut config = match self.config_file() {
            ConfigSource::Explicit(path) => {
                info!("Loading config from {}", path.display());
                LoaderConfig::load(&path)?
            }
            ConfigSource::User(path) => {
                info!("Loading user config from {}", path.display());
                LoaderConfig::load(&path)?
            }
            ConfigSource::Defaults => {
                warn!("No config file found, using compiled defaults");
                LoaderConfig::default()
            }
        };

        // Base URL priority 1: command line
        if let Some(base_url) = &self.cli_base_url {
            config.base_url = base_url.clone();
        } else if let Ok(base_url) = std::env::var(BASE_URL_ENV_VAR) {
            // Base URL priority 2: environment
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn config_file(&self) -> ConfigSource {
        if let Some(path) = &self.cli_config {
            return ConfigSource::Explicit(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return ConfigSource::Explicit(PathBuf::from(path));
            }
        }

        match user_config_file() {
            Some(path) if path.exists() => ConfigSource::User(path),
            _ => ConfigSource::Defaults,
        }
    }
}

enum ConfigSource {
    Explicit(PathBuf),
    User(PathBuf),
    Defaults,
}

/// Per-user config file location for the platform
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("recplay").join("loader.toml"))
}
