//! Content builders
//!
//! A builder turns a decoded payload into the value the playback component
//! consumes. Builders are looked up by the declared resource's logical name
//! in a [`BuilderRegistry`]; unknown names fall back to [`IdentityBuilder`].
//!
//! # Builders
//! - `metadata` - record metadata document → [`RecordMetadata`]
//! - `captions` - caption track list → [`CaptionTrack`]s
//! - `notes` - shared notes markup → body fragment

mod captions;
mod metadata;
mod notes;

pub use captions::{CaptionTrack, CaptionsBuilder};
pub use metadata::{MetadataBuilder, RecordMetadata};
pub use notes::NotesBuilder;

use crate::classifier::Payload;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Built value stored in the loaded data set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    /// Structured document passed through as-is
    Document(serde_json::Value),
    /// Text passed through as-is
    Text(String),
    Metadata(RecordMetadata),
    Captions(Vec<CaptionTrack>),
    /// Inner body of the shared notes
    Notes(String),
    /// Media candidate tags that exist for the record
    Media(Vec<String>),
}

/// Builder failure
///
/// Always fatal for the attempt (BAD_REQUEST). A builder that simply has
/// nothing to produce returns `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unexpected payload, expected {expected}")]
    UnexpectedPayload { expected: &'static str },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Converts a decoded payload into content
#[async_trait]
pub trait ContentBuilder: Send + Sync {
    /// Resource name this builder handles
    fn name(&self) -> &'static str;

    /// Build content from a decoded payload
    ///
    /// # Returns
    /// `Ok(None)` when there is nothing to build but the absence is not an error
    async fn build(&self, source_path: &str, payload: Payload)
        -> Result<Option<Content>, BuildError>;
}

/// Fallback builder: wraps the payload unchanged
pub struct IdentityBuilder;

#[async_trait]
impl ContentBuilder for IdentityBuilder {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn build(
        &self,
        _source_path: &str,
        payload: Payload,
    ) -> Result<Option<Content>, BuildError> {
        Ok(Some(match payload {
            Payload::Structured(value) => Content::Document(value),
            Payload::Text(text) => Content::Text(text),
        }))
    }
}

/// Name → builder map with an identity fallback
pub struct BuilderRegistry {
    builders: HashMap<String, Arc<dyn ContentBuilder>>,
    fallback: Arc<dyn ContentBuilder>,
}

impl BuilderRegistry {
    /// Registry with only the identity fallback
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
            fallback: Arc::new(IdentityBuilder),
        }
    }

    /// Registry with every built-in builder
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(MetadataBuilder));
        registry.register(Arc::new(CaptionsBuilder));
        registry.register(Arc::new(NotesBuilder));
        registry
    }

    /// Register a builder under its own name, replacing any previous one
    pub fn register(&mut self, builder: Arc<dyn ContentBuilder>) {
        self.builders.insert(builder.name().to_string(), builder);
    }

    /// Builder registered for a resource's logical name
    pub fn builder_for(&self, name: &str) -> &Arc<dyn ContentBuilder> {
        self.builders.get(name).unwrap_or(&self.fallback)
    }

    /// Build content for a declared resource with the builder of its name
    pub async fn build(
        &self,
        name: &str,
        source_path: &str,
        payload: Payload,
    ) -> Result<Option<Content>, BuildError> {
        let builder = self.builder_for(name);
        tracing::trace!(resource = %name, path = %source_path, builder = builder.name(), "Building resource");
        builder.build(source_path, payload).await
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
