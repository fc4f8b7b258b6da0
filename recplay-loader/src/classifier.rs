//! Resource classification and decoding
//!
//! The suffix of a source path picks how its body is decoded. Structured
//! documents are parsed into a JSON value; every text-family strategy hands
//! the raw text on unchanged.

/// How a fetched body is decoded before building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// `.json`: parsed key-value document
    StructuredData,
    /// `.html`
    Markup,
    /// `.svg`
    VectorGraphic,
    /// `.xml`
    Text,
}

/// Decoded body handed to a builder
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(serde_json::Value),
    Text(String),
}

/// Classify a source path by its suffix
///
/// Returns `None` for unsupported paths; the caller decides what that means.
pub fn classify(source_path: &str) -> Option<DecodeStrategy> {
    let file = file_name(source_path);
    let (_, extension) = file.rsplit_once('.')?;

    match extension.to_ascii_lowercase().as_str() {
        "json" => Some(DecodeStrategy::StructuredData),
        "html" => Some(DecodeStrategy::Markup),
        "svg" => Some(DecodeStrategy::VectorGraphic),
        "xml" => Some(DecodeStrategy::Text),
        _ => None,
    }
}

/// Decode a body according to its strategy
pub fn decode(strategy: DecodeStrategy, body: String) -> Result<Payload, serde_json::Error> {
    match strategy {
        DecodeStrategy::StructuredData => serde_json::from_str(&body).map(Payload::Structured),
        DecodeStrategy::Markup | DecodeStrategy::VectorGraphic | DecodeStrategy::Text => {
            Ok(Payload::Text(body))
        }
    }
}

/// Last path segment
pub fn file_name(source_path: &str) -> &str {
    source_path.rsplit('/').next().unwrap_or(source_path)
}
