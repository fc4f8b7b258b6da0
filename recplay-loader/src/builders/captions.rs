//! Caption track list builder

use super::{BuildError, Content, ContentBuilder};
use crate::classifier::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One caption track available for the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub locale: String,
    #[serde(rename(deserialize = "localeName"))]
    pub name: String,
}

/// Builds the caption track list
///
/// A record without captions publishes an empty list; that builds to `None`.
pub struct CaptionsBuilder;

#[async_trait]
impl ContentBuilder for CaptionsBuilder {
    fn name(&self) -> &'static str {
        "captions"
    }

    async fn build(
        &self,
        _source_path: &str,
        payload: Payload,
    ) -> Result<Option<Content>, BuildError> {
        let Payload::Structured(value) = payload else {
            return Err(BuildError::UnexpectedPayload {
                expected: "structured document",
            });
        };

        let tracks: Vec<CaptionTrack> =
            serde_json::from_value(value).map_err(|e| BuildError::Malformed(e.to_string()))?;

        if tracks.is_empty() {
            return Ok(None);
        }

        Ok(Some(Content::Captions(tracks)))
    }
}
