//! Record metadata builder

use super::{BuildError, Content, ContentBuilder};
use crate::classifier::Payload;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Normalized record metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    pub id: String,
    /// Display name; falls back to the id
    pub name: String,
    /// Recording start, epoch milliseconds
    pub start: i64,
    /// Recording end, epoch milliseconds
    pub end: i64,
    pub duration_ms: u64,
    pub participants: Option<u32>,
}

/// Builds [`RecordMetadata`] from the structured metadata document
///
/// Expected shape:
/// ```json
/// {"id": "...", "name": "...", "start_time": 0, "end_time": 0, "participants": 2}
/// ```
pub struct MetadataBuilder;

#[async_trait]
impl ContentBuilder for MetadataBuilder {
    fn name(&self) -> &'static str {
        "metadata"
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

        let doc = value
            .as_object()
            .ok_or_else(|| BuildError::Malformed("metadata is not an object".to_string()))?;

        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(BuildError::MissingField("id"))?
            .to_string();

        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());

        let start = doc
            .get("start_time")
            .and_then(Value::as_i64)
            .ok_or(BuildError::MissingField("start_time"))?;
        let end = doc
            .get("end_time")
            .and_then(Value::as_i64)
            .ok_or(BuildError::MissingField("end_time"))?;

        if end < start {
            return Err(BuildError::Malformed(format!(
                "end_time {} precedes start_time {}",
                end, start
            )));
        }
        let duration_ms = end
            .checked_sub(start)
            .and_then(|d| u64::try_from(d).ok())
            .ok_or_else(|| {
                BuildError::Malformed(format!(
                    "recording span {}..{} out of range",
                    start, end
                ))
            })?;

        let participants = doc
            .get("participants")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok());

        Ok(Some(Content::Metadata(RecordMetadata {
            id,
            name,
            start,
            end,
            duration_ms,
            participants,
        })))
    }
}
