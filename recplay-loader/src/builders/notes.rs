//! Shared notes builder

use super::{BuildError, Content, ContentBuilder};
use crate::classifier::Payload;
use async_trait::async_trait;

/// Extracts the `<body>` fragment of the exported notes document
///
/// Documents without a body element are used whole. Blank notes build to `None`.
pub struct NotesBuilder;

#[async_trait]
impl ContentBuilder for NotesBuilder {
    fn name(&self) -> &'static str {
        "notes"
    }

    async fn build(
        &self,
        _source_path: &str,
        payload: Payload,
    ) -> Result<Option<Content>, BuildError> {
        let Payload::Text(markup) = payload else {
            return Err(BuildError::UnexpectedPayload { expected: "markup" });
        };

        let fragment = body_fragment(&markup).trim();
        if fragment.is_empty() {
            return Ok(None);
        }

        Ok(Some(Content::Notes(fragment.to_string())))
    }
}

/// Inner content of the first `<body ...>` element, or the whole input
fn body_fragment(markup: &str) -> &str {
    // ASCII lowercasing keeps byte offsets aligned with the original
    let lower = markup.to_ascii_lowercase();

    let Some(open) = lower.find("<body") else {
        return markup;
    };
    let Some(open_end) = lower[open..].find('>').map(|i| open + i + 1) else {
        return markup;
    };
    let close = lower[open_end..]
        .find("</body")
        .map(|i| open_end + i)
        .unwrap_or(markup.len());

    &markup[open_end..close]
}
