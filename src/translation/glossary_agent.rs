/*!
 * Glossary extraction pre-pass.
 *
 * Before chunk translation, the agent can ask the model for a table of
 * proper-noun alignments over the document's translatable text. The text
 * rides through the same chunking path as translation; each chunk's answer
 * is a JSON list of {src, dst} pairs. Failure here is never fatal — a
 * document translates fine without a glossary, so errors are logged and an
 * empty table is returned.
 */

use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde_json::Value;

use crate::chunker::chunk_fragments;
use crate::document::Fragment;
use crate::errors::TranslationError;
use crate::glossary::{Glossary, TermPair};
use crate::providers::ChatRequest;

use super::core::{TranslationService, encode_chunk};
use super::prompts;

/// Strip an optional code fence and parse a term-pair list
fn parse_term_pairs(raw: &str) -> Result<Vec<TermPair>, TranslationError> {
    let trimmed = raw.trim();
    let cleaned = if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
        body.strip_suffix("```").unwrap_or(body).trim()
    } else {
        trimmed
    };
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| TranslationError::MalformedResponse(format!("glossary list: {}", e)))?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<TermPair>(item).ok())
            .collect()),
        _ => Err(TranslationError::MalformedResponse(
            "glossary response is not a JSON list".to_string(),
        )),
    }
}

/// Agent extracting a term-alignment table from document text
pub struct GlossaryAgent {
    service: TranslationService,
}

impl GlossaryAgent {
    /// Create an agent over a translation service
    pub fn new(service: TranslationService) -> Self {
        Self { service }
    }

    /// Extract a glossary from the document's translatable fragments.
    ///
    /// Long documents are split with the regular chunker; chunks are sent
    /// concurrently with one attempt each. A chunk that fails or parses
    /// badly contributes nothing.
    pub async fn extract(&self, fragments: &[Fragment]) -> Glossary {
        let chunks = chunk_fragments(fragments, self.service.config.chunk_size);
        if chunks.is_empty() {
            return Glossary::new();
        }
        info!(
            "Extracting glossary from {} chunks (target: {})",
            chunks.len(),
            self.service.config.target_language
        );

        let system = prompts::glossary_prompt(&self.service.config.target_language);
        let concurrent = self.service.config.concurrent_requests.max(1);

        let replies = stream::iter(chunks.iter())
            .map(|chunk| {
                let service = self.service.clone();
                let system = system.clone();
                let payload = encode_chunk(chunk);
                async move {
                    let request = ChatRequest::new(system, payload)
                        .temperature(service.config.provider.temperature);
                    service.call_with_timeout(request).await
                }
            })
            .buffer_unordered(concurrent)
            .collect::<Vec<_>>()
            .await;

        let mut glossary = Glossary::new();
        for reply in replies {
            match reply {
                Ok(response) => match parse_term_pairs(&response.text) {
                    Ok(pairs) => {
                        glossary.merge(pairs.into_iter().map(|p| (p.src, p.dst)));
                    }
                    Err(e) => warn!("Discarding unparsable glossary chunk: {}", e),
                },
                Err(e) => warn!("Glossary chunk failed: {}", e),
            }
        }
        info!("Glossary extraction finished with {} terms", glossary.len());
        glossary
    }
}
