/*!
 * Converter boundary.
 *
 * Heavy file-to-Markdown conversion (PDF layout analysis, OCR) lives outside
 * this crate. The pipeline only sees the `Converter` trait: bytes in, an
 * intermediate `Document` out, keyed for caching by a fingerprint of the
 * input content plus the converter options.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, Fingerprint};
use crate::errors::AppError;

/// Options forwarded to an external converter engine
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConvertOptions {
    /// Engine identifier ("mineru", "docling", ...); None means identity
    pub engine: Option<String>,
    /// Whether formula regions are recognized
    #[serde(default)]
    pub formula: bool,
    /// Whether code regions are recognized
    #[serde(default)]
    pub code: bool,
}

impl ConvertOptions {
    /// Stable string participating in the cache fingerprint
    pub fn cache_key(&self) -> String {
        format!(
            "engine={};formula={};code={}",
            self.engine.as_deref().unwrap_or("identity"),
            self.formula,
            self.code
        )
    }
}

/// External converter seam.
///
/// Implementations call out to whatever engine turns a source file into the
/// intermediate representation the format adapters understand.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert a source document into its intermediate form
    async fn convert(&self, document: &Document, options: &ConvertOptions) -> Result<Document, AppError>;

    /// Human-readable engine name, used in error messages
    fn name(&self) -> &str;
}

/// Converter for inputs that are already in their intermediate form.
///
/// Markdown, plain text, JSON, SRT and HTML need no external engine; the
/// structured models for docx/xlsx/epub arrive pre-converted as well.
#[derive(Debug, Default)]
pub struct IdentityConverter;

#[async_trait]
impl Converter for IdentityConverter {
    async fn convert(&self, document: &Document, _options: &ConvertOptions) -> Result<Document, AppError> {
        Ok(document.clone())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Fingerprint of a (document, options) pair, the conversion-cache key
pub fn conversion_fingerprint(document: &Document, options: &ConvertOptions) -> Fingerprint {
    document.fingerprint(&options.cache_key())
}
