/*!
 * Format adapters: fragment extraction and reassembly per document format.
 *
 * Every supported format implements the same capability pair — decompose a
 * document into ordered fragments plus a reinsertion plan, and later map
 * translated fragment text back onto the original structure. The adapter for
 * a document is selected by its format discriminator at workflow
 * construction; nothing else in the pipeline knows format specifics.
 */

use std::collections::HashMap;

use crate::app_config::{InsertMode, TranslationConfig};
use crate::document::{Document, DocumentFormat, Fragment, FragmentId};
use crate::errors::AppError;

pub mod docx;
pub mod epub;
pub mod html;
pub mod json;
pub mod markdown;
pub mod srt;
pub mod xlsx;

/// Result of fragment extraction: the fragments in source order plus the
/// plan needed to put translated text back
#[derive(Debug)]
pub struct Extraction {
    /// Ordered fragments; ids are dense indexes into this sequence
    pub fragments: Vec<Fragment>,
    /// Format-specific reinsertion plan
    pub plan: ReinsertionPlan,
}

/// Format-specific structure recorded at extraction time.
///
/// The plan owns whatever parsed representation the adapter needs to rebuild
/// the document without re-reading the source.
#[derive(Debug)]
pub enum ReinsertionPlan {
    /// Verbatim segment list for Markdown and plain text
    Markdown { segments: Vec<markdown::MdSegment> },
    /// Parsed JSON tree plus pointers to the matched values
    Json {
        root: serde_json::Value,
        targets: Vec<json::JsonTarget>,
    },
    /// Structured word-processing model
    Docx { model: docx::DocxModel },
    /// Structured workbook model plus the addressed text cells
    Xlsx {
        model: xlsx::WorkbookModel,
        cells: Vec<xlsx::CellRef>,
    },
    /// Parsed subtitle cues
    Srt { cues: Vec<srt::SrtCue> },
    /// HTML source plus addressed text nodes; the DOM is re-walked at
    /// reassembly time (the rcdom tree is not Send)
    Html {
        source: String,
        nodes: Vec<html::TextSlot>,
    },
    /// E-book page model plus addressed text nodes per page
    Epub {
        model: epub::EpubModel,
        nodes: Vec<epub::PageSlot>,
    },
}

/// Successful translations, keyed by fragment id.
///
/// Fragments absent from the map (failed jobs, canceled chunks) fall back to
/// their original text at reassembly.
pub type TranslatedMap = HashMap<FragmentId, String>;

/// How translated text is written back into structural slots
#[derive(Debug, Clone)]
pub struct ReinsertPolicy {
    /// Replace, append or prepend relative to the original text
    pub insert_mode: InsertMode,
    /// Separator for append/prepend modes
    pub separator: String,
}

impl Default for ReinsertPolicy {
    fn default() -> Self {
        ReinsertPolicy {
            insert_mode: InsertMode::Replace,
            separator: "\n".to_string(),
        }
    }
}

impl ReinsertPolicy {
    /// Build the policy from a translation config
    pub fn from_config(config: &TranslationConfig) -> Self {
        ReinsertPolicy {
            insert_mode: config.insert_mode,
            separator: config.separator.clone(),
        }
    }

    /// Text written into a slot whose fragment has a translation
    pub fn slot_text(&self, original: &str, translated: &str) -> String {
        self.insert_mode.combine(original, translated, &self.separator)
    }
}

/// Capability pair implemented once per format
pub trait FormatAdapter: Send + Sync {
    /// Decompose a document into fragments and a reinsertion plan
    fn extract(&self, document: &Document) -> Result<Extraction, AppError>;

    /// Rebuild the document with translated fragment text applied.
    ///
    /// Fragments without an entry in `translated` keep their original text;
    /// a missing translation never leaves a structural slot empty.
    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        policy: &ReinsertPolicy,
    ) -> Result<Document, AppError>;
}

/// Select the adapter for a format.
///
/// Markdown and plain text share one adapter; JSON picks up the configured
/// path patterns.
pub fn adapter_for(format: DocumentFormat, config: &TranslationConfig) -> Box<dyn FormatAdapter> {
    match format {
        DocumentFormat::Markdown | DocumentFormat::Text => {
            Box::new(markdown::MarkdownAdapter::new())
        }
        DocumentFormat::Json => Box::new(json::JsonAdapter::new(config.json_paths.clone())),
        DocumentFormat::Docx => Box::new(docx::DocxAdapter::new()),
        DocumentFormat::Xlsx => Box::new(xlsx::XlsxAdapter::new()),
        DocumentFormat::Srt => Box::new(srt::SrtAdapter::new()),
        DocumentFormat::Epub => Box::new(epub::EpubAdapter::new()),
        DocumentFormat::Html => Box::new(html::HtmlAdapter::new()),
    }
}

/// Internal helper: wrong plan variant handed to an adapter
pub(crate) fn plan_mismatch(expected: &str) -> AppError {
    AppError::Unknown(format!("reinsertion plan does not match the {} adapter", expected))
}

/// Internal helper: dense fragment id allocation during extraction
pub(crate) struct FragmentBuilder {
    fragments: Vec<Fragment>,
}

impl FragmentBuilder {
    pub(crate) fn new() -> Self {
        FragmentBuilder { fragments: Vec::new() }
    }

    pub(crate) fn push(
        &mut self,
        text: impl Into<String>,
        translatable: bool,
        context: crate::document::FragmentContext,
    ) -> FragmentId {
        let id = self.fragments.len();
        let fragment = if translatable {
            Fragment::new(id, text, context)
        } else {
            Fragment::passthrough(id, text, context)
        };
        let fid = fragment.id;
        self.fragments.push(fragment);
        fid
    }

    pub(crate) fn finish(self) -> Vec<Fragment> {
        self.fragments
    }
}
