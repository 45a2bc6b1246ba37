/*!
 * Word-processing fragment extraction.
 *
 * The binary .docx container never enters this crate. The converter boundary
 * delivers a structured text model — paragraphs of styled runs — serialized
 * as JSON, and the exporter on the other side writes the translated model
 * back into the container. Run boundaries and style names survive the round
 * trip untouched; only run text is rewritten, honoring the insert mode.
 */

use serde::{Deserialize, Serialize};

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

/// A contiguous run of identically-styled text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocxRun {
    /// Run text
    pub text: String,
    /// Style name, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// One paragraph of runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocxParagraph {
    /// Paragraph style name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Runs in document order
    pub runs: Vec<DocxRun>,
}

/// Structured text model of one word-processing document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocxModel {
    /// Paragraphs in document order
    pub paragraphs: Vec<DocxParagraph>,
}

/// Adapter for word-processing documents
pub struct DocxAdapter;

impl DocxAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        DocxAdapter
    }
}

impl Default for DocxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for DocxAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let model: DocxModel = serde_json::from_slice(&document.content).map_err(|e| {
            AppError::InvalidInput(format!("Invalid document text model: {}", e))
        })?;

        let mut builder = FragmentBuilder::new();
        for (p_index, paragraph) in model.paragraphs.iter().enumerate() {
            for (r_index, run) in paragraph.runs.iter().enumerate() {
                // Whitespace-only runs are layout, not content
                let translatable = !run.text.trim().is_empty();
                builder.push(
                    run.text.clone(),
                    translatable,
                    FragmentContext::DocxRun {
                        paragraph: p_index,
                        run: r_index,
                        style: run.style.clone(),
                    },
                );
            }
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Docx { model },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Docx { model } = plan else {
            return Err(plan_mismatch("docx"));
        };

        let mut output = model.clone();
        // Ids were allocated densely over runs in document order; replay the
        // same walk to address them.
        let mut next_id = 0usize;
        for paragraph in &mut output.paragraphs {
            for run in &mut paragraph.runs {
                let id = FragmentId(next_id);
                next_id += 1;
                if let Some(text) = translated.get(&id) {
                    run.text = policy.slot_text(&run.text, text);
                }
            }
        }

        let serialized = serde_json::to_string(&output)
            .map_err(|e| AppError::Unknown(format!("Failed to serialize text model: {}", e)))?;
        let mut result = document.clone();
        result.content = serialized.into_bytes().into();
        Ok(result)
    }
}
