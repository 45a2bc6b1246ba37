/*!
 * E-book fragment extraction.
 *
 * An EPUB is a container of XHTML pages plus opaque resources; the container
 * codec stays outside the crate. The converter boundary delivers a page
 * model — ordered (path, XHTML) pairs with resources passed through — and
 * every page goes through the HTML text-node rules. Fragment contexts carry
 * the page index so translated text lands back on the right page.
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::html::{collect_text_nodes, rewrite_text_nodes};
use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

/// One XHTML page of the book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpubPage {
    /// Path of the page inside the container
    pub path: String,
    /// Page markup
    pub html: String,
}

/// Structured model of one e-book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpubModel {
    /// Pages in spine order
    pub pages: Vec<EpubPage>,
    /// Opaque container entries (manifest, css, images), passed through
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub resources: serde_json::Value,
}

/// One addressed text node on one page
#[derive(Debug, Clone)]
pub struct PageSlot {
    pub fragment: FragmentId,
    pub page: usize,
    pub node: usize,
    pub original: String,
}

/// Adapter for e-books
pub struct EpubAdapter;

impl EpubAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        EpubAdapter
    }
}

impl Default for EpubAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for EpubAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let model: EpubModel = serde_json::from_slice(&document.content)
            .map_err(|e| AppError::InvalidInput(format!("Invalid e-book model: {}", e)))?;

        let mut builder = FragmentBuilder::new();
        let mut nodes = Vec::new();
        for (page_index, page) in model.pages.iter().enumerate() {
            for (node_index, text) in collect_text_nodes(&page.html)? {
                if text.trim().is_empty() {
                    continue;
                }
                let id = builder.push(
                    text.clone(),
                    true,
                    FragmentContext::EpubText {
                        page: page_index,
                        node: node_index,
                    },
                );
                nodes.push(PageSlot {
                    fragment: id,
                    page: page_index,
                    node: node_index,
                    original: text,
                });
            }
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Epub { model, nodes },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Epub { model, nodes } = plan else {
            return Err(plan_mismatch("epub"));
        };

        // Group replacements per page, then rewrite each page once
        let mut per_page: HashMap<usize, HashMap<usize, String>> = HashMap::new();
        for slot in nodes {
            if let Some(text) = translated.get(&slot.fragment) {
                per_page
                    .entry(slot.page)
                    .or_default()
                    .insert(slot.node, policy.slot_text(&slot.original, text));
            }
        }

        let mut output = model.clone();
        for (page_index, page) in output.pages.iter_mut().enumerate() {
            if let Some(replacements) = per_page.get(&page_index) {
                page.html = rewrite_text_nodes(&page.html, replacements)?;
            }
        }

        let serialized = serde_json::to_string(&output)
            .map_err(|e| AppError::Unknown(format!("Failed to serialize e-book model: {}", e)))?;
        let mut result = document.clone();
        result.content = serialized.into_bytes().into();
        Ok(result)
    }
}
