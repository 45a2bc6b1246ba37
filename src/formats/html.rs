/*!
 * HTML fragment extraction.
 *
 * The document is parsed into a DOM with html5ever; text nodes become
 * fragments while tags and attributes are preserved verbatim. Subtrees that
 * must never be touched (scripts, styles, preformatted code, the head) are
 * excluded wholesale. Reassembly re-parses the recorded source, rewrites the
 * addressed text nodes and serializes the DOM back out, so markup survives
 * structurally intact.
 */

use std::collections::HashMap;

use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

// Subtrees whose text must never reach the model
const SKIP_TAGS: &[&str] = &[
    "script", "style", "pre", "code", "kbd", "samp", "var", "noscript", "template", "head",
];

/// One addressed text node: fragment id, walk-order index, original text
#[derive(Debug, Clone)]
pub struct TextSlot {
    pub fragment: FragmentId,
    pub node: usize,
    pub original: String,
}

/// Parse HTML source into a DOM tree
pub(crate) fn parse_html(source: &str) -> Result<RcDom, AppError> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut source.as_bytes())
        .map_err(|e| AppError::InvalidInput(format!("Failed to parse HTML: {}", e)))
}

fn walk_collect(node: &Handle, counter: &mut usize, out: &mut Vec<(usize, String)>) {
    match &node.data {
        NodeData::Element { name, .. } => {
            if SKIP_TAGS.contains(&&*name.local) {
                return;
            }
            for child in node.children.borrow().iter() {
                walk_collect(child, counter, out);
            }
        }
        NodeData::Text { contents } => {
            let index = *counter;
            *counter += 1;
            out.push((index, contents.borrow().to_string()));
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                walk_collect(child, counter, out);
            }
        }
        _ => {}
    }
}

fn walk_rewrite(node: &Handle, counter: &mut usize, replacements: &HashMap<usize, String>) {
    match &node.data {
        NodeData::Element { name, .. } => {
            if SKIP_TAGS.contains(&&*name.local) {
                return;
            }
            for child in node.children.borrow().iter() {
                walk_rewrite(child, counter, replacements);
            }
        }
        NodeData::Text { contents } => {
            let index = *counter;
            *counter += 1;
            if let Some(text) = replacements.get(&index) {
                *contents.borrow_mut() = StrTendril::from(text.as_str());
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                walk_rewrite(child, counter, replacements);
            }
        }
        _ => {}
    }
}

/// Collect (walk index, text) for every text node outside excluded subtrees
pub(crate) fn collect_text_nodes(source: &str) -> Result<Vec<(usize, String)>, AppError> {
    let dom = parse_html(source)?;
    let mut out = Vec::new();
    let mut counter = 0usize;
    walk_collect(&dom.document, &mut counter, &mut out);
    Ok(out)
}

/// Re-parse the source, rewrite addressed text nodes, and serialize
pub(crate) fn rewrite_text_nodes(
    source: &str,
    replacements: &HashMap<usize, String>,
) -> Result<String, AppError> {
    let dom = parse_html(source)?;
    let mut counter = 0usize;
    walk_rewrite(&dom.document, &mut counter, replacements);

    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = dom.document.into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| AppError::Unknown(format!("Failed to serialize DOM: {}", e)))?;
    String::from_utf8(buf)
        .map_err(|e| AppError::Unknown(format!("Serialized DOM is not UTF-8: {}", e)))
}

/// Adapter for HTML pages
pub struct HtmlAdapter;

impl HtmlAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        HtmlAdapter
    }
}

impl Default for HtmlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for HtmlAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let source = document
            .text()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?
            .to_string();

        let mut builder = FragmentBuilder::new();
        let mut nodes = Vec::new();
        for (index, text) in collect_text_nodes(&source)? {
            // Whitespace-only nodes are formatting; leave them alone
            if text.trim().is_empty() {
                continue;
            }
            let id = builder.push(text.clone(), true, FragmentContext::HtmlText { node: index });
            nodes.push(TextSlot {
                fragment: id,
                node: index,
                original: text,
            });
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Html { source, nodes },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Html { source, nodes } = plan else {
            return Err(plan_mismatch("html"));
        };

        let mut replacements: HashMap<usize, String> = HashMap::new();
        for slot in nodes {
            if let Some(text) = translated.get(&slot.fragment) {
                replacements.insert(slot.node, policy.slot_text(&slot.original, text));
            }
        }

        let output = rewrite_text_nodes(source, &replacements)?;
        let mut result = document.clone();
        result.content = output.into_bytes().into();
        Ok(result)
    }
}
