/*!
 * Markdown and plain-text fragment extraction.
 *
 * The document is scanned into a verbatim segment list: paragraph blocks,
 * fenced code blocks, and the exact blank-line gaps between them. Paragraphs
 * become translatable fragments; fenced code and gaps pass through untouched.
 * Concatenating the segments reproduces the source byte for byte, which is
 * what makes identity reassembly lossless.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

// Opening or closing code fence, up to three leading spaces
static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(```|~~~)").unwrap()
});

/// One verbatim slice of the source document
#[derive(Debug, Clone)]
pub struct MdSegment {
    /// Exact source text of the segment
    pub text: String,
    /// Fragment occupying this slot, if any; gaps have none
    pub fragment: Option<FragmentId>,
}

#[derive(PartialEq, Clone, Copy)]
enum SegmentKind {
    Gap,
    Paragraph,
    Fence,
}

/// Adapter for Markdown and plain text
pub struct MarkdownAdapter;

impl MarkdownAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        MarkdownAdapter
    }
}

impl Default for MarkdownAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan source text into (kind, verbatim text) runs
fn scan_runs(text: &str) -> Vec<(SegmentKind, String)> {
    let mut runs: Vec<(SegmentKind, String)> = Vec::new();
    let mut current = String::new();
    let mut kind: Option<SegmentKind> = None;
    let mut fence_marker: Option<&str> = None;

    let flush = |runs: &mut Vec<(SegmentKind, String)>, current: &mut String, kind: SegmentKind| {
        if !current.is_empty() {
            runs.push((kind, std::mem::take(current)));
        }
    };

    for line in text.split_inclusive('\n') {
        let is_blank = line.trim().is_empty();
        let fence_open = FENCE_REGEX.find(line);

        if let Some(marker) = fence_marker {
            // Inside a fence everything accrues until the closing marker
            current.push_str(line);
            if line.trim_start().starts_with(marker) {
                flush(&mut runs, &mut current, SegmentKind::Fence);
                kind = None;
                fence_marker = None;
            }
            continue;
        }

        if let Some(m) = fence_open {
            if let Some(k) = kind {
                flush(&mut runs, &mut current, k);
            }
            fence_marker = Some(if m.as_str().trim_start().starts_with("~~~") { "~~~" } else { "```" });
            kind = Some(SegmentKind::Fence);
            current.push_str(line);
            continue;
        }

        let line_kind = if is_blank { SegmentKind::Gap } else { SegmentKind::Paragraph };
        if kind != Some(line_kind) {
            if let Some(k) = kind {
                flush(&mut runs, &mut current, k);
            }
            kind = Some(line_kind);
        }
        current.push_str(line);
    }

    if let Some(k) = kind {
        if !current.is_empty() {
            runs.push((k, current));
        }
    }

    runs
}

impl FormatAdapter for MarkdownAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let text = document
            .text()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let mut builder = FragmentBuilder::new();
        let mut segments: Vec<MdSegment> = Vec::new();

        for (kind, run) in scan_runs(text) {
            match kind {
                SegmentKind::Gap => segments.push(MdSegment { text: run, fragment: None }),
                SegmentKind::Fence => {
                    let id = builder.push(
                        run.clone(),
                        false,
                        FragmentContext::Block { index: segments.len() },
                    );
                    segments.push(MdSegment { text: run, fragment: Some(id) });
                }
                SegmentKind::Paragraph => {
                    // The trailing line terminator is structure, not content;
                    // keep it out of the translated slot.
                    let (body, newline) = match run.strip_suffix("\r\n") {
                        Some(b) => (b.to_string(), "\r\n"),
                        None => match run.strip_suffix('\n') {
                            Some(b) => (b.to_string(), "\n"),
                            None => (run.clone(), ""),
                        },
                    };
                    let id = builder.push(
                        body.clone(),
                        true,
                        FragmentContext::Block { index: segments.len() },
                    );
                    segments.push(MdSegment { text: body, fragment: Some(id) });
                    if !newline.is_empty() {
                        segments.push(MdSegment { text: newline.to_string(), fragment: None });
                    }
                }
            }
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Markdown { segments },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        _policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Markdown { segments } = plan else {
            return Err(plan_mismatch("markdown"));
        };

        let mut output = String::new();
        for segment in segments {
            match segment.fragment.and_then(|id| translated.get(&id)) {
                Some(text) => output.push_str(text),
                None => output.push_str(&segment.text),
            }
        }

        let mut result = document.clone();
        result.content = output.into_bytes().into();
        Ok(result)
    }
}
