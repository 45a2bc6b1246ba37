/*!
 * In-memory document model.
 *
 * A `Document` is the unit that flows through the pipeline: raw bytes plus a
 * format discriminator. Format adapters decompose it into `Fragment`s, the
 * smallest units eligible for translation, each carrying enough structural
 * context to be reinserted exactly where it came from.
 */

use std::fmt;
use std::path::Path;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported document formats, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Markdown text, including PDF-derived Markdown from external converters
    Markdown,
    /// Plain text, split on paragraph boundaries like Markdown
    Text,
    /// JSON with user-selectable translatable paths
    Json,
    /// Word processing document, exchanged as a structured text model
    Docx,
    /// Spreadsheet, exchanged as a structured text model
    Xlsx,
    /// SubRip subtitles
    Srt,
    /// E-book, exchanged as a structured model of XHTML pages
    Epub,
    /// HTML page
    Html,
}

impl DocumentFormat {
    /// Detect the format from a file extension (without the leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "srt" => Some(Self::Srt),
            "epub" => Some(Self::Epub),
            "html" | "htm" | "xhtml" => Some(Self::Html),
            _ => None,
        }
    }

    /// Canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
            Self::Json => "json",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Srt => "srt",
            Self::Epub => "epub",
            Self::Html => "html",
        }
    }

    /// MIME type reported for exported artifacts
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Text => "text/plain",
            Self::Json => "application/json",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Srt => "application/x-subrip",
            Self::Epub => "application/epub+zip",
            Self::Html => "text/html",
        }
    }

    /// Whether the payload is UTF-8 text the pipeline parses directly.
    ///
    /// Binary container formats (docx, xlsx, epub) cross the converter
    /// boundary as serialized structured text models.
    pub fn is_textual(&self) -> bool {
        !matches!(self, Self::Docx | Self::Xlsx | Self::Epub)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| anyhow!("Unsupported document format: {}", s))
    }
}

/// A conversion by-product attached to a document (extracted images etc.)
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name relative to the document
    pub name: String,
    /// Raw content
    pub content: Bytes,
    /// MIME type, if the converter reported one
    pub mime: Option<String>,
}

/// One input file after reading (and, later, after conversion)
#[derive(Debug, Clone)]
pub struct Document {
    /// File stem, without extension
    pub name: String,
    /// Format discriminator
    pub format: DocumentFormat,
    /// Raw content bytes
    pub content: Bytes,
    /// Assets produced alongside the content by a converter
    pub attachments: Vec<Attachment>,
}

impl Document {
    /// Create a document from raw bytes
    pub fn from_bytes(name: impl Into<String>, format: DocumentFormat, content: impl Into<Bytes>) -> Self {
        Document {
            name: name.into(),
            format,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    /// Read a document from a file path, detecting the format from the extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("File has no extension: {:?}", path))?;
        let format = DocumentFormat::from_extension(ext)
            .ok_or_else(|| anyhow!("Unsupported document format: {}", ext))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        let content = std::fs::read(path)
            .map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        Ok(Document::from_bytes(name, format, content))
    }

    /// Content decoded as UTF-8
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| anyhow!("Document {} is not valid UTF-8: {}", self.name, e))
    }

    /// Output file name for this document in its native format
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.extension())
    }

    /// Content fingerprint over the raw bytes plus an opaque options string.
    ///
    /// Used as the conversion-cache key: same bytes converted with the same
    /// options always map to the same entry.
    pub fn fingerprint(&self, options_key: &str) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.format.extension().as_bytes());
        hasher.update([0u8]);
        hasher.update(&self.content);
        hasher.update([0u8]);
        hasher.update(options_key.as_bytes());
        let digest = hasher.finalize();
        Fingerprint(format!("{:x}", digest))
    }
}

/// Conversion-cache key derived from file content and converter options
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a fragment, unique and stable within one document.
///
/// Ids are dense indexes assigned in extraction order, which also makes them
/// the wire keys of the chunk payload sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub usize);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural coordinates needed to reinsert a fragment exactly
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentContext {
    /// Block index within a Markdown/plain-text document
    Block { index: usize },
    /// JSON Pointer to the matched value
    JsonValue { pointer: String },
    /// Run within a paragraph of a word-processing document
    DocxRun {
        paragraph: usize,
        run: usize,
        style: Option<String>,
    },
    /// Cell within a spreadsheet sheet
    XlsxCell { sheet: String, row: u32, col: u32 },
    /// Subtitle cue, timing carried verbatim
    SrtCue {
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },
    /// Text node position within an HTML DOM walk
    HtmlText { node: usize },
    /// Text node within one page of an e-book
    EpubText { page: usize, node: usize },
}

/// Smallest unit eligible for translation
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Stable identifier within the document
    pub id: FragmentId,
    /// Raw text of the fragment
    pub text: String,
    /// Whether the fragment should be sent to the model at all
    pub translatable: bool,
    /// Where the fragment came from
    pub context: FragmentContext,
}

impl Fragment {
    /// Create a translatable fragment
    pub fn new(id: usize, text: impl Into<String>, context: FragmentContext) -> Self {
        Fragment {
            id: FragmentId(id),
            text: text.into(),
            translatable: true,
            context,
        }
    }

    /// Create a fragment that passes through untranslated
    pub fn passthrough(id: usize, text: impl Into<String>, context: FragmentContext) -> Self {
        Fragment {
            id: FragmentId(id),
            text: text.into(),
            translatable: false,
            context,
        }
    }

    /// Character count of the fragment text
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}
