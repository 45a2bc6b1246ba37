/*!
 * Workflow orchestration.
 *
 * A workflow is a per-document state machine: `Created → Read → Converted →
 * Translated → Exported`, monotonic, with every operation checking it is
 * invoked in order. Reading brings the source into memory; conversion goes
 * through the shared cache; translation runs Chunker → GlossaryAgent →
 * ConcurrentTranslator → reassembly; export writes artifacts.
 *
 * The state machine core is async. `translate_blocking` and
 * `run_task_blocking` are thin drivers over the same core for callers
 * without a runtime, so both execution models produce identical results.
 */

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::app_config::TranslationConfig;
use crate::cache::ConversionCache;
use crate::chunker::chunk_fragments;
use crate::converter::{ConvertOptions, Converter, IdentityConverter, conversion_fingerprint};
use crate::document::{Document, DocumentFormat};
use crate::errors::{AppError, ExportError};
use crate::formats::{Extraction, ReinsertPolicy, TranslatedMap, adapter_for};
use crate::glossary::Glossary;
use crate::translation::{
    CancelToken, ConcurrentTranslator, GlossaryAgent, TokenUsageStats, TranslationService,
};

pub mod progress;
pub mod task;

use progress::{ProgressSender, StepKind, emit};

/// States of the per-document state machine, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowState {
    /// Nothing read yet
    Created,
    /// Source bytes are in memory
    Read,
    /// Intermediate document is available (possibly from cache)
    Converted,
    /// Fragments are translated and reassembled
    Translated,
    /// Artifacts are written
    Exported,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Read => "read",
            Self::Converted => "converted",
            Self::Translated => "translated",
            Self::Exported => "exported",
        };
        write!(f, "{}", name)
    }
}

/// One exported output file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Artifact {
    /// Kind of artifact ("document" or "attachment")
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Absolute or out_dir-relative path written
    pub path: String,
    /// MIME type
    pub mime: String,
}

/// Per-document translation pipeline
pub struct Workflow {
    state: WorkflowState,
    config: TranslationConfig,
    convert_options: ConvertOptions,
    converter: Arc<dyn Converter>,
    cache: Arc<ConversionCache>,
    progress: Option<ProgressSender>,

    document_original: Option<Document>,
    document_converted: Option<Arc<Document>>,
    document_translated: Option<Document>,
    glossary: Glossary,
    stats: TokenUsageStats,
    errors: Vec<String>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("state", &self.state)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Create a workflow over a shared conversion cache.
    ///
    /// Provider settings are validated up front so misconfiguration fails
    /// before any work starts.
    pub fn new(config: TranslationConfig, cache: Arc<ConversionCache>) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let glossary = Glossary::from_terms(config.glossary.terms.clone());
        Ok(Workflow {
            state: WorkflowState::Created,
            config,
            convert_options: ConvertOptions::default(),
            converter: Arc::new(IdentityConverter),
            cache,
            progress: None,
            document_original: None,
            document_converted: None,
            document_translated: None,
            glossary,
            stats: TokenUsageStats::new(),
            errors: Vec::new(),
        })
    }

    /// Use an external converter with its options
    pub fn with_converter(mut self, converter: Arc<dyn Converter>, options: ConvertOptions) -> Self {
        self.converter = converter;
        self.convert_options = options;
        self
    }

    /// Attach a progress channel
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Current state
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Errors accumulated so far (per-chunk failures, mismatches)
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Aggregate token statistics
    pub fn stats(&self) -> &TokenUsageStats {
        &self.stats
    }

    /// The translated document, once available
    pub fn translated_document(&self) -> Option<&Document> {
        self.document_translated.as_ref()
    }

    fn require_state(&self, expected: WorkflowState, operation: &str) -> Result<(), AppError> {
        if self.state != expected {
            return Err(AppError::InvalidState(format!(
                "{} requires state {}, but workflow is {}",
                operation, expected, self.state
            )));
        }
        Ok(())
    }

    /// Read the source document from a path. Created → Read.
    pub fn read_path<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, AppError> {
        self.require_state(WorkflowState::Created, "read_path")?;
        let document =
            Document::from_path(path).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.document_original = Some(document);
        self.state = WorkflowState::Read;
        Ok(self)
    }

    /// Read the source document from bytes. Created → Read.
    pub fn read_bytes(
        &mut self,
        name: impl Into<String>,
        format: DocumentFormat,
        content: Vec<u8>,
    ) -> Result<&mut Self, AppError> {
        self.require_state(WorkflowState::Created, "read_bytes")?;
        self.document_original = Some(Document::from_bytes(name, format, content));
        self.state = WorkflowState::Read;
        Ok(self)
    }

    /// Run the external converter through the shared cache. Read → Converted.
    ///
    /// Concurrent workflows converting the same source share one conversion;
    /// the cached document is an immutable snapshot.
    pub async fn convert(&mut self) -> Result<&mut Self, AppError> {
        self.require_state(WorkflowState::Read, "convert")?;
        let Some(original) = self.document_original.clone() else {
            return Err(AppError::InvalidState("no document was read".to_string()));
        };

        if self.convert_options.engine.is_some() && self.converter.name() == "identity" {
            return Err(AppError::DependencyMissing(format!(
                "converter engine '{}' is not available",
                self.convert_options.engine.as_deref().unwrap_or_default()
            )));
        }

        let fingerprint = conversion_fingerprint(&original, &self.convert_options);
        let was_cached = self.cache.get(&fingerprint).is_some();
        let converter = self.converter.clone();
        let options = self.convert_options.clone();
        let converted = self
            .cache
            .get_or_convert(fingerprint, move || async move {
                converter.convert(&original, &options).await
            })
            .await?;

        emit(
            self.progress.as_ref(),
            StepKind::Convert,
            if was_cached { "cache hit" } else { "converted" },
        );
        self.document_converted = Some(converted);
        self.state = WorkflowState::Converted;
        Ok(self)
    }

    /// Translate the converted document. Converted → Translated.
    ///
    /// With `skip_translate` set the document passes through unchanged —
    /// the diagnostic mode for checking conversion output.
    pub async fn translate(&mut self) -> Result<&mut Self, AppError> {
        self.translate_with_cancel(&CancelToken::new()).await
    }

    /// Translate with a cooperative cancellation token.
    ///
    /// On cancellation mid-stage, finished chunks are kept and the rest of
    /// the document falls back to original text; the workflow still reaches
    /// Translated so the partial result can be exported.
    pub async fn translate_with_cancel(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<&mut Self, AppError> {
        self.require_state(WorkflowState::Converted, "translate")?;
        if self.config.skip_translate {
            return self.skip_translation();
        }
        let service = TranslationService::new(self.config.clone())?;
        self.translate_with_service(service, cancel).await
    }

    /// Same as `translate_with_cancel`, over an injected provider service.
    /// This is the seam mock-backed tests and custom backends go through.
    pub async fn translate_with_service(
        &mut self,
        service: TranslationService,
        cancel: &CancelToken,
    ) -> Result<&mut Self, AppError> {
        self.require_state(WorkflowState::Converted, "translate")?;
        if self.config.skip_translate {
            return self.skip_translation();
        }
        let Some(converted) = self.document_converted.clone() else {
            return Err(AppError::InvalidState("no converted document".to_string()));
        };

        let adapter = adapter_for(converted.format, &self.config);
        let Extraction { fragments, plan } = adapter.extract(&converted)?;
        let chunks = chunk_fragments(&fragments, self.config.chunk_size);
        emit(
            self.progress.as_ref(),
            StepKind::Chunk,
            format!("{} fragments in {} chunks", fragments.len(), chunks.len()),
        );
        self.translate_inner(service, adapter.as_ref(), &converted, fragments, plan, chunks, cancel)
            .await
    }

    /// Diagnostic pass-through: the converted document moves on unchanged
    fn skip_translation(&mut self) -> Result<&mut Self, AppError> {
        let Some(converted) = self.document_converted.clone() else {
            return Err(AppError::InvalidState("no converted document".to_string()));
        };
        info!("Translation skipped; passing converted document through");
        emit(self.progress.as_ref(), StepKind::Translate, "skipped");
        self.document_translated = Some((*converted).clone());
        self.state = WorkflowState::Translated;
        Ok(self)
    }

    #[allow(clippy::too_many_arguments)]
    async fn translate_inner(
        &mut self,
        service: TranslationService,
        adapter: &dyn crate::formats::FormatAdapter,
        converted: &Document,
        fragments: Vec<crate::document::Fragment>,
        plan: crate::formats::ReinsertionPlan,
        chunks: Vec<crate::chunker::Chunk>,
        cancel: &CancelToken,
    ) -> Result<&mut Self, AppError> {
        // Optional glossary pre-pass; failures inside it are non-fatal
        if self.config.glossary.generate && !cancel.is_canceled() {
            let agent = GlossaryAgent::new(service.clone());
            let generated = agent.extract(&fragments).await;
            // Explicit user terms win over generated ones
            let mut glossary = Glossary::from_terms(self.config.glossary.terms.clone());
            glossary.merge(generated.iter().map(|(s, d)| (s.to_string(), d.to_string())));
            self.glossary = glossary;
        }
        let glossary = if self.glossary.is_empty() {
            None
        } else {
            Some(&self.glossary)
        };

        let translator = ConcurrentTranslator::new(service);
        let (jobs, stats) = translator.translate_chunks(&chunks, glossary, cancel).await;
        let (translated, errors): (TranslatedMap, Vec<String>) =
            translator.collect_translations(&chunks, &jobs);
        emit(
            self.progress.as_ref(),
            StepKind::Translate,
            format!(
                "{} of {} chunks translated",
                jobs.iter().filter(|j| j.succeeded()).count(),
                jobs.len()
            ),
        );
        if !errors.is_empty() {
            warn!("Translation finished with {} chunk errors", errors.len());
        }
        self.errors.extend(errors);
        self.stats = stats;

        let policy = ReinsertPolicy::from_config(&self.config);
        let reassembled = adapter.reassemble(converted, &plan, &translated, &policy)?;
        self.document_translated = Some(reassembled);
        self.state = WorkflowState::Translated;
        Ok(self)
    }

    /// Blocking driver over the async convert+translate core.
    ///
    /// For callers without a runtime; must not be invoked from async code.
    pub fn translate_blocking(&mut self) -> Result<&mut Self, AppError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Unknown(format!("Failed to start runtime: {}", e)))?;
        runtime.block_on(async {
            self.convert().await?;
            self.translate().await?;
            Ok::<(), AppError>(())
        })?;
        Ok(self)
    }

    /// Write artifacts. Translated → Exported (or Converted → Exported in
    /// dry-run mode, exporting the untranslated conversion).
    ///
    /// An export failure aborts only this stage; the in-memory documents
    /// remain available.
    pub fn export(
        &mut self,
        out_dir: &Path,
        save_attachments: bool,
    ) -> Result<Vec<Artifact>, AppError> {
        if self.state != WorkflowState::Translated && self.state != WorkflowState::Converted {
            return Err(AppError::InvalidState(format!(
                "export requires state translated or converted, but workflow is {}",
                self.state
            )));
        }
        let document = match (&self.document_translated, &self.document_converted) {
            (Some(translated), _) => translated.clone(),
            (None, Some(converted)) => (**converted).clone(),
            (None, None) => {
                return Err(AppError::InvalidState("nothing to export".to_string()));
            }
        };

        std::fs::create_dir_all(out_dir).map_err(|e| {
            AppError::Export(ExportError::WriteFailed {
                path: out_dir.display().to_string(),
                message: e.to_string(),
            })
        })?;

        let mut artifacts = Vec::new();
        let path = out_dir.join(document.file_name());
        std::fs::write(&path, &document.content).map_err(|e| {
            AppError::Export(ExportError::WriteFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;
        artifacts.push(Artifact {
            artifact_type: "document".to_string(),
            path: path.display().to_string(),
            mime: document.format.mime().to_string(),
        });

        if save_attachments && !document.attachments.is_empty() {
            let assets_dir = out_dir.join(format!("{}_assets", document.name));
            std::fs::create_dir_all(&assets_dir).map_err(|e| {
                AppError::Export(ExportError::WriteFailed {
                    path: assets_dir.display().to_string(),
                    message: e.to_string(),
                })
            })?;
            for attachment in &document.attachments {
                let attachment_path = assets_dir.join(&attachment.name);
                std::fs::write(&attachment_path, &attachment.content).map_err(|e| {
                    AppError::Export(ExportError::WriteFailed {
                        path: attachment_path.display().to_string(),
                        message: e.to_string(),
                    })
                })?;
                artifacts.push(Artifact {
                    artifact_type: "attachment".to_string(),
                    path: attachment_path.display().to_string(),
                    mime: attachment
                        .mime
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                });
            }
        }

        emit(
            self.progress.as_ref(),
            StepKind::Export,
            format!("{} artifacts", artifacts.len()),
        );
        self.state = WorkflowState::Exported;
        Ok(artifacts)
    }
}
