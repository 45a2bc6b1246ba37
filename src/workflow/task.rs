/*!
 * Machine-facing task contract.
 *
 * Automation callers hand over one request object describing input,
 * translation parameters and export targets, and receive one response with
 * status, artifacts, metrics and errors. Step events stream over an
 * optional progress channel while the task runs. Partial success is
 * explicit: a completed response can still carry a non-empty error list
 * when individual chunks degraded to pass-through.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_config::{GlossaryConfig, ProviderConfig, TranslationConfig};
use crate::cache::ConversionCache;
use crate::errors::AppError;
use crate::translation::CancelToken;

use super::progress::ProgressSender;
use super::{Artifact, Workflow};

/// Input description of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    /// Declared input type ("md", "json", "srt", ...); informational, the
    /// path extension is authoritative
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    /// Path of the source file
    pub path: String,
}

/// Translation parameters of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTranslate {
    /// Target language
    pub to_lang: String,
    /// Pass fragments through unchanged
    #[serde(default)]
    pub skip_translate: bool,
    /// Model identifier
    #[serde(default)]
    pub model_id: Option<String>,
    /// Endpoint base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Concurrent request bound
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Per-call timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Maximum attempts per chunk
    #[serde(default)]
    pub retry: Option<u32>,
    /// Honor the system proxy
    #[serde(default)]
    pub proxy_enable: bool,
    /// Chunk size ceiling in characters
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Generate a glossary before translating
    #[serde(default)]
    pub glossary_generate: bool,
}

/// Export parameters of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExport {
    /// Output directory
    pub out_dir: String,
    /// Requested export formats; only "native" is currently recognized
    #[serde(default)]
    pub formats: Vec<String>,
    /// Write conversion attachments next to the document
    #[serde(default)]
    pub save_attachments: bool,
}

/// One automation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Caller-chosen id; generated when absent
    #[serde(default)]
    pub task_id: Option<String>,
    /// Input description
    pub input: TaskInput,
    /// Translation parameters
    pub translate: TaskTranslate,
    /// Export parameters
    pub export: TaskExport,
}

/// Terminal status of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Pipeline ran to the end (possibly with per-chunk errors)
    Completed,
    /// Pipeline aborted
    Failed,
    /// Cancellation was requested and honored
    Canceled,
}

/// Aggregate metrics of one task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Prompt tokens consumed
    pub tokens_in: u64,
    /// Completion tokens produced
    pub tokens_out: u64,
    /// Cached prompt tokens
    pub tokens_cached: u64,
    /// Reasoning tokens
    pub tokens_reasoning: u64,
}

/// One automation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Id echoed from the request (or generated)
    pub task_id: String,
    /// Terminal status
    pub status: TaskStatus,
    /// Written artifacts
    pub artifacts: Vec<Artifact>,
    /// Names of attachments carried by the document
    pub attachments: Vec<String>,
    /// Aggregate metrics
    pub metrics: TaskMetrics,
    /// Error records; non-empty on partial success
    pub errors: Vec<String>,
}

fn config_from_request(request: &TaskRequest) -> TranslationConfig {
    let translate = &request.translate;
    let mut config = TranslationConfig::new(translate.to_lang.clone());
    config.skip_translate = translate.skip_translate;
    config.provider = ProviderConfig {
        base_url: translate.base_url.clone().unwrap_or_default(),
        api_key: translate.api_key.clone().unwrap_or_default(),
        model: translate.model_id.clone().unwrap_or_default(),
        temperature: config.provider.temperature,
        proxy_enable: translate.proxy_enable,
    };
    if let Some(concurrency) = translate.concurrency {
        config.concurrent_requests = concurrency;
    }
    if let Some(timeout) = translate.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(retry) = translate.retry {
        config.retry_count = retry;
    }
    if let Some(chunk_size) = translate.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.glossary = GlossaryConfig {
        generate: translate.glossary_generate,
        terms: Default::default(),
    };
    config
}

/// Run one task end to end.
///
/// Fatal errors (unreadable input, missing converter, export failure)
/// produce a `failed` response; per-chunk translation errors degrade to
/// pass-through and surface in the error list of a `completed` response.
pub async fn run_task(
    request: TaskRequest,
    cache: Arc<ConversionCache>,
    progress: Option<ProgressSender>,
    cancel: &CancelToken,
) -> TaskResponse {
    let task_id = request
        .task_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let started = Instant::now();

    let result = drive_task(&request, cache, progress, cancel).await;

    let mut response = match result {
        Ok((artifacts, attachments, errors, metrics)) => TaskResponse {
            task_id,
            status: if cancel.is_canceled() {
                TaskStatus::Canceled
            } else {
                TaskStatus::Completed
            },
            artifacts,
            attachments,
            metrics,
            errors,
        },
        Err(e) => TaskResponse {
            task_id,
            status: TaskStatus::Failed,
            artifacts: Vec::new(),
            attachments: Vec::new(),
            metrics: TaskMetrics::default(),
            errors: vec![e.to_string()],
        },
    };
    response.metrics.duration_ms = started.elapsed().as_millis() as u64;
    response
}

async fn drive_task(
    request: &TaskRequest,
    cache: Arc<ConversionCache>,
    progress: Option<ProgressSender>,
    cancel: &CancelToken,
) -> Result<(Vec<Artifact>, Vec<String>, Vec<String>, TaskMetrics), AppError> {
    let config = config_from_request(request);
    let mut workflow = Workflow::new(config, cache)?;
    if let Some(sender) = progress {
        workflow = workflow.with_progress(sender);
    }

    workflow.read_path(&request.input.path)?;
    workflow.convert().await?;
    workflow.translate_with_cancel(cancel).await?;

    let attachments = workflow
        .translated_document()
        .map(|d| d.attachments.iter().map(|a| a.name.clone()).collect())
        .unwrap_or_default();

    let out_dir = PathBuf::from(&request.export.out_dir);
    let artifacts = workflow.export(&out_dir, request.export.save_attachments)?;

    let stats = workflow.stats();
    let metrics = TaskMetrics {
        duration_ms: 0,
        tokens_in: stats.usage.input_tokens,
        tokens_out: stats.usage.output_tokens,
        tokens_cached: stats.usage.cached_tokens,
        tokens_reasoning: stats.usage.reasoning_tokens,
    };
    Ok((artifacts, attachments, workflow.errors().to_vec(), metrics))
}

/// Blocking driver over `run_task` for callers without a runtime
pub fn run_task_blocking(
    request: TaskRequest,
    cache: Arc<ConversionCache>,
    progress: Option<ProgressSender>,
) -> Result<TaskResponse, AppError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Unknown(format!("Failed to start runtime: {}", e)))?;
    Ok(runtime.block_on(run_task(request, cache, progress, &CancelToken::new())))
}
