/*!
 * Concurrent chunk dispatch.
 *
 * Chunks go out over a bounded pool of in-flight LLM calls: a finished slot
 * is refilled immediately from the pending queue, so one slow chunk never
 * stalls the others. Each job retries with exponential backoff and jitter up
 * to the configured attempt limit, and a failed job degrades its fragments
 * to pass-through instead of aborting the document. Results are re-indexed
 * to chunk order, so the output sequence never depends on completion order.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use tokio::sync::Semaphore;

use crate::chunker::Chunk;
use crate::errors::{ProviderError, TranslationError};
use crate::formats::TranslatedMap;
use crate::glossary::Glossary;
use crate::providers::TokenUsage;

use super::core::{TokenUsageStats, TranslationService, align_chunk, decode_chunk, encode_chunk};

/// Cooperative cancellation handle for a translate stage.
///
/// Cancellation is observed between dispatches: pending chunks are not sent
/// after the token trips, in-flight calls run to completion (or time out),
/// and finished work is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-canceled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been tripped
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Spaces dispatches to honor a requests-per-minute limit.
///
/// Workers take a slot under the lock and sleep until their slot arrives;
/// slots are handed out strictly `spacing` apart.
struct RateGate {
    next: tokio::sync::Mutex<tokio::time::Instant>,
    spacing: Duration,
}

impl RateGate {
    fn new(requests_per_minute: u32) -> Self {
        RateGate {
            next: tokio::sync::Mutex::new(tokio::time::Instant::now()),
            spacing: Duration::from_millis(60_000 / u64::from(requests_per_minute.max(1))),
        }
    }

    async fn wait(&self) {
        let slot = {
            let mut next = self.next.lock().await;
            let now = tokio::time::Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.spacing;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Terminal outcome of one chunk job
#[derive(Debug)]
pub enum JobOutcome {
    /// The provider returned a usable response
    Succeeded {
        /// Raw response text, still to be decoded and aligned
        raw: String,
    },
    /// Retries exhausted, chunk canceled, or response unusable
    Failed {
        /// What went wrong
        error: TranslationError,
    },
}

/// One submitted chunk and what became of it
#[derive(Debug)]
pub struct TranslationJob {
    /// Index of the originating chunk
    pub chunk_index: usize,
    /// Attempts actually made
    pub attempts: u32,
    /// Wall time from dispatch to terminal state
    pub elapsed: Duration,
    /// Terminal state
    pub outcome: JobOutcome,
    /// Token counters accumulated over all attempts of this job
    pub usage: TokenUsage,
}

impl TranslationJob {
    /// Whether the job reached `Succeeded`
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, JobOutcome::Succeeded { .. })
    }
}

/// Dispatcher for translating chunk sequences with bounded parallelism
pub struct ConcurrentTranslator {
    service: TranslationService,
}

impl ConcurrentTranslator {
    /// Create a dispatcher over a translation service
    pub fn new(service: TranslationService) -> Self {
        Self { service }
    }

    /// Translate all chunks, preserving input order in the result.
    ///
    /// Returns one terminal job per chunk plus aggregate token statistics.
    pub async fn translate_chunks(
        &self,
        chunks: &[Chunk],
        glossary: Option<&Glossary>,
        cancel: &CancelToken,
    ) -> (Vec<TranslationJob>, TokenUsageStats) {
        let mut stats = TokenUsageStats::for_model(self.service.config.provider.model.clone());
        if chunks.is_empty() {
            return (Vec::new(), stats);
        }

        let concurrent = self.service.config.concurrent_requests.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrent));
        let rate_gate = self.service.config.rate_limit.map(|rpm| Arc::new(RateGate::new(rpm)));
        info!(
            "Dispatching {} chunks with {} concurrent requests",
            chunks.len(),
            concurrent
        );

        let results = stream::iter(chunks.iter())
            .map(|chunk| {
                let service = self.service.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                let glossary = glossary.cloned();
                let rate_gate = rate_gate.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return TranslationJob {
                                chunk_index: chunk.index,
                                attempts: 0,
                                elapsed: Duration::ZERO,
                                outcome: JobOutcome::Failed {
                                    error: TranslationError::Canceled,
                                },
                                usage: TokenUsage::default(),
                            };
                        }
                    };
                    run_job(&service, chunk, glossary.as_ref(), rate_gate.as_deref(), &cancel).await
                }
            })
            .buffer_unordered(concurrent)
            .collect::<Vec<_>>()
            .await;

        // Completion order is arbitrary; restore chunk order
        let mut jobs = results;
        jobs.sort_by_key(|job| job.chunk_index);

        for job in &jobs {
            stats.record(&job.usage, job.elapsed);
        }
        let failed = jobs.iter().filter(|j| !j.succeeded()).count();
        if failed > 0 {
            warn!("{} of {} chunks failed translation", failed, jobs.len());
        }
        (jobs, stats)
    }

    /// Decode and align successful jobs onto fragment ids.
    ///
    /// Failed chunks contribute nothing; their fragments fall back to the
    /// original text at reassembly. Returns the map plus one error record
    /// per failed or malformed chunk.
    pub fn collect_translations(
        &self,
        chunks: &[Chunk],
        jobs: &[TranslationJob],
    ) -> (TranslatedMap, Vec<String>) {
        let mut translated = TranslatedMap::new();
        let mut errors = Vec::new();

        for job in jobs {
            let Some(chunk) = chunks.get(job.chunk_index) else {
                continue;
            };
            match &job.outcome {
                JobOutcome::Succeeded { raw } => match decode_chunk(raw) {
                    Ok(decoded) => {
                        let mismatch = align_chunk(chunk, &decoded, &mut translated);
                        if mismatch {
                            errors.push(format!(
                                "chunk {}: response shape deviated, aligned best-effort",
                                chunk.index
                            ));
                        }
                    }
                    Err(e) => {
                        errors.push(format!("chunk {}: {}", chunk.index, e));
                    }
                },
                JobOutcome::Failed { error } => {
                    errors.push(format!("chunk {}: {}", chunk.index, error));
                }
            }
        }

        (translated, errors)
    }
}

/// Drive one chunk to a terminal state: retry loop with backoff and jitter
async fn run_job(
    service: &TranslationService,
    chunk: &Chunk,
    glossary: Option<&Glossary>,
    rate_gate: Option<&RateGate>,
    cancel: &CancelToken,
) -> TranslationJob {
    let start = Instant::now();

    if cancel.is_canceled() {
        return TranslationJob {
            chunk_index: chunk.index,
            attempts: 0,
            elapsed: Duration::ZERO,
            outcome: JobOutcome::Failed {
                error: TranslationError::Canceled,
            },
            usage: TokenUsage::default(),
        };
    }

    let payload = encode_chunk(chunk);
    let max_attempts = service.config.retry_count.max(1);
    let backoff_base_ms = service.config.retry_backoff_ms;
    let mut usage = TokenUsage::default();
    let mut attempts = 0u32;
    let mut last_error: Option<ProviderError> = None;

    while attempts < max_attempts {
        attempts += 1;
        if let Some(gate) = rate_gate {
            gate.wait().await;
        }
        debug!(
            "Chunk {} attempt {}/{}",
            chunk.index, attempts, max_attempts
        );
        match service.call_chunk(&payload, glossary).await {
            Ok(response) => {
                usage.add(&response.usage);
                return TranslationJob {
                    chunk_index: chunk.index,
                    attempts,
                    elapsed: start.elapsed(),
                    outcome: JobOutcome::Succeeded {
                        raw: response.text,
                    },
                    usage,
                };
            }
            Err(error) => {
                let retryable = error.is_retryable();
                warn!(
                    "Chunk {} attempt {}/{} failed: {}",
                    chunk.index, attempts, max_attempts, error
                );
                last_error = Some(error);
                if !retryable || attempts >= max_attempts {
                    break;
                }
                // Exponential backoff with uniform jitter
                let backoff_ms = backoff_base_ms.saturating_mul(1u64 << (attempts - 1).min(16));
                let jitter_ms = if backoff_base_ms > 0 {
                    rand::rng().random_range(0..=backoff_base_ms / 2)
                } else {
                    0
                };
                tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
            }
        }
    }

    let error = last_error.unwrap_or_else(|| {
        ProviderError::RequestFailed("no attempt was made".to_string())
    });
    TranslationJob {
        chunk_index: chunk.index,
        attempts,
        elapsed: start.elapsed(),
        outcome: JobOutcome::Failed {
            error: TranslationError::RetriesExhausted {
                attempts,
                source: error,
            },
        },
        usage,
    }
}
