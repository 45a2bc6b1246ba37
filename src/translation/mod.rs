/*!
 * AI-powered chunk translation.
 *
 * The translation stage takes the chunker's output and drives it through an
 * LLM provider:
 * - `translation::core`: the TranslationService, chunk wire codec and token
 *   usage accounting
 * - `translation::concurrent`: bounded-concurrency dispatch with per-call
 *   timeout, retry with backoff, and cooperative cancellation
 * - `translation::glossary_agent`: optional pre-pass extracting a term table
 * - `translation::prompts`: system prompt builders
 */

pub mod concurrent;
pub mod core;
pub mod glossary_agent;
pub mod prompts;

pub use concurrent::{CancelToken, ConcurrentTranslator, JobOutcome, TranslationJob};
pub use core::{TokenUsageStats, TranslationService};
pub use glossary_agent::GlossaryAgent;
