/*!
 * # doctran - Document Translation with AI
 *
 * A Rust library for translating structured documents through an LLM while
 * preserving everything that is not text: table layout, formatting runs,
 * subtitle timing, JSON shape, HTML markup.
 *
 * ## Features
 *
 * - Fragment extraction and exact reassembly for Markdown, plain text,
 *   JSON, DOCX, XLSX, SRT, EPUB and HTML
 * - Size-bounded chunking that never splits a fragment
 * - Concurrent translation with per-call timeout, retry with backoff,
 *   partial-failure isolation and cooperative cancellation
 * - Optional glossary extraction pre-pass fed back into prompts
 * - Bounded in-memory conversion cache with single-flight misses
 * - Synchronous and asynchronous drivers over one workflow state machine
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: configuration structs for the pipeline
 * - `document`: the Document/Fragment data model
 * - `converter`: the external converter boundary and fingerprints
 * - `cache`: the bounded conversion cache
 * - `formats`: per-format fragment extraction and reassembly
 * - `chunker`: greedy size-bounded chunking
 * - `glossary`: the term-table model
 * - `translation`: chunk translation services:
 *   - `translation::core`: service, wire codec, token accounting
 *   - `translation::concurrent`: bounded-concurrency dispatch
 *   - `translation::glossary_agent`: glossary extraction pre-pass
 * - `providers`: LLM client implementations
 * - `workflow`: the per-document state machine and task runner
 * - `errors`: custom error types for the pipeline
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cache;
pub mod chunker;
pub mod converter;
pub mod document;
pub mod errors;
pub mod formats;
pub mod glossary;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod workflow;

// Re-export main types for easier usage
pub use app_config::{InsertMode, TranslationConfig};
pub use cache::ConversionCache;
pub use document::{Document, DocumentFormat, Fragment};
pub use errors::{AppError, ExportError, ProviderError, TranslationError};
pub use glossary::Glossary;
pub use translation::{CancelToken, TranslationService};
pub use workflow::task::{TaskRequest, TaskResponse, TaskStatus, run_task, run_task_blocking};
pub use workflow::{Workflow, WorkflowState};
