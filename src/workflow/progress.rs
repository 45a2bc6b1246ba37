/*!
 * Streaming progress events.
 *
 * A workflow optionally carries an unbounded channel sender; each pipeline
 * step emits one event as it happens, so machine callers can surface live
 * progress without polling. A missing or closed receiver never affects the
 * pipeline.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Pipeline step a progress event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// External conversion (through the cache)
    Convert,
    /// Fragment extraction and chunking
    Chunk,
    /// Concurrent chunk translation
    Translate,
    /// Artifact writing
    Export,
}

/// One progress event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    /// Which step the event belongs to
    pub step: StepKind,
    /// Human-readable detail ("12 chunks", "cache hit")
    pub detail: String,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
}

/// Sending half of a progress channel
pub type ProgressSender = mpsc::UnboundedSender<StepEvent>;

/// Receiving half of a progress channel
pub type ProgressReceiver = mpsc::UnboundedReceiver<StepEvent>;

/// Create a progress channel pair
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Emit one event, ignoring a closed receiver
pub(crate) fn emit(sender: Option<&ProgressSender>, step: StepKind, detail: impl Into<String>) {
    if let Some(sender) = sender {
        let _ = sender.send(StepEvent {
            step,
            detail: detail.into(),
            timestamp: Utc::now(),
        });
    }
}
