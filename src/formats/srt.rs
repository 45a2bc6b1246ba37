/*!
 * SubRip subtitle fragment extraction.
 *
 * Each cue's text is one fragment; cue numbering and timing are carried
 * verbatim through the plan and never reach the model. A cue whose timing
 * line cannot be parsed is kept as-is and marked non-translatable instead of
 * failing the document.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Document, FragmentContext, FragmentId};
use crate::errors::AppError;

use super::{
    Extraction, FormatAdapter, FragmentBuilder, ReinsertPolicy, ReinsertionPlan, TranslatedMap,
    plan_mismatch,
};

// SRT timing line: HH:MM:SS,mmm --> HH:MM:SS,mmm
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

/// One parsed subtitle cue
#[derive(Debug, Clone)]
pub struct SrtCue {
    /// Sequence number, as it appeared in the source
    pub seq_num: usize,
    /// Start time in milliseconds
    pub start_time_ms: u64,
    /// End time in milliseconds
    pub end_time_ms: u64,
    /// Cue text, possibly multi-line
    pub text: String,
    /// Fragment for the cue text
    pub fragment: Option<FragmentId>,
}

impl SrtCue {
    /// Format a millisecond timestamp as HH:MM:SS,mmm
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;
        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    fn render(&self, text: &str) -> String {
        format!(
            "{}\n{} --> {}\n{}",
            self.seq_num,
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms),
            text
        )
    }
}

fn timestamp_to_ms(h: &str, m: &str, s: &str, millis: &str) -> u64 {
    let h: u64 = h.parse().unwrap_or(0);
    let m: u64 = m.parse().unwrap_or(0);
    let s: u64 = s.parse().unwrap_or(0);
    let ms: u64 = millis.parse().unwrap_or(0);
    h * 3_600_000 + m * 60_000 + s * 1_000 + ms
}

/// Adapter for SubRip subtitles
pub struct SrtAdapter;

impl SrtAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        SrtAdapter
    }
}

impl Default for SrtAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for SrtAdapter {
    fn extract(&self, document: &Document) -> Result<Extraction, AppError> {
        let text = document
            .text()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let mut builder = FragmentBuilder::new();
        let mut cues: Vec<SrtCue> = Vec::new();

        // Cues are separated by blank lines
        for (block_index, block) in text.split("\n\n").enumerate() {
            let block = block.trim_matches('\n');
            if block.trim().is_empty() {
                continue;
            }

            let mut lines = block.lines();
            let seq_line = lines.next().unwrap_or("");
            let timing_line = lines.next().unwrap_or("");
            let body: Vec<&str> = lines.collect();

            let seq_num = seq_line.trim().parse::<usize>().ok();
            let captures = TIMESTAMP_REGEX.captures(timing_line);

            match (seq_num, captures) {
                (Some(seq_num), Some(caps)) => {
                    let start_time_ms = timestamp_to_ms(&caps[1], &caps[2], &caps[3], &caps[4]);
                    let end_time_ms = timestamp_to_ms(&caps[5], &caps[6], &caps[7], &caps[8]);
                    let cue_text = body.join("\n");
                    let id = builder.push(
                        cue_text.clone(),
                        !cue_text.trim().is_empty(),
                        FragmentContext::SrtCue {
                            index: block_index,
                            start_ms: start_time_ms,
                            end_ms: end_time_ms,
                        },
                    );
                    cues.push(SrtCue {
                        seq_num,
                        start_time_ms,
                        end_time_ms,
                        text: cue_text,
                        fragment: Some(id),
                    });
                }
                _ => {
                    // Malformed cue: keep the raw block, skip translation
                    log::warn!("Skipping malformed subtitle cue at block {}", block_index);
                    builder.push(
                        block.to_string(),
                        false,
                        FragmentContext::SrtCue {
                            index: block_index,
                            start_ms: 0,
                            end_ms: 0,
                        },
                    );
                    cues.push(SrtCue {
                        seq_num: 0,
                        start_time_ms: 0,
                        end_time_ms: 0,
                        text: block.to_string(),
                        fragment: None,
                    });
                }
            }
        }

        if cues.is_empty() {
            return Err(AppError::InvalidInput(
                "Subtitle file contains no cues".to_string(),
            ));
        }

        Ok(Extraction {
            fragments: builder.finish(),
            plan: ReinsertionPlan::Srt { cues },
        })
    }

    fn reassemble(
        &self,
        document: &Document,
        plan: &ReinsertionPlan,
        translated: &TranslatedMap,
        _policy: &ReinsertPolicy,
    ) -> Result<Document, AppError> {
        let ReinsertionPlan::Srt { cues } = plan else {
            return Err(plan_mismatch("srt"));
        };

        let mut rendered: Vec<String> = Vec::with_capacity(cues.len());
        for cue in cues {
            match cue.fragment.and_then(|id| translated.get(&id)) {
                Some(text) => rendered.push(cue.render(text)),
                None if cue.fragment.is_some() => rendered.push(cue.render(&cue.text)),
                // Malformed block, reproduced verbatim
                None => rendered.push(cue.text.clone()),
            }
        }

        let mut result = document.clone();
        result.content = format!("{}\n", rendered.join("\n\n")).into_bytes().into();
        Ok(result)
    }
}
