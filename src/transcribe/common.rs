use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ReelError, Result};
use crate::model::SubtitleChunk;

/// Service-agnostic chunk as reported by an engine, before validation.
///
/// The end may be missing for the final word of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    pub text: String,
    pub timestamp: (f64, Option<f64>),
}

impl RawChunk {
    pub fn new<S: Into<String>>(text: S, start: f64, end: Option<f64>) -> Self {
        Self {
            text: text.into(),
            timestamp: (start, end),
        }
    }
}

/// Trait for converting service-specific transcription formats to raw chunks
pub trait TranscriptionMapper<T> {
    fn to_raw_chunks(service_result: T) -> Vec<RawChunk>;
}

/// Turn raw engine chunks into the ordered chunk sequence the pipeline relies on.
///
/// Whitespace-only chunks are dropped and a missing end is filled with the
/// audio duration. Any negative, non-finite or inverted span fails the whole
/// response.
pub fn validate_chunks(raw: Vec<RawChunk>, audio_duration: f64) -> Result<Vec<SubtitleChunk>> {
    let mut chunks = Vec::with_capacity(raw.len());

    for (index, chunk) in raw.into_iter().enumerate() {
        if chunk.text.trim().is_empty() {
            debug!("Dropping blank chunk {}", index);
            continue;
        }

        let (start, end) = chunk.timestamp;
        let end = end.unwrap_or_else(|| audio_duration.max(start));

        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(ReelError::Transcription(format!(
                "Chunk {} ({:?}) has an invalid span [{}, {}]",
                index,
                chunk.text.trim(),
                start,
                end
            )));
        }

        chunks.push(SubtitleChunk::new(chunk.text, start, end));
    }

    // Stable, so engine order breaks ties
    chunks.sort_by(|a, b| a.start().total_cmp(&b.start()));
    Ok(chunks)
}

/// Span of audio transcribed in one engine call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptionWindow {
    pub start: f64,
    pub end: f64,
}

impl TranscriptionWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split `duration` seconds into windows of at most `max_chunk_seconds`, each
/// starting `max_chunk_seconds - overlap_seconds` after the previous one.
pub fn plan_windows(duration: f64, max_chunk_seconds: f64, overlap_seconds: f64) -> Vec<TranscriptionWindow> {
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let step = max_chunk_seconds - overlap_seconds;

    if !(max_chunk_seconds > 0.0) || !(step > 0.0) || duration <= max_chunk_seconds {
        return vec![TranscriptionWindow { start: 0.0, end: duration }];
    }

    let mut windows = Vec::new();
    for index in 0.. {
        let start = index as f64 * step;
        let end = (start + max_chunk_seconds).min(duration);
        windows.push(TranscriptionWindow { start, end });
        if end >= duration {
            break;
        }
    }
    windows
}

/// Merge per-window results so every overlap region contributes words from one window only.
///
/// Two neighbouring windows split their overlap at its midpoint; a chunk
/// belongs to the window whose share contains its start time.
pub fn merge_windows(results: Vec<(TranscriptionWindow, Vec<SubtitleChunk>)>) -> Vec<SubtitleChunk> {
    let cuts: Vec<f64> = results
        .windows(2)
        .map(|pair| (pair[0].0.end + pair[1].0.start) / 2.0)
        .collect();

    let mut merged = Vec::new();
    for (index, (_, chunks)) in results.into_iter().enumerate() {
        let lower = if index == 0 { f64::NEG_INFINITY } else { cuts[index - 1] };
        let upper = cuts.get(index).copied().unwrap_or(f64::INFINITY);
        let before = merged.len();
        merged.extend(chunks.into_iter().filter(|c| c.start() >= lower && c.start() < upper));
        debug!("Window {} contributed {} chunks", index, merged.len() - before);
    }

    merged.sort_by(|a, b| a.start().total_cmp(&b.start()));
    if merged.is_empty() {
        warn!("Transcription produced no chunks");
    }
    merged
}
