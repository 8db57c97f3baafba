// Subtitle track generation
//
// One chunk sequence feeds two encodings that must stay in lockstep:
// - vtt: the preview track shown over the background video before compositing
// - ass: the burn-in document handed to the compositor
// Both share the timestamp and color codecs in `codec` and emit exactly one
// cue/dialogue line per chunk, in chunk order.

pub mod animation;
pub mod ass;
pub mod codec;
pub mod vtt;

use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

pub use ass::build_burn_in_track;
pub use vtt::build_preview_track;

use crate::error::Result;
use crate::model::{SubtitleChunk, SubtitleStyle, VideoSize};
use crate::transcribe::{validate_chunks, RawChunk};

/// Preview and burn-in renditions of the same chunk sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTracks {
    pub preview: String,
    pub burn_in: String,
}

impl SubtitleTracks {
    pub fn cue_count(&self) -> usize {
        self.preview.lines().filter(|line| line.contains(" --> ")).count()
    }

    pub fn dialogue_count(&self) -> usize {
        self.burn_in.lines().filter(|line| line.starts_with("Dialogue:")).count()
    }
}

/// Build both tracks from one chunk sequence.
pub fn build_tracks(chunks: &[SubtitleChunk], style: &SubtitleStyle, size: VideoSize) -> SubtitleTracks {
    let tracks = SubtitleTracks {
        preview: build_preview_track(chunks, style),
        burn_in: build_burn_in_track(chunks, style, size),
    };
    info!(
        "Built subtitle tracks: {} cues, {} dialogue lines",
        tracks.cue_count(),
        tracks.dialogue_count()
    );
    tracks
}

/// Read a chunk sequence saved as JSON (`[{ "text": ..., "timestamp": [start, end] }]`)
///
/// The file goes through the same checks as a transcriber response: blank
/// chunks are dropped, inverted or negative spans are rejected and the result
/// is ordered by start. A `null` end runs to the latest time in the file.
pub async fn load_chunks<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleChunk>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    let raw: Vec<RawChunk> = serde_json::from_str(&content)?;

    let horizon = raw
        .iter()
        .flat_map(|chunk| [Some(chunk.timestamp.0), chunk.timestamp.1])
        .flatten()
        .filter(|t| t.is_finite())
        .fold(0.0_f64, f64::max);

    let chunks = validate_chunks(raw, horizon)?;
    debug!("Loaded {} chunks from {}", chunks.len(), path.as_ref().display());
    Ok(chunks)
}
