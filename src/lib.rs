//! reelgen - script to short-form video
//!
//! Turns a short text script into narration audio, word-timed subtitles in
//! two encodings (a WebVTT preview track and an ASS burn-in document) and,
//! given a background video, a composited reel. Speech synthesis,
//! transcription and encoding are delegated to external engines.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod model;
pub mod preview;
pub mod progress;
pub mod setup;
pub mod subtitle;
pub mod synthesize;
pub mod transcribe;
pub mod wav;
pub mod workflow;
