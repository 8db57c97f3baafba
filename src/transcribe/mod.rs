// Modular transcription architecture
//
// The pipeline talks to transcribers through the `Transcriber` trait and only
// ever receives validated `SubtitleChunk`s back:
// - WhisperCpp: whisper.cpp CLI, word-level output
//
// To add a new transcription service:
// 1. Create service-specific data structures for parsing its JSON
// 2. Implement `TranscriptionMapper` to turn them into `RawChunk`s
// 3. Run the raw chunks through `validate_chunks`
// 4. Add the service to `TranscriberImplementation` and the factory

pub mod common;
pub mod whisper_cpp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use common::*;
use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::model::SubtitleChunk;
use crate::progress::ProgressFn;

/// Encoded narration audio on disk, as handed to a transcriber
#[derive(Debug, Clone, PartialEq)]
pub struct AudioHandle {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// Timestamp granularity requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranscribeOptions {
    pub granularity: Granularity,
    /// Longest stretch of audio handed to the engine at once
    pub max_chunk_seconds: f64,
    /// Overlap between consecutive windows
    pub overlap_seconds: f64,
}

impl TranscribeOptions {
    pub fn from_config(config: &TranscriberConfig) -> Self {
        Self {
            granularity: Granularity::Word,
            max_chunk_seconds: config.max_chunk_seconds,
            overlap_seconds: config.overlap_seconds,
        }
    }
}

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio into start-ordered, validated chunks
    async fn transcribe(
        &self,
        audio: &AudioHandle,
        options: TranscribeOptions,
        progress: ProgressFn,
    ) -> Result<Vec<SubtitleChunk>>;

    /// Check that the engine and its model are present
    async fn check_availability(&self) -> Result<()>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    WhisperCpp,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on implementation type
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: TranscriberConfig,
    ) -> Box<dyn Transcriber> {
        match implementation {
            TranscriberImplementation::WhisperCpp => Box::new(whisper_cpp::WhisperCppTranscriber::new(config)),
        }
    }

    pub fn create_default(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Self::create_transcriber(TranscriberImplementation::WhisperCpp, config)
    }
}
