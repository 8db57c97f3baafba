use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::{
    common::{merge_windows, plan_windows, validate_chunks, RawChunk, TranscriptionMapper, TranscriptionWindow},
    AudioHandle, TranscribeOptions, Transcriber,
};
use crate::config::TranscriberConfig;
use crate::error::{ReelError, Result};
use crate::model::SubtitleChunk;
use crate::progress::ProgressFn;
use crate::setup::ModelStore;

/// Whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds from the start of the file
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

/// Mapper for Whisper.cpp format to raw chunks
pub struct WhisperCppMapper;

impl TranscriptionMapper<WhisperCppOutput> for WhisperCppMapper {
    fn to_raw_chunks(whisper_output: WhisperCppOutput) -> Vec<RawChunk> {
        whisper_output
            .transcription
            .into_iter()
            .filter(|seg| !is_non_speech_marker(&seg.text))
            .map(|seg| {
                RawChunk::new(
                    seg.text,
                    seg.offsets.from as f64 / 1000.0,
                    Some(seg.offsets.to as f64 / 1000.0),
                )
            })
            .collect()
    }
}

/// Markers such as `[BLANK_AUDIO]` or `[Music]` that whisper emits for silence
fn is_non_speech_marker(text: &str) -> bool {
    let text = text.trim();
    text.len() > 1 && text.starts_with('[') && text.ends_with(']')
}

/// Word-level transcriber backed by the whisper.cpp CLI
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
    models: ModelStore,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self {
            config,
            models: ModelStore::default(),
        }
    }

    fn model_path(&self) -> PathBuf {
        self.models.resolve_model_path(&self.config.model)
    }

    /// Arguments for transcribing one window of `audio_path` into `output_base`.json
    pub fn window_args(&self, model: &Path, audio_path: &Path, window: TranscriptionWindow, output_base: &Path) -> Vec<String> {
        vec![
            "-m".to_string(),
            model.to_string_lossy().to_string(),
            "-f".to_string(),
            audio_path.to_string_lossy().to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            // one word per segment
            "-ml".to_string(),
            "1".to_string(),
            "-sow".to_string(),
            "-ot".to_string(),
            ((window.start * 1000.0).round() as i64).to_string(),
            "-d".to_string(),
            ((window.duration() * 1000.0).round() as i64).to_string(),
            "-np".to_string(),
            "-oj".to_string(),
            "-of".to_string(),
            output_base.to_string_lossy().to_string(),
        ]
    }

    async fn transcribe_window(
        &self,
        model: &Path,
        audio: &AudioHandle,
        window: TranscriptionWindow,
        output_base: &Path,
    ) -> Result<Vec<SubtitleChunk>> {
        let args = self.window_args(model, &audio.path, window, output_base);
        debug!("Whisper command: {} {:?}", self.config.binary_path, args);

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ReelError::AdapterUnavailable {
                adapter: "transcriber",
                reason: format!("Failed to start {}: {}", self.config.binary_path, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::Transcription(format!("Whisper failed: {}", stderr.trim())));
        }

        let json_file = output_base.with_extension("json");
        let json_content = tokio::fs::read_to_string(&json_file)
            .await
            .map_err(|e| ReelError::Transcription(format!("Failed to read output: {}", e)))?;

        let chunks = parse_whisper_output(&json_content, audio.duration_seconds)?;
        debug!("Window {:.1}s-{:.1}s: {} chunks", window.start, window.end, chunks.len());
        Ok(chunks)
    }
}

/// Parse whisper.cpp JSON and validate it into chunks.
pub fn parse_whisper_output(json: &str, audio_duration: f64) -> Result<Vec<SubtitleChunk>> {
    let whisper_output: WhisperCppOutput = serde_json::from_str(json)
        .map_err(|e| ReelError::Transcription(format!("Failed to parse Whisper.cpp JSON: {}", e)))?;
    validate_chunks(WhisperCppMapper::to_raw_chunks(whisper_output), audio_duration)
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(
        &self,
        audio: &AudioHandle,
        options: TranscribeOptions,
        progress: ProgressFn,
    ) -> Result<Vec<SubtitleChunk>> {
        let model = self.model_path();
        if !model.exists() {
            return Err(ReelError::AdapterUnavailable {
                adapter: "transcriber",
                reason: format!(
                    "Model not found at {} (run `reelgen models --download {}`)",
                    model.display(),
                    self.config.model
                ),
            });
        }

        let windows = plan_windows(audio.duration_seconds, options.max_chunk_seconds, options.overlap_seconds);
        info!(
            "Transcribing {:.2}s of audio in {} window(s) with {}",
            audio.duration_seconds,
            windows.len(),
            model.display()
        );
        progress(0.0);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| ReelError::Transcription(format!("Failed to create temp directory: {}", e)))?;

        let total = windows.len();
        let mut results = Vec::with_capacity(total);
        for (index, window) in windows.into_iter().enumerate() {
            let output_base = temp_dir.path().join(format!("window-{}", index));
            let chunks = self.transcribe_window(&model, audio, window, &output_base).await?;
            results.push((window, chunks));
            progress((index + 1) as f64 / total as f64);
        }

        let chunks = merge_windows(results);
        info!("Transcription produced {} chunks", chunks.len());
        Ok(chunks)
    }

    async fn check_availability(&self) -> Result<()> {
        let model = self.model_path();
        if !model.exists() {
            return Err(ReelError::AdapterUnavailable {
                adapter: "transcriber",
                reason: format!("Model not found at {}", model.display()),
            });
        }
        crate::synthesize::command::which_binary(&self.config.binary_path, "transcriber").await
    }
}
