use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReelError, Result};
use crate::model::{DeviceHint, SubtitleStyle};

// Default values for settings added after the first config format
fn default_finalize_settle_ms() -> u64 {
    250
}

fn default_overlap_seconds() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub synthesizer: SynthesizerConfig,
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub style: SubtitleStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Path to the text-to-speech engine binary
    pub binary_path: String,
    /// Arguments passed to the engine. Placeholders: {text}, {voice}, {device}, {output}
    /// The engine must write `{ "audio": [f32...], "sampling_rate": n }` JSON to {output}
    pub args: Vec<String>,
    /// Compute device hint forwarded to the engine
    pub device: DeviceHint,
    /// Sample rate assumed when the engine does not report one
    pub default_sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to transcriber binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Model name (resolved under .reelgen/models) or path to a ggml model file
    pub model: String,
    /// Spoken language of the narration
    pub language: String,
    /// Longest stretch of audio transcribed in one engine call
    pub max_chunk_seconds: f64,
    /// Overlap between consecutive windows
    #[serde(default = "default_overlap_seconds")]
    pub overlap_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// x264 preset used for the burn-in encode
    pub preset: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Directory searched for a .ttf/.otf font to stage next to the subtitles
    pub fonts_dir: Option<PathBuf>,
    /// Additional encoding options appended before the output file
    /// Common options: ["-crf", "23", "-pix_fmt", "yuv420p"]
    pub extra_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Settle delay of the finalizing step
    #[serde(default = "default_finalize_settle_ms")]
    pub finalize_settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            finalize_settle_ms: default_finalize_settle_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            synthesizer: SynthesizerConfig {
                binary_path: "kokoro-tts".to_string(),
                args: vec![
                    "--text".to_string(),
                    "{text}".to_string(),
                    "--voice".to_string(),
                    "{voice}".to_string(),
                    "--device".to_string(),
                    "{device}".to_string(),
                    "--format".to_string(),
                    "json".to_string(),
                    "--output".to_string(),
                    "{output}".to_string(),
                ],
                device: DeviceHint::Gpu,
                default_sample_rate: 24000,
            },
            transcriber: TranscriberConfig {
                binary_path: "whisper-cli".to_string(),
                model: "small".to_string(),
                language: "en".to_string(),
                max_chunk_seconds: 30.0,
                overlap_seconds: default_overlap_seconds(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                preset: "ultrafast".to_string(),
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                fonts_dir: None,
                extra_options: vec![
                    // Example encoding options users can customize:
                    // "-crf".to_string(), "23".to_string(),         // Quality (0-51, lower = better quality)
                    // "-pix_fmt".to_string(), "yuv420p".to_string(), // Pixel format for compatibility
                ],
            },
            pipeline: PipelineConfig::default(),
            style: SubtitleStyle::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ReelError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReelError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.synthesizer.default_sample_rate == 0 {
            return Err(ReelError::Config("synthesizer.default_sample_rate must be positive".to_string()));
        }
        if !(self.transcriber.max_chunk_seconds > 0.0) {
            return Err(ReelError::Config("transcriber.max_chunk_seconds must be positive".to_string()));
        }
        if !(0.0..self.transcriber.max_chunk_seconds).contains(&self.transcriber.overlap_seconds) {
            return Err(ReelError::Config(
                "transcriber.overlap_seconds must be non-negative and shorter than max_chunk_seconds".to_string(),
            ));
        }
        self.style
            .validate()
            .map_err(|e| ReelError::Config(format!("Invalid [style]: {}", e)))
    }
}
