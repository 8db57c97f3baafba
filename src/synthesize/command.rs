use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::{common::parse_synthesis_output, SpeechSynthesizer};
use crate::config::SynthesizerConfig;
use crate::error::{ReelError, Result};
use crate::model::{AudioBuffer, DeviceHint, Voice};
use crate::progress::ProgressFn;

const OUTPUT_FILE: &str = "speech.json";

/// Synthesizer that shells out to a configured text-to-speech engine.
///
/// The engine is started once per request and must write its samples as JSON
/// to the `{output}` path it is handed.
pub struct CommandSynthesizer {
    config: SynthesizerConfig,
}

impl CommandSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    /// Expand `{text}`, `{voice}`, `{device}` and `{output}` in the configured arguments.
    pub fn expand_args(&self, text: &str, voice: Voice, device: DeviceHint, output: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", voice.id())
                    .replace("{device}", device.as_str())
                    .replace("{output}", output)
                    .replace("{text}", text)
            })
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        device: DeviceHint,
        progress: ProgressFn,
    ) -> Result<AudioBuffer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReelError::InvalidInput("Cannot synthesize empty text".to_string()));
        }

        info!("Synthesizing {} characters with voice {} on {}", text.len(), voice, device.as_str());
        progress(0.0);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| ReelError::Synthesis(format!("Failed to create temp directory: {}", e)))?;
        let output_path = temp_dir.path().join(OUTPUT_FILE);
        let args = self.expand_args(text, voice, device, &output_path.to_string_lossy());
        debug!("Synthesizer command: {} {:?}", self.config.binary_path, args);

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ReelError::AdapterUnavailable {
                adapter: "synthesizer",
                reason: format!("Failed to start {}: {}", self.config.binary_path, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::Synthesis(format!("Synthesizer failed: {}", stderr.trim())));
        }
        progress(0.5);

        let json = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(|e| ReelError::Synthesis(format!("Failed to read synthesizer output: {}", e)))?;
        let buffer = parse_synthesis_output(&json, self.config.default_sample_rate)?;

        info!(
            "Synthesized {:.2}s of audio at {} Hz",
            buffer.duration_seconds(),
            buffer.sample_rate()
        );
        progress(1.0);
        Ok(buffer)
    }

    async fn check_availability(&self) -> Result<()> {
        which_binary(&self.config.binary_path, "synthesizer").await
    }
}

/// Probe a binary by starting it with `--help`.
pub(crate) async fn which_binary(binary: &str, adapter: &'static str) -> Result<()> {
    Command::new(binary)
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|_| ())
        .map_err(|e| ReelError::AdapterUnavailable {
            adapter,
            reason: format!("{} could not be started: {}", binary, e),
        })
}
