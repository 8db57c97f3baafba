use serde::{Deserialize, Serialize};

use crate::error::{ReelError, Result};
use crate::model::AudioBuffer;

/// Output written by a synthesis engine, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSynthesisOutput {
    /// Mono float samples in [-1, 1]
    pub audio: Vec<f32>,
    #[serde(default, alias = "sample_rate")]
    pub sampling_rate: Option<u32>,
}

impl RawSynthesisOutput {
    /// Validate into an [`AudioBuffer`], filling in `default_rate` when the engine gave none.
    pub fn into_audio_buffer(self, default_rate: u32) -> Result<AudioBuffer> {
        if self.audio.is_empty() {
            return Err(ReelError::Synthesis("Engine returned no audio samples".to_string()));
        }

        if let Some(index) = self.audio.iter().position(|s| !s.is_finite()) {
            return Err(ReelError::Synthesis(format!(
                "Engine returned a non-finite sample at index {}",
                index
            )));
        }

        let sample_rate = match self.sampling_rate {
            Some(0) => {
                return Err(ReelError::Synthesis("Engine reported a zero sample rate".to_string()));
            }
            Some(rate) => rate,
            None => default_rate,
        };

        AudioBuffer::new(self.audio, sample_rate)
            .map_err(|e| ReelError::Synthesis(e.to_string()))
    }
}

/// Parse and validate engine JSON in one step.
pub fn parse_synthesis_output(json: &str, default_rate: u32) -> Result<AudioBuffer> {
    let raw: RawSynthesisOutput = serde_json::from_str(json)
        .map_err(|e| ReelError::Synthesis(format!("Failed to parse synthesis output: {}", e)))?;
    raw.into_audio_buffer(default_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_output() {
        let buffer = parse_synthesis_output(r#"{"audio":[0.0,0.5,-0.5],"sampling_rate":22050}"#, 24000).unwrap();
        assert_eq!(buffer.samples(), &[0.0, 0.5, -0.5]);
        assert_eq!(buffer.sample_rate(), 22050);
    }

    #[test]
    fn test_missing_rate_uses_default() {
        let buffer = parse_synthesis_output(r#"{"audio":[0.1]}"#, 24000).unwrap();
        assert_eq!(buffer.sample_rate(), 24000);
    }

    #[test]
    fn test_malformed_outputs_are_rejected() {
        assert!(parse_synthesis_output(r#"{"audio":[]}"#, 24000).is_err());
        assert!(parse_synthesis_output(r#"{"audio":[0.1],"sampling_rate":0}"#, 24000).is_err());
        assert!(parse_synthesis_output(r#"{"samples":[0.1]}"#, 24000).is_err());
        assert!(parse_synthesis_output("not json", 24000).is_err());

        let raw = RawSynthesisOutput { audio: vec![0.1, f32::NAN], sampling_rate: None };
        assert!(matches!(raw.into_audio_buffer(24000), Err(ReelError::Synthesis(_))));
    }
}
