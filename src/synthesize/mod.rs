// Speech synthesis adapters
//
// The pipeline only sees the `SpeechSynthesizer` trait and validated
// `AudioBuffer`s. Engine-specific output is parsed into the raw structures in
// `common` and checked there before it reaches the rest of the crate.
//
// To add a new engine:
// 1. Parse its output into `RawSynthesisOutput` (or map its own format to it)
// 2. Implement `SpeechSynthesizer`
// 3. Add it to `SynthesizerImplementation` and the factory

pub mod command;
pub mod common;

use async_trait::async_trait;

pub use common::*;
use crate::config::SynthesizerConfig;
use crate::error::Result;
use crate::model::{AudioBuffer, DeviceHint, Voice};
use crate::progress::ProgressFn;

/// Text-to-speech engine boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`; `progress` receives coarse load/generation ratios.
    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        device: DeviceHint,
        progress: ProgressFn,
    ) -> Result<AudioBuffer>;

    /// Check that the engine can be started
    async fn check_availability(&self) -> Result<()>;
}

/// Synthesizer implementation type
#[derive(Debug, Clone)]
pub enum SynthesizerImplementation {
    /// External engine invoked as a subprocess, exchanging JSON
    Command,
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    pub fn create_synthesizer(
        implementation: SynthesizerImplementation,
        config: SynthesizerConfig,
    ) -> Box<dyn SpeechSynthesizer> {
        match implementation {
            SynthesizerImplementation::Command => Box::new(command::CommandSynthesizer::new(config)),
        }
    }

    pub fn create_default(config: SynthesizerConfig) -> Box<dyn SpeechSynthesizer> {
        Self::create_synthesizer(SynthesizerImplementation::Command, config)
    }
}
