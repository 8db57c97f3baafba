// Media compositing architecture
//
// The pipeline drives an external encoder through two traits:
// - Compositor: loads the engine and hands out a session
// - CompositorSession: a private workspace where inputs are staged and the
//   command runs; terminating it releases the process and the workspace
//
// Commands are built in `commands`; the ffmpeg-backed implementation lives
// in `processor`.

pub mod commands;
pub mod processor;

use async_trait::async_trait;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::progress::ProgressFn;

/// Entry point of a media compositor engine
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Load the engine and open a session owned by one run
    async fn load(&self) -> Result<Box<dyn CompositorSession>>;

    /// Check if the engine is available
    async fn check_availability(&self) -> Result<()>;
}

/// One loaded compositor instance
#[async_trait]
pub trait CompositorSession: Send {
    /// Write `bytes` at `virtual_path`, relative to the session workspace
    async fn stage_file(&mut self, virtual_path: &str, bytes: &[u8]) -> Result<()>;

    /// Receive completion ratios in `[0, 1]` for subsequent runs
    fn on_progress(&mut self, callback: ProgressFn);

    /// Run the engine with `args` and return the bytes of the `output` file
    async fn run(&mut self, args: &[String], output: &str) -> Result<Vec<u8>>;

    /// Kill any running process and release the workspace
    async fn terminate(&mut self) -> Result<()>;
}

/// Factory for creating compositor instances
pub struct CompositorFactory;

impl CompositorFactory {
    /// Create the default compositor implementation (FFmpeg-based)
    pub fn create_compositor(config: MediaConfig) -> Box<dyn Compositor> {
        Box::new(processor::FfmpegCompositor::new(config))
    }
}
