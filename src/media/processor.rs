use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{Compositor, CompositorSession};
use crate::config::MediaConfig;
use crate::error::{ReelError, Result};
use crate::progress::ProgressFn;

const STDERR_TAIL_LINES: usize = 20;

/// Compositor backed by the ffmpeg CLI
pub struct FfmpegCompositor {
    config: MediaConfig,
}

impl FfmpegCompositor {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn load(&self) -> Result<Box<dyn CompositorSession>> {
        self.check_availability().await?;
        let session = FfmpegSession::new(&self.config.binary_path)?;
        info!("Compositor session ready in {}", session.workspace()?.display());
        Ok(Box::new(session))
    }

    async fn check_availability(&self) -> Result<()> {
        let status = Command::new(&self.config.binary_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| ReelError::AdapterUnavailable {
                adapter: "compositor",
                reason: format!("Media processor not found: {}", e),
            })?;

        if status.success() {
            debug!("Media processor is available");
            Ok(())
        } else {
            Err(ReelError::AdapterUnavailable {
                adapter: "compositor",
                reason: "Media processor version check failed".to_string(),
            })
        }
    }
}

/// A private ffmpeg workspace. A run in flight is killed as soon as its
/// future is dropped; `terminate` removes the workspace.
pub struct FfmpegSession {
    binary_path: String,
    workspace: Option<TempDir>,
    progress: Option<ProgressFn>,
}

impl FfmpegSession {
    pub fn new(binary_path: &str) -> Result<Self> {
        let workspace = tempfile::Builder::new()
            .prefix("reelgen-compositor-")
            .tempdir()
            .map_err(|e| ReelError::Media(format!("Failed to create compositor workspace: {}", e)))?;

        Ok(Self {
            binary_path: binary_path.to_string(),
            workspace: Some(workspace),
            progress: None,
        })
    }

    pub fn workspace(&self) -> Result<&Path> {
        self.workspace
            .as_ref()
            .map(|dir| dir.path())
            .ok_or_else(|| ReelError::Media("Compositor session was terminated".to_string()))
    }

    /// Resolve a staged path inside the workspace, refusing anything that could escape it.
    fn resolve(&self, virtual_path: &str) -> Result<PathBuf> {
        let relative = Path::new(virtual_path);
        let is_plain = relative.components().next().is_some()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(ReelError::InvalidInput(format!(
                "Staged path must be relative and inside the workspace: {}",
                virtual_path
            )));
        }
        Ok(self.workspace()?.join(relative))
    }

    fn report(&self, ratio: f64) {
        if let Some(callback) = &self.progress {
            callback(ratio);
        }
    }
}

#[async_trait]
impl CompositorSession for FfmpegSession {
    async fn stage_file(&mut self, virtual_path: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(virtual_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!("Staged {} ({} bytes)", virtual_path, bytes.len());
        Ok(())
    }

    fn on_progress(&mut self, callback: ProgressFn) {
        self.progress = Some(callback);
    }

    async fn run(&mut self, args: &[String], output: &str) -> Result<Vec<u8>> {
        let output_path = self.resolve(output)?;
        let workspace = self.workspace()?.to_path_buf();
        debug!("Executing media processing command: {} {:?}", self.binary_path, args);

        let mut child = Command::new(&self.binary_path)
            .args(args)
            .current_dir(&workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReelError::AdapterUnavailable {
                adapter: "compositor",
                reason: format!("Failed to execute media processor: {}", e),
            })?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::Media("Failed to capture ffmpeg stderr".to_string()))?;

        let mut parser = ProgressParser::default();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut buffer = [0u8; 4096];
        let mut pending = String::new();

        self.report(0.0);
        loop {
            let read = stderr.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            pending.push_str(&String::from_utf8_lossy(&buffer[..read]));

            // ffmpeg rewrites its progress line with '\r'
            while let Some(pos) = pending.find(['\r', '\n']) {
                let line: String = pending.drain(..=pos).collect();
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                if let Some(ratio) = parser.feed(line) {
                    self.report(ratio);
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
            return Err(ReelError::Media(format!("Compositor exited with {}: {}", status, stderr)));
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| ReelError::Media(format!("Compositor produced no {}: {}", output, e)))?;
        self.report(1.0);
        info!("Composite finished: {} bytes", bytes.len());
        Ok(bytes)
    }

    async fn terminate(&mut self) -> Result<()> {
        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().to_path_buf();
            workspace
                .close()
                .map_err(|e| ReelError::Media(format!("Failed to remove {}: {}", path.display(), e)))?;
            debug!("Compositor workspace {} removed", path.display());
        }
        Ok(())
    }
}

/// Turns ffmpeg stderr into completion ratios.
///
/// The expected length is the shortest input `Duration:` seen, matching a
/// `-shortest` encode.
#[derive(Debug, Default)]
pub struct ProgressParser {
    total_seconds: Option<f64>,
}

impl ProgressParser {
    pub fn total_seconds(&self) -> Option<f64> {
        self.total_seconds
    }

    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if let Some(rest) = line.trim_start().strip_prefix("Duration:") {
            let value = rest.split(',').next()?.trim();
            if let Some(seconds) = parse_clock(value).filter(|s| *s > 0.0) {
                self.total_seconds = Some(self.total_seconds.map_or(seconds, |t| t.min(seconds)));
            }
            return None;
        }

        let time = line.split("time=").nth(1)?.split_whitespace().next()?;
        let seconds = parse_clock(time)?;
        let total = self.total_seconds?;
        Some((seconds / total).clamp(0.0, 1.0))
    }
}

/// Parse `HH:MM:SS.ms`
fn parse_clock(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// First `.ttf`/`.otf` file under `dir`, in file-name order.
pub fn find_font(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
                .unwrap_or(false)
        })
        .or_else(|| {
            warn!("No .ttf/.otf font found under {}", dir.display());
            None
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_progress_uses_shortest_duration() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.feed("frame=1 time=00:00:01.00 bitrate=N/A"), None);
        assert_eq!(parser.feed("  Duration: 00:00:20.00, start: 0.000000, bitrate: 1200 kb/s"), None);
        assert_eq!(parser.feed("  Duration: 00:00:10.00, start: 0.000000, bitrate: 384 kb/s"), None);
        assert_eq!(parser.total_seconds(), Some(10.0));

        assert_eq!(parser.feed("frame=  60 fps=30 q=28.0 size=256kB time=00:00:05.00 bitrate=1.0kbits/s speed=2x"), Some(0.5));
        assert_eq!(parser.feed("frame=  90 time=00:00:12.00 speed=2x"), Some(1.0));
        assert_eq!(parser.feed("frame=0 time=N/A speed=N/A"), None);
    }

    #[test]
    fn test_clock_parsing() {
        assert_eq!(parse_clock("01:02:03.50"), Some(3723.5));
        assert_eq!(parse_clock("12.5"), None);
    }

    #[tokio::test]
    async fn test_staging_stays_inside_workspace() {
        let mut session = FfmpegSession::new("ffmpeg").unwrap();
        session.stage_file("fonts/Inter.ttf", b"font").await.unwrap();
        let staged = session.workspace().unwrap().join("fonts/Inter.ttf");
        assert_eq!(std::fs::read(&staged).unwrap(), b"font");

        for bad in ["../escape.ass", "/etc/passwd", ""] {
            assert!(matches!(session.stage_file(bad, b"x").await, Err(ReelError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_terminate_removes_workspace_once() {
        let mut session = FfmpegSession::new("ffmpeg").unwrap();
        let path = session.workspace().unwrap().to_path_buf();
        session.terminate().await.unwrap();
        assert!(!path.exists());
        assert!(session.terminate().await.is_ok());
        assert!(session.stage_file("audio.wav", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let mut session = FfmpegSession::new("reelgen-no-such-ffmpeg").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.on_progress(Arc::new(move |r| sink.lock().unwrap().push(r)));

        let err = session.run(&["-version".to_string()], "output.mp4").await.unwrap_err();
        assert!(matches!(err, ReelError::AdapterUnavailable { adapter: "compositor", .. }));
        assert!(seen.lock().unwrap().is_empty());

        let compositor = FfmpegCompositor::new(MediaConfig {
            binary_path: "reelgen-no-such-ffmpeg".to_string(),
            ..crate::config::Config::default().media
        });
        assert!(compositor.load().await.is_err());
    }

    #[test]
    fn test_find_font() {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child("readme.txt").write_str("fonts").unwrap();
        assert_eq!(find_font(dir.path()), None);

        dir.child("b/Zed.OTF").write_binary(b"otf").unwrap();
        dir.child("a/Inter-Bold.ttf").write_binary(b"ttf").unwrap();
        assert_eq!(find_font(dir.path()), Some(dir.child("a/Inter-Bold.ttf").path().to_path_buf()));
    }
}
