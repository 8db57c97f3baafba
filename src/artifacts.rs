use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{SubtitleChunk, VideoSize};
use crate::subtitle::SubtitleTracks;

pub const FINAL_VIDEO_NAME: &str = "generated-reel.mp4";
pub const AUDIO_NAME: &str = "generated-reel-audio.wav";
pub const PREVIEW_TRACK_NAME: &str = "generated-reel.vtt";
pub const BURN_IN_TRACK_NAME: &str = "generated-reel.ass";
pub const MANIFEST_NAME: &str = "manifest.json";

/// A named downloadable blob
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Download<'a> {
    pub file_name: &'static str,
    pub bytes: &'a [u8],
}

/// Everything one generation run produced
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub video_size: VideoSize,
    pub audio_wav: Vec<u8>,
    pub audio_duration_seconds: f64,
    pub chunks: Vec<SubtitleChunk>,
    pub tracks: SubtitleTracks,
    pub final_video: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    video_size: VideoSize,
    audio_duration_seconds: f64,
    primary: &'static str,
    files: Vec<&'static str>,
    chunks: &'a [SubtitleChunk],
}

impl GeneratedArtifacts {
    /// The final video when one was composited, otherwise the narration audio.
    pub fn primary_download(&self) -> Download<'_> {
        match &self.final_video {
            Some(video) => Download { file_name: FINAL_VIDEO_NAME, bytes: video },
            None => Download { file_name: AUDIO_NAME, bytes: &self.audio_wav },
        }
    }

    /// Write every artifact plus a manifest into `dir`; returns the written paths.
    pub async fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let mut files: Vec<(&'static str, &[u8])> = vec![
            (AUDIO_NAME, self.audio_wav.as_slice()),
            (PREVIEW_TRACK_NAME, self.tracks.preview.as_bytes()),
            (BURN_IN_TRACK_NAME, self.tracks.burn_in.as_bytes()),
        ];
        if let Some(video) = &self.final_video {
            files.push((FINAL_VIDEO_NAME, video.as_slice()));
        }

        let mut written = Vec::with_capacity(files.len() + 1);
        for (name, bytes) in &files {
            let path = dir.join(name);
            fs::write(&path, bytes).await?;
            written.push(path);
        }

        let manifest = Manifest {
            run_id: self.run_id,
            created_at: self.created_at,
            video_size: self.video_size,
            audio_duration_seconds: self.audio_duration_seconds,
            primary: self.primary_download().file_name,
            files: files.iter().map(|(name, _)| *name).collect(),
            chunks: &self.chunks,
        };
        let path = dir.join(MANIFEST_NAME);
        fs::write(&path, serde_json::to_vec_pretty(&manifest)?).await?;
        written.push(path);

        info!("Saved {} artifacts to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubtitleStyle;
    use crate::subtitle::build_tracks;

    fn artifacts(final_video: Option<Vec<u8>>) -> GeneratedArtifacts {
        let chunks = vec![SubtitleChunk::new(" Hello", 0.0, 0.5)];
        let tracks = build_tracks(&chunks, &SubtitleStyle::default(), VideoSize::default());
        GeneratedArtifacts {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            video_size: VideoSize::default(),
            audio_wav: crate::wav::encode_wav(&[0.0; 8], 16000),
            audio_duration_seconds: 0.5,
            chunks,
            tracks,
            final_video,
        }
    }

    #[test]
    fn test_primary_download_naming() {
        let audio_only = artifacts(None);
        assert_eq!(audio_only.primary_download().file_name, "generated-reel-audio.wav");
        assert_eq!(audio_only.primary_download().bytes.len(), 44 + 16);

        let with_video = artifacts(Some(vec![1, 2, 3]));
        assert_eq!(with_video.primary_download().file_name, "generated-reel.mp4");
        assert_eq!(with_video.primary_download().bytes, &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_save_to_writes_files_and_manifest() {
        let dir = assert_fs::TempDir::new().unwrap();
        let run = artifacts(None);
        let written = run.save_to(dir.path()).await.unwrap();

        assert_eq!(written.len(), 4);
        assert!(dir.path().join(AUDIO_NAME).exists());
        assert!(!dir.path().join(FINAL_VIDEO_NAME).exists());

        let vtt = std::fs::read_to_string(dir.path().join(PREVIEW_TRACK_NAME)).unwrap();
        assert!(vtt.starts_with("WEBVTT"));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap()).unwrap();
        assert_eq!(manifest["run_id"], run.run_id.to_string());
        assert_eq!(manifest["primary"], AUDIO_NAME);
        assert_eq!(manifest["video_size"], "9:16");
        assert_eq!(manifest["chunks"][0]["timestamp"][1], 0.5);
    }

    #[tokio::test]
    async fn test_save_to_includes_final_video() {
        let dir = tempfile::tempdir().unwrap();
        artifacts(Some(vec![0; 4])).save_to(dir.path()).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join(FINAL_VIDEO_NAME)).unwrap(), vec![0; 4]);
    }
}
