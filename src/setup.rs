use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{ReelError, Result};

/// Local working directory for models and logs
pub const REELGEN_DIR: &str = ".reelgen";

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub size_mb: f64,
}

impl ModelInfo {
    pub fn filename(&self) -> String {
        format!("ggml-{}.bin", self.name)
    }

    pub fn url(&self) -> String {
        format!("{}/{}", MODEL_BASE_URL, self.filename())
    }
}

pub static AVAILABLE_MODELS: [ModelInfo; 8] = [
    ModelInfo { name: "tiny", size_mb: 39.0 },
    ModelInfo { name: "tiny.en", size_mb: 39.0 },
    ModelInfo { name: "base", size_mb: 142.0 },
    ModelInfo { name: "base.en", size_mb: 142.0 },
    ModelInfo { name: "small", size_mb: 244.0 },
    ModelInfo { name: "small.en", size_mb: 244.0 },
    ModelInfo { name: "medium", size_mb: 769.0 },
    ModelInfo { name: "large-v3", size_mb: 1550.0 },
];

/// Transcriber model files under `.reelgen/models`
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(Path::new(REELGEN_DIR).join("models"))
    }
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn find(name: &str) -> Option<&'static ModelInfo> {
        AVAILABLE_MODELS.iter().find(|m| m.name == name)
    }

    /// Resolve a model name to the actual file path; paths are returned as-is.
    pub fn resolve_model_path(&self, model: &str) -> PathBuf {
        if model.contains('/') || model.contains('\\') || model.ends_with(".bin") {
            return PathBuf::from(model);
        }
        self.models_dir.join(format!("ggml-{}.bin", model))
    }

    pub fn is_installed(&self, model: &ModelInfo) -> bool {
        self.models_dir.join(model.filename()).exists()
    }

    /// Download `model` unless it is already present; returns its local path.
    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.models_dir.join(model.filename());
        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        async_fs::create_dir_all(&self.models_dir).await?;
        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let client = Client::builder()
            .user_agent(concat!("reelgen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut response = client.get(model.url()).send().await?;
        if !response.status().is_success() {
            return Err(ReelError::Config(format!(
                "Failed to download model {}: HTTP {}",
                model.name,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        // Written to a temp name first so a partial download is never picked up
        let temp_path = local_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;
        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}
