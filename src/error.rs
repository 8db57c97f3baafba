use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine behind an adapter could not be started or its model loaded.
    #[error("{adapter} unavailable: {reason}")]
    AdapterUnavailable { adapter: &'static str, reason: String },

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("A generation run is already in progress")]
    Busy,

    #[error("Generation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ReelError>;
