use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetTranslatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Row translation failed: {0}")]
    RowTranslation(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Failed to delete {key}: {reason}")]
    SweepObject { key: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Progress stream already terminated")]
    StreamClosed,

    #[error("Progress subscriber disconnected")]
    SubscriberGone,

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),
}

pub type Result<T> = std::result::Result<T, SheetTranslatorError>;
