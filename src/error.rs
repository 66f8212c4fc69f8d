use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO Error: {details} (Path: {path:?})")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>, // Path associated with the IO error, if any
        details: String,       // Contextual information about the operation
    },
    #[error("Invalid input path: {0}")]
    InvalidInput(String),
    #[error("Permissions error accessing {path:?}: {details}")]
    PermissionsError { path: PathBuf, details: String },
    #[error("No mergeable files found under {0}")]
    NoMergeableFiles(PathBuf),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Office package error: {0}")]
    OfficePackage(#[from] zip::result::ZipError),
    #[error("Merge failed: {0}")]
    MergeFailed(String),
    #[error("Failed to create or persist temporary file for atomic write at {path:?}: {details}")]
    AtomicWriteError { path: PathBuf, details: String },
    /// For channel send errors in multi-threaded scenarios
    #[allow(dead_code)]
    #[error("Channel send error: {0}")]
    ChannelSend(String),
}

// Helper constructor for detailed IO errors
impl AppError {
    pub fn new_io_error(source: std::io::Error, path: Option<PathBuf>, details: String) -> Self {
        AppError::Io { source, path, details }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
