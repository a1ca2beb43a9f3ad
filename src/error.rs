use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DatamartError {
    #[error("invalid dataset id: {0}")]
    InvalidDatasetId(String),

    #[error("marketplace request failed: {0}")]
    ApiHttp(String),

    #[error("marketplace returned status {status}: {message}")]
    ApiStatus {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("marketplace rejected the request: {0}")]
    ApiFailure(String),

    #[error("failed to parse marketplace response: {0}")]
    ResponseParse(String),

    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not logged in")]
    NotAuthenticated,

    #[error("persisted session data is corrupt: {0}")]
    SessionCorrupt(String),

    #[error("rating must be an integer between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("review comment must be at least {min} characters, got {got}")]
    CommentTooShort { min: usize, got: usize },

    #[error("quality range must satisfy 0 <= min <= max <= 100, got {min}..{max}")]
    InvalidQualityRange { min: u8, max: u8 },

    #[error("page size must be greater than zero")]
    InvalidPageSize,

    #[error("missing config file datamart.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
