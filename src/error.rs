use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot read PDF {path}: {reason}")]
    UnreadablePdf { path: PathBuf, reason: String },

    /// Per-chunk failure. Callers log it and move on to the next chunk.
    #[error("malformed question chunk: {0}")]
    MalformedChunk(String),

    #[error("no question markers found in extracted text")]
    NoChunks,

    #[error("no question records survived decoding")]
    NoRecords,

    #[error("invalid question JSON in {path}: {source}")]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
