// Error taxonomy shared by every extraction operation

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamLensError {
    /// Malformed or unsupported input URL. Never reaches a backend.
    #[error("{0}")]
    InvalidUrl(String),

    /// Backend reported a geographic restriction
    #[error("{0}")]
    GeoRestriction(String),

    /// Video is private, deleted or otherwise unavailable
    #[error("{0}")]
    VideoUnavailable(String),

    /// Generic backend failure
    #[error("{0}")]
    Extraction(String),

    /// Speech-to-text failure
    #[error("{0}")]
    Transcription(String),

    /// Search input or backend failure
    #[error("{0}")]
    Search(String),

    /// Malformed batch or playlist input
    #[error("{0}")]
    Batch(String),

    /// Remote invocation exited non-zero or returned unusable output
    #[error("{0}")]
    RemoteExecution(String),

    /// Anything that fits none of the above
    #[error("{0}")]
    Unexpected(String),
}

impl StreamLensError {
    /// Wire name used in tool-call error envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "InvalidURL",
            Self::GeoRestriction(_) => "GeoRestriction",
            Self::VideoUnavailable(_) => "VideoUnavailable",
            Self::Extraction(_) => "ExtractionError",
            Self::Transcription(_) => "TranscriptionError",
            Self::Search(_) => "SearchError",
            Self::Batch(_) => "BatchError",
            Self::RemoteExecution(_) => "RemoteExecutionError",
            Self::Unexpected(_) => "UnexpectedError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidUrl(m)
            | Self::GeoRestriction(m)
            | Self::VideoUnavailable(m)
            | Self::Extraction(m)
            | Self::Transcription(m)
            | Self::Search(m)
            | Self::Batch(m)
            | Self::RemoteExecution(m)
            | Self::Unexpected(m) => m,
        }
    }

    /// Re-route a backend-originated failure through [`classify_backend_failure`].
    ///
    /// Only `Extraction` and `RemoteExecution` are backend-originated; every
    /// other kind is already final and passes through untouched.
    pub fn classified(self) -> Self {
        match self {
            Self::Extraction(msg) | Self::RemoteExecution(msg) => classify_backend_failure(msg),
            other => other,
        }
    }
}

/// Map a raw backend failure message to a typed error.
///
/// This is the only place that inspects backend error text. Replace it with
/// structured codes if the backend ever exposes them.
pub fn classify_backend_failure(message: impl Into<String>) -> StreamLensError {
    let message = message.into();
    let lower = message.to_lowercase();

    if lower.contains("geo") {
        return StreamLensError::GeoRestriction(message);
    }

    if lower.contains("private") || lower.contains("unavailable") {
        return StreamLensError::VideoUnavailable(message);
    }

    StreamLensError::Extraction(message)
}

impl From<serde_json::Error> for StreamLensError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unexpected(format!("JSON error: {}", e))
    }
}

impl From<std::io::Error> for StreamLensError {
    fn from(e: std::io::Error) -> Self {
        Self::Unexpected(format!("IO error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, StreamLensError>;
