// Extraction module - video metadata, transcripts and audio streams

pub mod backends;
pub mod batch;
pub mod cache;
pub mod config;
pub mod errors;
pub mod format_selector;
pub mod health;
pub mod models;
pub mod platforms;
pub mod service;
pub mod transcript;
pub mod utils;

pub use batch::BatchOrchestrator;
pub use cache::{Clock, SystemClock, TtlCache};
pub use config::{NetworkSettings, Settings};
pub use errors::{classify_backend_failure, Result, StreamLensError};
pub use format_selector::{AudioQuality, FormatSelector, RawFormat};
pub use models::{
    AudioStreamInfo, BatchResult, BatchResultItem, HealthStatus, PlaylistInfo, PlaylistVideo,
    SearchResult, TranscriptResult, TranscriptSegment, TranscriptionResult, VideoFormat,
    VideoInfo,
};
pub use platforms::{resolve, Platform, UrlValidationResult};
pub use service::ExtractionService;
pub use transcript::{parse_subtitles, segments_to_text};
