// Result records produced by the extraction service

use serde::{Deserialize, Serialize};

use super::platforms::Platform;

/// One encoding option offered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    /// Resolution string (e.g., "1920x1080")
    pub resolution: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub fps: Option<f64>,
    /// Video codec (avc1, vp9, av01)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus)
    pub acodec: Option<String>,
    /// File size in bytes
    pub filesize: Option<u64>,
    /// Total bitrate in kbps
    pub bitrate: Option<f64>,
    /// Direct media URL
    pub stream_url: Option<String>,
    /// Format note (e.g., "1080p", "audio only")
    pub note: Option<String>,
}

/// Aggregated metadata for a single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub webpage_url: String,
    pub platform: Platform,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub duration_seconds: Option<u64>,
    pub duration_string: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    /// Upload date as reported by the backend (YYYYMMDD)
    pub upload_date: Option<String>,
    pub best_quality_video: Option<VideoFormat>,
    pub smallest_video: Option<VideoFormat>,
    pub audio_only: Option<VideoFormat>,
    /// Caption excerpt or tag/description summary, at most 2000 characters
    pub subtitles_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub video_id: String,
    pub language: String,
    pub is_auto_generated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<TranscriptSegment>,
    pub full_text: String,
}

/// Direct audio stream reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub video_id: String,
    pub title: String,
    pub stream_url: String,
    pub format_id: String,
    pub ext: String,
    pub acodec: Option<String>,
    /// Audio bitrate in kbps
    pub bitrate: Option<f64>,
    pub filesize: Option<u64>,
}

/// Speech-to-text output for a whole video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub model: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub duration_seconds: Option<u64>,
    pub channel: Option<String>,
    pub view_count: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub upload_date: Option<String>,
}

/// Lightweight playlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub duration_seconds: Option<u64>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub title: String,
    pub playlist_id: String,
    pub channel: Option<String>,
    pub video_count: Option<u64>,
    pub videos: Vec<PlaylistVideo>,
}

/// Outcome for one URL of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultItem {
    pub url: String,
    pub success: bool,
    pub data: Option<VideoInfo>,
    pub error: Option<String>,
}

impl BatchResultItem {
    pub fn succeeded(url: impl Into<String>, info: VideoInfo) -> Self {
        Self {
            url: url.into(),
            success: true,
            data: Some(info),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregated batch outcome. `results` follows input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchResultItem>,
}

impl BatchResult {
    pub fn from_items(results: Vec<BatchResultItem>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// Environment readiness report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ytdlp_available: bool,
    pub ytdlp_version: Option<String>,
    pub ffmpeg_available: bool,
    pub ffmpeg_path: Option<String>,
    pub ffmpeg_message: String,
    pub whisper_available: bool,
    pub whisper_model: String,
    pub remote_host: Option<String>,
}
