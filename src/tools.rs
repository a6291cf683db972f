// Tool-call surface
//
// Every operation answers with a JSON string: the result record on success,
// `{"error": <kind>, "message": <text>}` otherwise. Nothing here returns Err.

use serde::Serialize;
use serde_json::{json, Value};

use crate::extraction::batch::{BatchOrchestrator, DEFAULT_PLAYLIST_VIDEOS};
use crate::extraction::service::DEFAULT_LANGUAGE;
use crate::extraction::{AudioQuality, ExtractionService, Result, StreamLensError};

pub const DEFAULT_SEARCH_RESULTS: i64 = 5;

/// Tool names accepted by [`ToolSurface::call`]
pub const TOOL_NAMES: [&str; 8] = [
    "get_video_info",
    "get_transcript",
    "search_videos",
    "get_audio_url",
    "get_playlist_info",
    "batch_get_info",
    "transcribe",
    "health_check",
];

/// Shape of the transcript tool's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Segments,
    Text,
}

impl std::str::FromStr for TranscriptFormat {
    type Err = StreamLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "segments" => Ok(Self::Segments),
            "text" => Ok(Self::Text),
            _ => Err(StreamLensError::Extraction(
                "format must be 'segments' or 'text'".to_string(),
            )),
        }
    }
}

pub struct ToolSurface {
    service: ExtractionService,
}

impl ToolSurface {
    pub fn new(service: ExtractionService) -> Self {
        Self { service }
    }

    pub async fn get_video_info(&self, url: &str) -> String {
        envelope(self.service.get_info(url).await)
    }

    pub async fn get_transcript(&self, url: &str, lang: &str, format: &str) -> String {
        let format = match format.parse::<TranscriptFormat>() {
            Ok(f) => f,
            Err(e) => return error_envelope(&e),
        };

        let result = self.service.get_transcript(url, lang).await.map(|mut transcript| {
            if format == TranscriptFormat::Text {
                transcript.segments.clear();
            }
            transcript
        });
        envelope(result)
    }

    pub async fn search_videos(&self, query: &str, max_results: i64) -> String {
        envelope(self.service.search_videos(query, max_results).await)
    }

    pub async fn get_audio_url(&self, url: &str, quality: &str) -> String {
        let quality = match quality.parse::<AudioQuality>() {
            Ok(q) => q,
            Err(e) => return error_envelope(&e),
        };
        envelope(self.service.get_audio_url(url, quality).await)
    }

    pub async fn get_playlist_info(&self, url: &str, max_videos: i64) -> String {
        let batch = BatchOrchestrator::new(&self.service);
        envelope(batch.get_playlist_info(url, max_videos).await)
    }

    pub async fn batch_get_info(&self, urls: &[String]) -> String {
        let batch = BatchOrchestrator::new(&self.service);
        envelope(batch.batch_get_info(urls).await)
    }

    pub async fn transcribe(&self, url: &str, model: Option<&str>) -> String {
        envelope(self.service.transcribe(url, model).await)
    }

    pub async fn health_check(&self) -> String {
        envelope(Ok(self.service.health_check().await))
    }

    /// Dispatch a tool call by name with JSON arguments
    pub async fn call(&self, name: &str, args: &Value) -> String {
        tracing::debug!("[Tools] call {} {}", name, args);

        match name {
            "get_video_info" => self.get_video_info(str_arg(args, "url", "")).await,
            "get_transcript" => {
                self.get_transcript(
                    str_arg(args, "url", ""),
                    str_arg(args, "lang", DEFAULT_LANGUAGE),
                    str_arg(args, "format", "segments"),
                )
                .await
            }
            "search_videos" => match int_arg(args, "max_results", DEFAULT_SEARCH_RESULTS) {
                Some(n) => self.search_videos(str_arg(args, "query", ""), n).await,
                None => error_envelope(&StreamLensError::Search(
                    "max_results must be an integer between 1 and 20".to_string(),
                )),
            },
            "get_audio_url" => {
                self.get_audio_url(str_arg(args, "url", ""), str_arg(args, "quality", "best"))
                    .await
            }
            "get_playlist_info" => match int_arg(args, "max_videos", DEFAULT_PLAYLIST_VIDEOS) {
                Some(n) => self.get_playlist_info(str_arg(args, "url", ""), n).await,
                None => error_envelope(&StreamLensError::Batch(
                    "max_videos must be an integer between 1 and 50".to_string(),
                )),
            },
            "batch_get_info" => match string_list(&args["urls"]) {
                Some(urls) => self.batch_get_info(&urls).await,
                None => error_envelope(&StreamLensError::Batch(
                    "urls must be a non-empty list".to_string(),
                )),
            },
            "transcribe" => {
                let model = args["model"].as_str();
                self.transcribe(str_arg(args, "url", ""), model).await
            }
            "health_check" => self.health_check().await,
            other => error_envelope(&StreamLensError::Unexpected(format!("Unknown tool: {}", other))),
        }
    }
}

/// Pretty result JSON, or the error envelope
pub fn envelope<T: Serialize>(result: Result<T>) -> String {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
            error_envelope(&StreamLensError::Unexpected(format!(
                "Failed to serialize result: {}",
                e
            )))
        }),
        Err(e) => error_envelope(&e),
    }
}

pub fn error_envelope(error: &StreamLensError) -> String {
    json!({ "error": error.kind(), "message": error.message() }).to_string()
}

fn str_arg<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args[key].as_str().unwrap_or(default)
}

/// Integer argument; `None` when present but not an integer
fn int_arg(args: &Value, key: &str, default: i64) -> Option<i64> {
    match &args[key] {
        Value::Null => Some(default),
        v => v.as_i64(),
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_format_parsing() {
        assert_eq!("segments".parse::<TranscriptFormat>().unwrap(), TranscriptFormat::Segments);
        assert_eq!("TEXT".parse::<TranscriptFormat>().unwrap(), TranscriptFormat::Text);
        assert_eq!("".parse::<TranscriptFormat>().unwrap(), TranscriptFormat::Segments);
        assert_eq!("srt".parse::<TranscriptFormat>().unwrap_err().kind(), "ExtractionError");
    }

    #[test]
    fn error_envelope_shape() {
        let out = error_envelope(&StreamLensError::Batch("Maximum 10 URLs per batch".into()));
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!({ "error": "BatchError", "message": "Maximum 10 URLs per batch" }));
    }

    #[test]
    fn argument_helpers() {
        let args = json!({ "n": 3, "f": 2.5, "s": "x", "urls": ["a", "b"], "bad": ["a", 1] });
        assert_eq!(int_arg(&args, "n", 5), Some(3));
        assert_eq!(int_arg(&args, "missing", 5), Some(5));
        assert_eq!(int_arg(&args, "f", 5), None);
        assert_eq!(int_arg(&args, "s", 5), None);
        assert_eq!(str_arg(&args, "s", "d"), "x");
        assert_eq!(str_arg(&args, "missing", "d"), "d");
        assert_eq!(string_list(&args["urls"]), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(string_list(&args["bad"]), None);
        assert_eq!(string_list(&args["s"]), None);
    }
}
