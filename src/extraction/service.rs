// ExtractionService - single-URL operations over a pluggable backend
//
// Flow per operation:
// resolve URL -> cache lookup -> backend (local or remote) -> shape -> cache store
//
// Backend failures are classified in exactly one place (`invoke`), so every
// operation reports geo/unavailable/generic failures the same way.

use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use super::backends::{
    BackendOptions, CliBackend, ExtractionBackend, RemoteBackend, RemoteRunner, SshRunner,
    Transcriber, WhisperCli,
};
use super::cache::{Clock, SystemClock, TtlCache};
use super::config::Settings;
use super::errors::{Result, StreamLensError};
use super::format_selector::{AudioQuality, FormatSelector, RawFormat};
use super::health;
use super::models::{
    AudioStreamInfo, HealthStatus, PlaylistInfo, SearchResult, TranscriptResult,
    TranscriptionResult, VideoInfo,
};
use super::platforms::{self, Platform, UrlValidationResult};
use super::transcript::{parse_subtitles, segments_to_text};
use super::utils::{format_duration, truncate_chars};

pub const SUMMARY_MAX_CHARS: usize = 2000;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const MAX_SEARCH_RESULTS: i64 = 20;

/// One cache per operation so keys never collide across result types
pub(crate) struct Caches {
    pub(crate) info: TtlCache<VideoInfo>,
    pub(crate) transcripts: TtlCache<TranscriptResult>,
    pub(crate) audio: TtlCache<AudioStreamInfo>,
    pub(crate) transcriptions: TtlCache<TranscriptionResult>,
    pub(crate) searches: TtlCache<Vec<SearchResult>>,
    pub(crate) playlists: TtlCache<PlaylistInfo>,
}

impl Caches {
    fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            info: TtlCache::with_clock(ttl, clock.clone()),
            transcripts: TtlCache::with_clock(ttl, clock.clone()),
            audio: TtlCache::with_clock(ttl, clock.clone()),
            transcriptions: TtlCache::with_clock(ttl, clock.clone()),
            searches: TtlCache::with_clock(ttl, clock.clone()),
            playlists: TtlCache::with_clock(ttl, clock),
        }
    }
}

/// Subtitle track picked for a transcript
#[derive(Debug, Clone, PartialEq)]
struct SubtitleTrack {
    data: Option<String>,
    url: Option<String>,
    is_auto_generated: bool,
}

pub struct ExtractionService {
    settings: Settings,
    local: Arc<dyn ExtractionBackend>,
    remote_runner: Arc<dyn RemoteRunner>,
    transcriber: Arc<dyn Transcriber>,
    pub(crate) caches: Caches,
}

impl ExtractionService {
    /// Service wired to the local yt-dlp binary, ssh and whisper
    pub fn new(settings: Settings) -> Self {
        let local = match &settings.ytdlp_path {
            Some(path) => CliBackend::with_path(path.clone()),
            None => CliBackend::new(),
        };
        let caches = Caches::new(settings.cache_ttl, Arc::new(SystemClock::new()));

        Self {
            settings,
            local: Arc::new(local),
            remote_runner: Arc::new(SshRunner),
            transcriber: Arc::new(WhisperCli::new()),
            caches,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ExtractionBackend>) -> Self {
        self.local = backend;
        self
    }

    pub fn with_remote_runner(mut self, runner: Arc<dyn RemoteRunner>) -> Self {
        self.remote_runner = runner;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    /// Replace the cache time source (drops cached entries)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.caches = Caches::new(self.settings.cache_ttl, clock);
        self
    }

    /// Remote backend when a host is configured for the platform, else local
    pub(crate) fn backend_for(&self, platform: Option<Platform>) -> Arc<dyn ExtractionBackend> {
        match self.settings.ssh_host(platform) {
            Some(host) => Arc::new(RemoteBackend::new(host, self.remote_runner.clone())),
            None => self.local.clone(),
        }
    }

    pub(crate) fn options_for(&self, platform: Option<Platform>) -> BackendOptions {
        BackendOptions::metadata().merged_with(&self.settings.backend_options(platform))
    }

    /// Await a backend call and classify its failure
    pub(crate) async fn invoke<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        call.await.map_err(|e| {
            let classified = e.classified();
            tracing::warn!(
                "[Service] {} failed ({}): {}",
                operation,
                classified.kind(),
                classified.message()
            );
            classified
        })
    }

    /// Metadata, selected formats and summary for one video
    pub async fn get_info(&self, url: &str) -> Result<VideoInfo> {
        let resolved = platforms::resolve(url)?;
        let key = format!("video:{}", resolved.canonical_url);

        if let Some(cached) = self.caches.info.get(&key) {
            tracing::debug!("[Service] Cache hit: {}", key);
            return Ok(cached);
        }

        let platform = Some(resolved.platform);
        let backend = self.backend_for(platform);
        let options = self.options_for(platform);

        tracing::debug!("[Service] Extracting {} via {}", resolved.canonical_url, backend.name());
        let raw = self
            .invoke("get_info", backend.extract_info(&resolved.canonical_url, &options))
            .await?;

        let info = process_info(&raw, &resolved);
        self.caches.info.set(key, info.clone());
        tracing::info!("[Service] Extracted {} ({})", info.video_id, info.platform);
        Ok(info)
    }

    /// Parsed subtitle track for `lang` (manual preferred over automatic)
    pub async fn get_transcript(&self, url: &str, lang: &str) -> Result<TranscriptResult> {
        let resolved = platforms::resolve(url)?;
        let lang = match lang.trim() {
            "" => DEFAULT_LANGUAGE,
            l => l,
        };
        let key = format!("transcript:{}:{}", resolved.canonical_url, lang);

        if let Some(cached) = self.caches.transcripts.get(&key) {
            tracing::debug!("[Service] Cache hit: {}", key);
            return Ok(cached);
        }

        let platform = Some(resolved.platform);
        let backend = self.backend_for(platform);
        let options = self.options_for(platform);

        let raw = self
            .invoke(
                "get_transcript",
                backend.extract_with_subtitles(&resolved.canonical_url, &options, lang),
            )
            .await?;

        let track = find_subtitle_track(&raw, lang).ok_or_else(|| {
            StreamLensError::Extraction(format!("No subtitles available for language '{}'", lang))
        })?;

        let text = match (track.data, track.url) {
            (Some(data), _) => data,
            (None, Some(track_url)) => {
                self.invoke("fetch_subtitles", backend.fetch_text(&track_url, &options))
                    .await?
            }
            (None, None) => String::new(),
        };

        let segments = parse_subtitles(&text);
        if segments.is_empty() {
            return Err(StreamLensError::Extraction(format!(
                "Subtitles for language '{}' contained no parseable cues",
                lang
            )));
        }

        let result = TranscriptResult {
            video_id: video_id_of(&raw, &resolved),
            language: lang.to_string(),
            is_auto_generated: track.is_auto_generated,
            full_text: segments_to_text(&segments, " "),
            segments,
        };
        self.caches.transcripts.set(key, result.clone());
        tracing::info!(
            "[Service] Transcript {} [{}]: {} segments",
            result.video_id,
            lang,
            result.segments.len()
        );
        Ok(result)
    }

    /// Direct audio stream URL without downloading
    pub async fn get_audio_url(&self, url: &str, quality: AudioQuality) -> Result<AudioStreamInfo> {
        let resolved = platforms::resolve(url)?;
        let key = format!("audio:{}:{}", resolved.canonical_url, quality.as_str());

        if let Some(cached) = self.caches.audio.get(&key) {
            tracing::debug!("[Service] Cache hit: {}", key);
            return Ok(cached);
        }

        let platform = Some(resolved.platform);
        let backend = self.backend_for(platform);
        let options = self.options_for(platform);

        let raw = self
            .invoke("get_audio_url", backend.extract_info(&resolved.canonical_url, &options))
            .await?;

        let formats = RawFormat::list_from_info(&raw);
        let selected = FormatSelector::select_audio_stream(&formats, quality)?;

        let result = AudioStreamInfo {
            video_id: video_id_of(&raw, &resolved),
            title: str_of(&raw, "title").unwrap_or_default(),
            stream_url: selected.url.clone().unwrap_or_default(),
            format_id: selected.format_id.clone().unwrap_or_default(),
            ext: selected.ext.clone().unwrap_or_default(),
            acodec: selected.acodec.clone(),
            bitrate: selected.audio_bitrate(),
            filesize: selected.filesize,
        };
        self.caches.audio.set(key, result.clone());
        Ok(result)
    }

    /// Download audio into a temp dir and run speech-to-text on it
    pub async fn transcribe(&self, url: &str, model: Option<&str>) -> Result<TranscriptionResult> {
        let resolved = platforms::resolve(url)?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.settings.whisper_model.as_str())
            .to_string();
        let key = format!("transcription:{}:{}", resolved.canonical_url, model);

        if let Some(cached) = self.caches.transcriptions.get(&key) {
            tracing::debug!("[Service] Cache hit: {}", key);
            return Ok(cached);
        }

        let info = self.get_info(url).await?;

        let platform = Some(resolved.platform);
        let backend = self.backend_for(platform);
        let options = self.options_for(platform);

        // Removed when `workdir` drops
        let workdir = tempfile::Builder::new()
            .prefix("streamlens-")
            .tempdir()
            .map_err(|e| StreamLensError::Transcription(format!("Failed to create temp dir: {}", e)))?;

        let audio_path = self
            .invoke(
                "download_audio",
                backend.download_audio(&resolved.canonical_url, &options, workdir.path()),
            )
            .await?;

        let speech = self.run_transcriber(&audio_path, &model).await?;

        let result = TranscriptionResult {
            video_id: info.video_id,
            title: info.title,
            language: speech.language,
            model,
            text: speech.text,
        };
        self.caches.transcriptions.set(key, result.clone());
        tracing::info!("[Service] Transcribed {} with {}", result.video_id, self.transcriber.name());
        Ok(result)
    }

    async fn run_transcriber(&self, audio_path: &Path, model: &str) -> Result<super::backends::SpeechText> {
        self.transcriber
            .transcribe(audio_path, model)
            .await
            .map_err(|e| match e {
                StreamLensError::Transcription(_) => e,
                other => StreamLensError::Transcription(other.message().to_string()),
            })
    }

    /// YouTube keyword search
    pub async fn search_videos(&self, query: &str, max_results: i64) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(StreamLensError::Search(
                "Search query must be a non-empty string".to_string(),
            ));
        }
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(StreamLensError::Search(format!(
                "max_results must be an integer between 1 and {}",
                MAX_SEARCH_RESULTS
            )));
        }

        let key = format!("search:{}:{}", query.to_lowercase(), max_results);
        if let Some(cached) = self.caches.searches.get(&key) {
            tracing::debug!("[Service] Cache hit: {}", key);
            return Ok(cached);
        }

        let platform = Some(Platform::Youtube);
        let backend = self.backend_for(platform);
        let options = self.options_for(platform).with_flat_playlist(max_results as u32);
        let search_url = format!("ytsearch{}:{}", max_results, query);

        let raw = backend
            .extract_info(&search_url, &options)
            .await
            .map_err(|e| StreamLensError::Search(e.message().to_string()))?;

        let results: Vec<SearchResult> = raw["entries"]
            .as_array()
            .map(|entries| entries.iter().filter_map(build_search_result).collect())
            .unwrap_or_default();

        self.caches.searches.set(key, results.clone());
        tracing::info!("[Service] Search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    /// Environment readiness report; never fails
    pub async fn health_check(&self) -> HealthStatus {
        health::probe_health(self.settings.clone(), self.transcriber.clone()).await
    }
}

/// Shape a raw backend record into a [`VideoInfo`]
pub fn process_info(raw: &Value, resolved: &UrlValidationResult) -> VideoInfo {
    let formats = RawFormat::list_from_info(raw);
    let selection = FormatSelector::select(&formats);
    let duration = seconds_of(raw, "duration");

    VideoInfo {
        video_id: video_id_of(raw, resolved),
        title: str_of(raw, "title").unwrap_or_default(),
        webpage_url: str_of(raw, "webpage_url").unwrap_or_else(|| resolved.canonical_url.clone()),
        platform: resolved.platform,
        uploader: str_of(raw, "uploader"),
        uploader_url: str_of(raw, "uploader_url"),
        duration_seconds: duration,
        duration_string: duration.map(format_duration),
        description: str_of(raw, "description"),
        thumbnail_url: str_of(raw, "thumbnail"),
        view_count: count_of(raw, "view_count"),
        like_count: count_of(raw, "like_count"),
        comment_count: count_of(raw, "comment_count"),
        upload_date: str_of(raw, "upload_date"),
        best_quality_video: selection.best_video,
        smallest_video: selection.smallest_video,
        audio_only: selection.best_audio,
        subtitles_summary: subtitle_summary(raw, resolved.platform),
    }
}

/// Caption excerpt (YouTube) or tags/description (short-video platforms)
pub fn subtitle_summary(raw: &Value, platform: Platform) -> Option<String> {
    let summary = match platform {
        Platform::Youtube => caption_excerpt(raw),
        Platform::Tiktok | Platform::Douyin => tags_or_description(raw),
    };
    summary.map(|s| truncate_chars(&s, SUMMARY_MAX_CHARS))
}

fn caption_excerpt(raw: &Value) -> Option<String> {
    let long_enough = |s: &&str| s.chars().count() > 10;

    for lang in ["en", "en-orig"] {
        let Some(entries) = raw["automatic_captions"][lang].as_array() else {
            continue;
        };
        for entry in entries {
            let data = entry["data"]
                .as_str()
                .filter(|d| !d.is_empty())
                .or_else(|| entry["url"].as_str());
            if let Some(data) = data.filter(long_enough) {
                return Some(data.to_string());
            }
        }
    }

    raw["requested_subtitles"]
        .as_object()?
        .values()
        .filter_map(|track| track["data"].as_str())
        .find(long_enough)
        .map(str::to_string)
}

fn tags_or_description(raw: &Value) -> Option<String> {
    let tags: Vec<&str> = raw["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if !tags.is_empty() {
        return Some(tags.join(", "));
    }
    str_of(raw, "description").filter(|d| !d.is_empty())
}

/// Manual track for `lang`/`{lang}-orig`, else the automatic one
fn find_subtitle_track(raw: &Value, lang: &str) -> Option<SubtitleTrack> {
    let orig = format!("{}-orig", lang);

    for (field, is_auto_generated) in [("subtitles", false), ("automatic_captions", true)] {
        for key in [lang, orig.as_str()] {
            let Some(entries) = raw[field][key].as_array() else {
                continue;
            };
            if let Some(entry) = pick_track_entry(entries) {
                return Some(SubtitleTrack {
                    data: entry["data"].as_str().map(str::to_string),
                    url: entry["url"].as_str().map(str::to_string),
                    is_auto_generated,
                });
            }
        }
    }
    None
}

/// Inline data first, then vtt, then srt, then anything with a url
fn pick_track_entry(entries: &[Value]) -> Option<&Value> {
    let has_data = |e: &&Value| e["data"].as_str().map_or(false, |d| !d.trim().is_empty());
    let has_url = |e: &&Value| e["url"].as_str().map_or(false, |u| !u.is_empty());
    let ext_is = |ext: &'static str| move |e: &&Value| e["ext"].as_str() == Some(ext) && has_url(e);

    entries
        .iter()
        .find(has_data)
        .or_else(|| entries.iter().find(ext_is("vtt")))
        .or_else(|| entries.iter().find(ext_is("srt")))
        .or_else(|| entries.iter().find(has_url))
}

fn build_search_result(entry: &Value) -> Option<SearchResult> {
    let video_id = str_of(entry, "id").filter(|s| !s.is_empty())?;
    let title = str_of(entry, "title").filter(|s| !s.is_empty())?;

    Some(SearchResult {
        url: str_of(entry, "url")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| watch_url(&video_id)),
        duration_seconds: seconds_of(entry, "duration"),
        channel: str_of(entry, "uploader").or_else(|| str_of(entry, "channel")),
        view_count: count_of(entry, "view_count"),
        thumbnail_url: str_of(entry, "thumbnail"),
        upload_date: str_of(entry, "upload_date"),
        video_id,
        title,
    })
}

pub(crate) fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

fn video_id_of(raw: &Value, resolved: &UrlValidationResult) -> String {
    str_of(raw, "id")
        .or_else(|| resolved.video_id.clone())
        .unwrap_or_default()
}

pub(crate) fn str_of(v: &Value, key: &str) -> Option<String> {
    v[key].as_str().map(str::to_string)
}

/// Positive duration in whole seconds; zero or missing is absent
pub(crate) fn seconds_of(v: &Value, key: &str) -> Option<u64> {
    v[key].as_f64().filter(|d| *d > 0.0).map(|d| d as u64)
}

pub(crate) fn count_of(v: &Value, key: &str) -> Option<u64> {
    v[key]
        .as_u64()
        .or_else(|| v[key].as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
}
