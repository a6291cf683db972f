// Batch orchestration: multi-URL fan-out and playlist listing
//
// A batch never fails because of one URL; only malformed input is an error.
// Results come back in input order no matter which extraction finishes first.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::errors::{Result, StreamLensError};
use super::models::{BatchResult, BatchResultItem, PlaylistInfo, PlaylistVideo};
use super::platforms;
use super::service::{count_of, seconds_of, str_of, watch_url, ExtractionService};

pub const MAX_BATCH_URLS: usize = 10;
pub const BATCH_CONCURRENCY: usize = 3;
pub const MAX_PLAYLIST_VIDEOS: i64 = 50;
pub const DEFAULT_PLAYLIST_VIDEOS: i64 = 20;

pub struct BatchOrchestrator<'a> {
    service: &'a ExtractionService,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(service: &'a ExtractionService) -> Self {
        Self { service }
    }

    /// Extract info for up to 10 URLs, at most three at a time
    pub async fn batch_get_info(&self, urls: &[String]) -> Result<BatchResult> {
        if urls.is_empty() {
            return Err(StreamLensError::Batch("urls must be a non-empty list".to_string()));
        }
        if urls.len() > MAX_BATCH_URLS {
            return Err(StreamLensError::Batch(format!(
                "Maximum {} URLs per batch",
                MAX_BATCH_URLS
            )));
        }

        let semaphore = Arc::new(Semaphore::new(BATCH_CONCURRENCY));
        tracing::info!(
            "[Batch] Extracting {} URLs ({} concurrent)",
            urls.len(),
            BATCH_CONCURRENCY
        );

        let tasks = urls.iter().map(|url| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return BatchResultItem::failed(url.as_str(), e.to_string()),
                };
                match self.service.get_info(url).await {
                    Ok(info) => BatchResultItem::succeeded(url.as_str(), info),
                    Err(e) => {
                        tracing::warn!("[Batch] {} failed: {}", url, e);
                        BatchResultItem::failed(url.as_str(), e.message())
                    }
                }
            }
        });

        // join_all keeps input order
        let result = BatchResult::from_items(join_all(tasks).await);
        tracing::info!(
            "[Batch] Done: {}/{} succeeded",
            result.succeeded,
            result.total
        );
        Ok(result)
    }

    /// Flat listing of a playlist, at most `max_videos` entries (1..=50)
    pub async fn get_playlist_info(&self, url: &str, max_videos: i64) -> Result<PlaylistInfo> {
        if !(1..=MAX_PLAYLIST_VIDEOS).contains(&max_videos) {
            return Err(StreamLensError::Batch(format!(
                "max_videos must be an integer between 1 and {}",
                MAX_PLAYLIST_VIDEOS
            )));
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(StreamLensError::InvalidUrl(
                "URL must be a non-empty string".to_string(),
            ));
        }

        let key = format!("playlist:{}:{}", url, max_videos);
        if let Some(cached) = self.service.caches.playlists.get(&key) {
            tracing::debug!("[Batch] Cache hit: {}", key);
            return Ok(cached);
        }

        // Playlist URLs rarely match a video pattern; fall back to global settings
        let platform = platforms::resolve(url).ok().map(|r| r.platform);
        let backend = self.service.backend_for(platform);
        let options = self
            .service
            .options_for(platform)
            .with_flat_playlist(max_videos as u32);

        let raw = self
            .service
            .invoke("get_playlist_info", backend.extract_info(url, &options))
            .await?;

        let playlist = build_playlist(&raw, max_videos as usize);
        self.service.caches.playlists.set(key, playlist.clone());
        tracing::info!(
            "[Batch] Playlist '{}': {} videos",
            playlist.title,
            playlist.videos.len()
        );
        Ok(playlist)
    }
}

fn build_playlist(raw: &Value, max_videos: usize) -> PlaylistInfo {
    let videos: Vec<PlaylistVideo> = raw["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .take(max_videos)
                .filter_map(build_playlist_video)
                .collect()
        })
        .unwrap_or_default();

    PlaylistInfo {
        title: str_of(raw, "title").unwrap_or_default(),
        playlist_id: str_of(raw, "id").unwrap_or_default(),
        channel: str_of(raw, "uploader").or_else(|| str_of(raw, "channel")),
        video_count: count_of(raw, "playlist_count")
            .filter(|n| *n > 0)
            .or(Some(videos.len() as u64)),
        videos,
    }
}

fn build_playlist_video(entry: &Value) -> Option<PlaylistVideo> {
    let video_id = str_of(entry, "id").filter(|id| !id.is_empty())?;

    Some(PlaylistVideo {
        title: str_of(entry, "title").unwrap_or_default(),
        url: str_of(entry, "url")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| watch_url(&video_id)),
        duration_seconds: seconds_of(entry, "duration"),
        channel: str_of(entry, "uploader").or_else(|| str_of(entry, "channel")),
        video_id,
    })
}
