// Backend traits: metadata extraction and speech-to-text

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::options::BackendOptions;
use crate::extraction::errors::Result;
use crate::extraction::utils;

const SUBTITLE_FETCH_TIMEOUT_SECS: u64 = 30;

/// A way to run the extraction backend (local binary, remote host, mock)
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw metadata record for a URL (single video, flat playlist or search)
    async fn extract_info(&self, url: &str, options: &BackendOptions) -> Result<Value>;

    /// Metadata record with subtitle tracks for `lang` requested.
    ///
    /// Tracks carrying an inline `data` field need no further download.
    async fn extract_with_subtitles(
        &self,
        url: &str,
        options: &BackendOptions,
        lang: &str,
    ) -> Result<Value> {
        let options = options.clone().with_subtitles(lang);
        self.extract_info(url, &options).await
    }

    /// Download the best audio track into `dest_dir`, returning the file path
    async fn download_audio(
        &self,
        url: &str,
        options: &BackendOptions,
        dest_dir: &Path,
    ) -> Result<PathBuf>;

    /// Fetch a subtitle track referenced by URL
    async fn fetch_text(&self, url: &str, options: &BackendOptions) -> Result<String> {
        utils::fetch_text(url, options.proxy.as_deref(), SUBTITLE_FETCH_TIMEOUT_SECS).await
    }
}

/// Plain transcription output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechText {
    /// Detected language code
    pub language: String,
    pub text: String,
}

/// Speech-to-text engine
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// May block; callers on the runtime go through `spawn_blocking`
    fn is_available(&self) -> bool;

    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<SpeechText>;
}
