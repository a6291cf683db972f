// Local backend - runs the native `yt-dlp` binary on this machine

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use super::options::BackendOptions;
use super::traits::ExtractionBackend;
use crate::extraction::errors::{Result, StreamLensError};
use crate::extraction::utils::{failure_message, run_output_with_timeout};

const EXTRACT_TIMEOUT_SECS: u64 = 120;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// yt-dlp binary on the local machine
pub struct CliBackend {
    ytdlp_path: String,
}

impl CliBackend {
    pub fn new() -> Self {
        Self {
            ytdlp_path: find_ytdlp(),
        }
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: path.into(),
        }
    }

    fn parse_json(stdout: &[u8]) -> Result<Value> {
        let json_str = String::from_utf8_lossy(stdout);
        let trimmed = json_str.trim();
        if trimmed.is_empty() {
            return Err(StreamLensError::Extraction(
                "yt-dlp returned empty output".to_string(),
            ));
        }
        serde_json::from_str(trimmed)
            .map_err(|e| StreamLensError::Extraction(format!("Invalid JSON from yt-dlp: {}", e)))
    }

    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<std::process::Output> {
        tracing::debug!("[CliBackend] {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, args, timeout_secs)
            .await
            .map_err(StreamLensError::Extraction)?;

        if !output.status.success() {
            let message = failure_message("yt-dlp", &output);
            tracing::warn!("[CliBackend] yt-dlp failed: {}", message);
            return Err(StreamLensError::Extraction(message));
        }
        Ok(output)
    }
}

impl Default for CliBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the yt-dlp binary, falling back to a bare PATH lookup
pub fn find_ytdlp() -> String {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"), // Homebrew on Apple Silicon
        PathBuf::from("/usr/local/bin/yt-dlp"),    // Homebrew on Intel Mac
        PathBuf::from("/usr/bin/yt-dlp"),          // System installation
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local/bin/yt-dlp")); // pip --user
    }

    for path in candidates {
        if path.exists() {
            return path.to_string_lossy().to_string();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return path;
            }
        }
    }

    "yt-dlp".to_string()
}

/// Last non-empty stdout line, used with `--print after_move:filepath`
fn printed_path(stdout: &[u8]) -> Option<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(PathBuf::from)
}

#[async_trait]
impl ExtractionBackend for CliBackend {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn extract_info(&self, url: &str, options: &BackendOptions) -> Result<Value> {
        let output = self.run(options.to_args(url, true), EXTRACT_TIMEOUT_SECS).await?;
        Self::parse_json(&output.stdout)
    }

    async fn download_audio(
        &self,
        url: &str,
        options: &BackendOptions,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let mut opts = options.clone().with_format("bestaudio/best");
        opts.skip_download = false;

        let mut args = vec![
            "-o".to_string(),
            dest_dir.join("audio.%(ext)s").to_string_lossy().to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        args.extend(opts.to_args(url, false));

        let output = self.run(args, DOWNLOAD_TIMEOUT_SECS).await?;

        let path = printed_path(&output.stdout).ok_or_else(|| {
            StreamLensError::Extraction("yt-dlp did not report a downloaded file".to_string())
        })?;
        if !path.exists() {
            return Err(StreamLensError::Extraction(format!(
                "Downloaded file not found: {}",
                path.display()
            )));
        }

        tracing::info!("[CliBackend] Downloaded audio to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dump_json_output() {
        let value = CliBackend::parse_json(b"{\"id\": \"abc\", \"title\": \"T\"}\n").unwrap();
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn empty_or_garbage_output_is_an_extraction_error() {
        let err = CliBackend::parse_json(b"  \n").unwrap_err();
        assert_eq!(err.kind(), "ExtractionError");

        let err = CliBackend::parse_json(b"not json").unwrap_err();
        assert!(err.message().starts_with("Invalid JSON"));
    }

    #[test]
    fn printed_path_takes_last_line() {
        let path = printed_path(b"[download] 100%\n/tmp/x/audio.m4a\n\n").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x/audio.m4a"));
        assert_eq!(printed_path(b""), None);
    }

    #[tokio::test]
    async fn missing_binary_is_an_extraction_error() {
        let backend = CliBackend::with_path("/nonexistent/yt-dlp");
        let err = backend
            .extract_info("https://youtu.be/dQw4w9WgXcQ", &BackendOptions::metadata())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ExtractionError");
        assert!(err.message().contains("Failed to start"));
    }
}
