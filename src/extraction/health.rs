// Environment health check: yt-dlp, ffmpeg, whisper and remote host

use std::process::Command;
use std::sync::Arc;

use super::backends::{find_ytdlp, Transcriber};
use super::config::Settings;
use super::models::HealthStatus;
use super::platforms::Platform;

const FFMPEG_MISSING: &str = "ffmpeg not found. Some formats may be unavailable. \
Install: conda install -c conda-forge ffmpeg  |  apt: sudo apt install ffmpeg  |  brew: brew install ffmpeg";

/// Locates external binaries the way a shell would
pub struct ToolProbe;

impl ToolProbe {
    /// Path of `binary`: common install locations first, then PATH
    pub fn detect(binary: &str) -> Option<String> {
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary),
            format!("/usr/local/bin/{}", binary),
            format!("/usr/bin/{}", binary),
        ];

        for path in common_paths {
            if std::path::Path::new(&path).exists() {
                return Some(path);
            }
        }

        match Command::new("which").arg(binary).output() {
            Ok(output) if output.status.success() => {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!path.is_empty()).then_some(path)
            }
            _ => None,
        }
    }

    /// First line printed by `<path> <arg>`, if the command succeeds
    pub fn version(path: &str, arg: &str) -> Option<String> {
        match Command::new(path).arg(arg).output() {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            _ => None,
        }
    }
}

/// Collect the health report; every probe failure degrades to "unavailable"
pub fn check_health(settings: &Settings, transcriber: &dyn Transcriber) -> HealthStatus {
    let ytdlp_path = settings.ytdlp_path.clone().unwrap_or_else(find_ytdlp);
    let ytdlp_version = ToolProbe::version(&ytdlp_path, "--version");

    let ffmpeg_path = ToolProbe::detect("ffmpeg");
    let ffmpeg_message = if ffmpeg_path.is_some() {
        "ffmpeg is available".to_string()
    } else {
        FFMPEG_MISSING.to_string()
    };

    let remote_host = settings
        .ssh_host(None)
        .or_else(|| Platform::ALL.iter().find_map(|p| settings.ssh_host(Some(*p))));

    let status = HealthStatus {
        ytdlp_available: ytdlp_version.is_some(),
        ytdlp_version,
        ffmpeg_available: ffmpeg_path.is_some(),
        ffmpeg_path,
        ffmpeg_message,
        whisper_available: transcriber.is_available(),
        whisper_model: settings.whisper_model.clone(),
        remote_host,
    };

    tracing::debug!(
        "[Health] yt-dlp={} ffmpeg={} whisper={}",
        status.ytdlp_available,
        status.ffmpeg_available,
        status.whisper_available
    );
    status
}

/// [`check_health`] on the blocking pool; every probe spawns a process synchronously
pub async fn probe_health(settings: Settings, transcriber: Arc<dyn Transcriber>) -> HealthStatus {
    let whisper_model = settings.whisper_model.clone();

    tokio::task::spawn_blocking(move || check_health(&settings, transcriber.as_ref()))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("[Health] Probe task failed: {}", e);
            HealthStatus {
                ytdlp_available: false,
                ytdlp_version: None,
                ffmpeg_available: false,
                ffmpeg_path: None,
                ffmpeg_message: FFMPEG_MISSING.to_string(),
                whisper_available: false,
                whisper_model,
                remote_host: None,
            }
        })
}
