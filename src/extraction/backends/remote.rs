// Remote backend - runs yt-dlp on another machine over SSH
//
// Used when a platform needs a residential IP or logged-in browser cookies
// that only exist on the remote host. Output comes back over stdout.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::options::BackendOptions;
use super::traits::ExtractionBackend;
use crate::extraction::errors::{Result, StreamLensError};
use crate::extraction::utils::{run_output_with_timeout, shell_join};

pub const SUBTITLE_BOUNDARY: &str = "---SUBTITLE_BOUNDARY---";

const EXTRACT_TIMEOUT_SECS: u64 = 60;
const SUBTITLE_TIMEOUT_SECS: u64 = 90;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Captured result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn failure_message(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr).trim().to_string();
        if !stderr.is_empty() {
            return stderr;
        }
        match self.code {
            Some(code) => format!("ssh exited with code {}", code),
            None => "ssh was terminated by a signal".to_string(),
        }
    }
}

/// Executes a shell command line on a remote host
#[async_trait]
pub trait RemoteRunner: Send + Sync {
    async fn run(&self, host: &str, command: &str, timeout_secs: u64) -> Result<RemoteOutput>;
}

/// OpenSSH client in batch mode (key-based auth only, no prompts)
#[derive(Debug, Clone, Default)]
pub struct SshRunner;

#[async_trait]
impl RemoteRunner for SshRunner {
    async fn run(&self, host: &str, command: &str, timeout_secs: u64) -> Result<RemoteOutput> {
        let args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            host.to_string(),
            command.to_string(),
        ];
        tracing::debug!("[Remote] ssh {} {}", host, command);

        let output = run_output_with_timeout("ssh", args, timeout_secs)
            .await
            .map_err(|e| StreamLensError::RemoteExecution(format!("ssh to {} failed: {}", host, e)))?;

        Ok(RemoteOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// yt-dlp command line for the remote host
pub fn build_command(options: &BackendOptions, url: &str, want_json: bool) -> Vec<String> {
    let mut args = vec!["yt-dlp".to_string()];
    args.extend(options.to_args(url, want_json));
    args
}

/// curl command line fetching `url` on the remote host
pub fn fetch_command(url: &str, proxy: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "curl".to_string(),
        "-fsSL".to_string(),
        "--max-time".to_string(),
        FETCH_TIMEOUT_SECS.to_string(),
    ];
    if let Some(proxy) = proxy {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }
    args.push(url.to_string());
    args
}

/// Parse a metadata record from remote stdout
pub fn parse_info(stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(StreamLensError::RemoteExecution(
            "Remote yt-dlp returned empty output".to_string(),
        ));
    }
    serde_json::from_str(trimmed).map_err(|e| {
        StreamLensError::RemoteExecution(format!("Invalid JSON from remote yt-dlp: {}", e))
    })
}

/// Split `<json> BOUNDARY <vtt>` output and inject the track inline under
/// `subtitles[lang]`. An empty subtitle part leaves the record untouched.
pub fn parse_subtitle_response(stdout: &str, lang: &str) -> Result<Value> {
    let (info_part, subtitle_part) = match stdout.split_once(SUBTITLE_BOUNDARY) {
        Some((info, subs)) => (info, subs.trim()),
        None => (stdout, ""),
    };

    let mut info = parse_info(info_part)?;
    if subtitle_part.is_empty() {
        return Ok(info);
    }

    let Some(record) = info.as_object_mut() else {
        return Err(StreamLensError::RemoteExecution(
            "Remote yt-dlp returned a non-object record".to_string(),
        ));
    };

    let subtitles = record
        .entry("subtitles")
        .or_insert_with(|| json!({}));
    if !subtitles.is_object() {
        *subtitles = json!({});
    }
    let track = json!({ "data": subtitle_part, "ext": "vtt" });
    match subtitles.get_mut(lang).and_then(Value::as_array_mut) {
        Some(tracks) => tracks.push(track),
        None => subtitles[lang] = json!([track]),
    }

    Ok(info)
}

/// Split `<file name>\n<bytes>` download output
fn split_download(stdout: &[u8]) -> Result<(String, &[u8])> {
    let newline = stdout.iter().position(|b| *b == b'\n').ok_or_else(|| {
        StreamLensError::RemoteExecution("Remote download returned no file".to_string())
    })?;
    let name = String::from_utf8_lossy(&stdout[..newline]).trim().to_string();

    // Only the bare file name is trusted
    let name = Path::new(&name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            StreamLensError::RemoteExecution("Remote download returned no file".to_string())
        })?;

    let body = &stdout[newline + 1..];
    if body.is_empty() {
        return Err(StreamLensError::RemoteExecution(format!(
            "Remote download of {} is empty",
            name
        )));
    }
    Ok((name, body))
}

/// Extraction backend executing on `host` through a [`RemoteRunner`]
pub struct RemoteBackend {
    host: String,
    runner: Arc<dyn RemoteRunner>,
}

impl RemoteBackend {
    pub fn new(host: impl Into<String>, runner: Arc<dyn RemoteRunner>) -> Self {
        Self {
            host: host.into(),
            runner,
        }
    }

    async fn run(&self, command: &str, timeout_secs: u64) -> Result<RemoteOutput> {
        let output = self.runner.run(&self.host, command, timeout_secs).await?;
        if !output.success() {
            let message = output.failure_message();
            tracing::warn!("[Remote] {} failed: {}", self.host, message);
            return Err(StreamLensError::RemoteExecution(message));
        }
        Ok(output)
    }

    fn in_temp_dir(body: &str) -> String {
        format!(
            "set -e; TMPDIR=$(mktemp -d); trap 'rm -rf \"$TMPDIR\"' EXIT; cd \"$TMPDIR\"; {}",
            body
        )
    }
}

#[async_trait]
impl ExtractionBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote-yt-dlp"
    }

    async fn extract_info(&self, url: &str, options: &BackendOptions) -> Result<Value> {
        let command = shell_join(&build_command(options, url, true));
        let output = self.run(&command, EXTRACT_TIMEOUT_SECS).await?;
        parse_info(&String::from_utf8_lossy(&output.stdout))
    }

    async fn extract_with_subtitles(
        &self,
        url: &str,
        options: &BackendOptions,
        lang: &str,
    ) -> Result<Value> {
        // --dump-json alone simulates and writes no .vtt files
        let options = options.clone().with_subtitles(lang).with_no_simulate();
        let ytdlp = shell_join(&build_command(&options, url, true));
        let script = Self::in_temp_dir(&format!(
            "{} > info.json; cat info.json; echo '{}'; cat \"$TMPDIR\"/*.vtt 2>/dev/null || true",
            ytdlp, SUBTITLE_BOUNDARY
        ));

        let output = self.run(&script, SUBTITLE_TIMEOUT_SECS).await?;
        parse_subtitle_response(&String::from_utf8_lossy(&output.stdout), lang)
    }

    async fn download_audio(
        &self,
        url: &str,
        options: &BackendOptions,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let mut opts = options.clone().with_format("bestaudio/best");
        opts.skip_download = false;
        opts.quiet = true;

        let mut args = build_command(&opts, url, false);
        let url_arg = args.pop().unwrap_or_default();
        args.extend(["-o".to_string(), "audio.%(ext)s".to_string(), url_arg]);

        let script = Self::in_temp_dir(&format!(
            "{} > /dev/null; F=$(ls audio.* | head -n 1); echo \"$F\"; cat \"$F\"",
            shell_join(&args)
        ));

        let output = self.run(&script, DOWNLOAD_TIMEOUT_SECS).await?;
        let (name, body) = split_download(&output.stdout)?;

        let path = dest_dir.join(name);
        tokio::fs::write(&path, body).await?;
        tracing::info!("[Remote] Copied audio from {} to {}", self.host, path.display());
        Ok(path)
    }

    /// Subtitle tracks are fetched from the remote host, not locally
    async fn fetch_text(&self, url: &str, options: &BackendOptions) -> Result<String> {
        let command = shell_join(&fetch_command(url, options.proxy.as_deref()));
        let output = self.run(&command, FETCH_TIMEOUT_SECS + 10).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a canned output and records the commands it was given
    struct ScriptedRunner {
        output: RemoteOutput,
        commands: Mutex<Vec<(String, String, u64)>>,
    }

    impl ScriptedRunner {
        fn new(code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
            Self::with_bytes(code, stdout.as_bytes().to_vec(), stderr)
        }

        fn with_bytes(code: i32, stdout: Vec<u8>, stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                output: RemoteOutput {
                    code: Some(code),
                    stdout,
                    stderr: stderr.as_bytes().to_vec(),
                },
                commands: Mutex::new(Vec::new()),
            })
        }

        fn commands(&self) -> Vec<(String, String, u64)> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteRunner for ScriptedRunner {
        async fn run(&self, host: &str, command: &str, timeout_secs: u64) -> Result<RemoteOutput> {
            self.commands
                .lock()
                .unwrap()
                .push((host.to_string(), command.to_string(), timeout_secs));
            Ok(self.output.clone())
        }
    }

    const URL: &str = "https://example.com/video";

    #[test]
    fn command_starts_with_program_and_ends_with_url() {
        let args = build_command(&BackendOptions::default(), URL, true);
        assert_eq!(args[0], "yt-dlp");
        assert!(args.contains(&"--dump-json".to_string()));
        assert_eq!(args.last().unwrap(), URL);

        let args = build_command(&BackendOptions::default(), URL, false);
        assert!(!args.contains(&"--dump-json".to_string()));
    }

    #[test]
    fn command_carries_subtitle_languages_and_flags() {
        let mut opts = BackendOptions::metadata();
        opts.subtitle_langs = vec!["en".into(), "en-orig".into()];
        let args = build_command(&opts, URL, true);
        let idx = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[idx + 1], "en,en-orig");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
    }

    #[tokio::test]
    async fn extract_parses_remote_json() {
        let runner = ScriptedRunner::new(0, r#"{"id": "abc123", "title": "Test", "formats": []}"#, "");
        let backend = RemoteBackend::new("user@host", runner.clone());

        let info = backend.extract_info(URL, &BackendOptions::metadata()).await.unwrap();
        assert_eq!(info["id"], "abc123");

        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, "user@host");
        assert!(commands[0].1.starts_with("yt-dlp --dump-json"));
        assert_eq!(commands[0].2, 60);
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let runner = ScriptedRunner::new(1, "", "Connection refused");
        let backend = RemoteBackend::new("user@host", runner);
        let err = backend.extract_info(URL, &BackendOptions::default()).await.unwrap_err();
        assert_eq!(err, StreamLensError::RemoteExecution("Connection refused".into()));
    }

    #[tokio::test]
    async fn nonzero_exit_without_stderr_reports_code() {
        let runner = ScriptedRunner::new(255, "", "");
        let backend = RemoteBackend::new("user@host", runner);
        let err = backend.extract_info(URL, &BackendOptions::default()).await.unwrap_err();
        assert_eq!(err.message(), "ssh exited with code 255");
    }

    #[tokio::test]
    async fn empty_and_invalid_output_are_errors() {
        let backend = RemoteBackend::new("h", ScriptedRunner::new(0, "", ""));
        let err = backend.extract_info(URL, &BackendOptions::default()).await.unwrap_err();
        assert!(err.message().contains("empty output"));

        let backend = RemoteBackend::new("h", ScriptedRunner::new(0, "not json", ""));
        let err = backend.extract_info(URL, &BackendOptions::default()).await.unwrap_err();
        assert!(err.message().contains("Invalid JSON"));
        assert_eq!(err.kind(), "RemoteExecutionError");
    }

    #[tokio::test]
    async fn subtitles_are_injected_inline() {
        let vtt = "WEBVTT\n\n00:00.000 --> 00:01.000\nHello world";
        let stdout = format!("{}\n{}\n{}", r#"{"id": "abc123", "title": "Test"}"#, SUBTITLE_BOUNDARY, vtt);
        let runner = ScriptedRunner::new(0, &stdout, "");
        let backend = RemoteBackend::new("user@host", runner.clone());

        let info = backend
            .extract_with_subtitles(URL, &BackendOptions::metadata(), "en")
            .await
            .unwrap();
        assert_eq!(info["id"], "abc123");
        assert_eq!(info["subtitles"]["en"][0]["data"], vtt);
        assert_eq!(info["subtitles"]["en"][0]["ext"], "vtt");

        let (_, command, timeout) = &runner.commands()[0];
        assert!(command.contains(SUBTITLE_BOUNDARY));
        assert!(command.contains("--write-subs"));
        assert!(command.contains("--no-simulate"));
        assert_eq!(*timeout, 90);
    }

    #[tokio::test]
    async fn subtitle_urls_are_fetched_on_the_remote_host() {
        let runner = ScriptedRunner::new(0, "WEBVTT\n\n00:00.000 --> 00:01.000\nHi", "");
        let backend = RemoteBackend::new("user@host", runner.clone());
        let opts = BackendOptions::default().with_proxy(Some("socks5://127.0.0.1:1080".into()));

        let text = backend.fetch_text("https://subs/en.vtt", &opts).await.unwrap();
        assert!(text.ends_with("Hi"));

        let (host, command, _) = &runner.commands()[0];
        assert_eq!(host, "user@host");
        assert!(command.starts_with("curl -fsSL --max-time 30"));
        assert!(command.contains("--proxy"));
        assert!(command.ends_with("https://subs/en.vtt"));
    }

    #[tokio::test]
    async fn remote_fetch_failure_reports_stderr() {
        let backend = RemoteBackend::new("h", ScriptedRunner::new(22, "", "curl: (22) 404"));
        let err = backend
            .fetch_text("https://subs/en.vtt", &BackendOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, StreamLensError::RemoteExecution("curl: (22) 404".into()));
    }

    #[test]
    fn empty_subtitle_part_adds_nothing() {
        let stdout = format!("{}\n{}\n", r#"{"id": "abc123"}"#, SUBTITLE_BOUNDARY);
        let info = parse_subtitle_response(&stdout, "en").unwrap();
        assert!(info.get("subtitles").is_none());
    }

    #[test]
    fn injected_track_is_appended_to_existing_ones() {
        let stdout = format!(
            "{}\n{}\nWEBVTT",
            r#"{"id": "x", "subtitles": {"en": [{"ext": "srt", "url": "https://a"}]}}"#,
            SUBTITLE_BOUNDARY
        );
        let info = parse_subtitle_response(&stdout, "en").unwrap();
        assert_eq!(info["subtitles"]["en"].as_array().unwrap().len(), 2);
        assert_eq!(info["subtitles"]["en"][1]["data"], "WEBVTT");
    }

    #[tokio::test]
    async fn subtitle_failure_reports_stderr() {
        let backend = RemoteBackend::new("h", ScriptedRunner::new(1, "", "timeout"));
        let err = backend
            .extract_with_subtitles(URL, &BackendOptions::default(), "en")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "timeout");
    }

    #[tokio::test]
    async fn download_writes_file_locally() {
        let mut stdout = b"audio.m4a\n".to_vec();
        stdout.extend_from_slice(&[0u8, 1, 2, 3]);
        let runner = ScriptedRunner::with_bytes(0, stdout, "");
        let backend = RemoteBackend::new("h", runner.clone());
        let dir = tempfile::tempdir().unwrap();

        let path = backend
            .download_audio(URL, &BackendOptions::metadata(), dir.path())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("audio.m4a"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8, 1, 2, 3]);

        let (_, command, _) = &runner.commands()[0];
        assert!(command.contains("bestaudio"));
        assert!(!command.contains("--skip-download"));
    }

    #[test]
    fn download_output_must_name_a_file() {
        assert!(split_download(b"").is_err());
        assert!(split_download(b"\nxx").is_err());
        assert!(split_download(b"audio.m4a\n").is_err());

        let (name, body) = split_download(b"../../etc/audio.webm\nabc").unwrap();
        assert_eq!(name, "audio.webm");
        assert_eq!(body, b"abc");
    }
}
