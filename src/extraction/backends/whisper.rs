// Whisper CLI transcriber
//
// Runs `whisper <audio> --model <m> --output_format json --output_dir <dir>`
// and reads `<dir>/<audio stem>.json` back.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Command as StdCommand;

use super::traits::{SpeechText, Transcriber};
use crate::extraction::errors::{Result, StreamLensError};
use crate::extraction::utils::{failure_message, run_output_with_timeout};

const TRANSCRIBE_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
}

pub struct WhisperCli {
    program: String,
}

impl WhisperCli {
    pub fn new() -> Self {
        Self {
            program: "whisper".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn parse_output(json: &str) -> Result<SpeechText> {
        let output: WhisperOutput = serde_json::from_str(json).map_err(|e| {
            StreamLensError::Transcription(format!("Invalid whisper output: {}", e))
        })?;
        Ok(SpeechText {
            language: output.language.unwrap_or_else(|| "unknown".to_string()),
            text: output.text.trim().to_string(),
        })
    }
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    fn name(&self) -> &'static str {
        "whisper-cli"
    }

    fn is_available(&self) -> bool {
        matches!(
            StdCommand::new(&self.program).arg("--help").output(),
            Ok(out) if out.status.success()
        )
    }

    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<SpeechText> {
        let output_dir = audio_path.parent().unwrap_or_else(|| Path::new("."));
        let args = vec![
            audio_path.to_string_lossy().to_string(),
            "--model".to_string(),
            model.to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
        ];

        tracing::info!("[Whisper] Transcribing {} with model {}", audio_path.display(), model);
        let output = run_output_with_timeout(&self.program, args, TRANSCRIBE_TIMEOUT_SECS)
            .await
            .map_err(StreamLensError::Transcription)?;

        if !output.status.success() {
            return Err(StreamLensError::Transcription(failure_message("whisper", &output)));
        }

        // Whisper names output based on the input file stem
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = output_dir.join(format!("{}.json", stem));

        let json = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            StreamLensError::Transcription(format!(
                "Whisper output {} unreadable: {}",
                json_path.display(),
                e
            ))
        })?;
        Self::parse_output(&json)
    }
}
