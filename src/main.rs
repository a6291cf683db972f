// streamlens binary: one-shot tool calls or a JSON-lines tool server on stdin

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use streamlens::extraction::batch::DEFAULT_PLAYLIST_VIDEOS;
use streamlens::tools::{error_envelope, DEFAULT_SEARCH_RESULTS};
use streamlens::{ExtractionService, Settings, StreamLensError, ToolSurface};

#[derive(Parser)]
#[command(name = "streamlens")]
#[command(about = "Video metadata, transcripts and audio streams for YouTube, TikTok and Douyin")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Metadata and selected formats for one video
    Info { url: String },

    /// Subtitle transcript
    Transcript {
        url: String,
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// "segments" or "text"
        #[arg(short, long, default_value = "segments")]
        format: String,
    },

    /// YouTube keyword search
    Search {
        query: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_RESULTS)]
        max_results: i64,
    },

    /// Direct audio stream URL
    Audio {
        url: String,
        /// "best" or "smallest"
        #[arg(short, long, default_value = "best")]
        quality: String,
    },

    /// Flat playlist listing
    Playlist {
        url: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_PLAYLIST_VIDEOS)]
        max_videos: i64,
    },

    /// Info for several URLs at once (max 10)
    Batch { urls: Vec<String> },

    /// Speech-to-text over the downloaded audio
    Transcribe {
        url: String,
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check yt-dlp, ffmpeg and whisper availability
    Health,

    /// Answer `{"tool": ..., "arguments": {...}}` lines from stdin
    Serve,
}

#[derive(Deserialize)]
struct ToolRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

async fn serve(tools: &ToolSurface) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("[Serve] Waiting for tool calls on stdin");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => tools.call(&request.tool, &request.arguments).await,
            Err(e) => error_envelope(&StreamLensError::Unexpected(format!("Invalid request: {}", e))),
        };

        // One envelope per line
        let compact = serde_json::from_str::<Value>(&response)
            .map(|v| v.to_string())
            .unwrap_or(response);
        stdout.write_all(compact.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // stdout carries JSON only; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("streamlens=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tools = ToolSurface::new(ExtractionService::new(Settings::from_env()));

    let output = match cli.command {
        Command::Info { url } => tools.get_video_info(&url).await,
        Command::Transcript { url, lang, format } => tools.get_transcript(&url, &lang, &format).await,
        Command::Search { query, max_results } => tools.search_videos(&query, max_results).await,
        Command::Audio { url, quality } => tools.get_audio_url(&url, &quality).await,
        Command::Playlist { url, max_videos } => tools.get_playlist_info(&url, max_videos).await,
        Command::Batch { urls } => tools.batch_get_info(&urls).await,
        Command::Transcribe { url, model } => tools.transcribe(&url, model.as_deref()).await,
        Command::Health => tools.health_check().await,
        Command::Serve => return serve(&tools).await,
    };

    println!("{}", output);
    Ok(())
}
