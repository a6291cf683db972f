// Extraction backends
//
// Local yt-dlp, remote yt-dlp over SSH, and the whisper transcriber.

pub mod cli;
pub mod options;
pub mod remote;
pub mod traits;
pub mod whisper;

pub use cli::{find_ytdlp, CliBackend};
pub use options::BackendOptions;
pub use remote::{RemoteBackend, RemoteOutput, RemoteRunner, SshRunner};
pub use traits::{ExtractionBackend, SpeechText, Transcriber};
pub use whisper::WhisperCli;
