// StreamLens - normalized metadata, transcripts and audio streams for
// YouTube, TikTok and Douyin videos

pub mod extraction;
pub mod tools;

pub use extraction::{ExtractionService, Settings, StreamLensError};
pub use tools::ToolSurface;
