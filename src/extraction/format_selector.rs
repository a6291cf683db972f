// FormatSelector - picks representative encodings from backend output
//
// Works on the raw `formats` array of a backend record and produces:
// - Best quality video (highest height)
// - Smallest video (lowest filesize, bitrate as fallback)
// - Best audio-only track (highest audio bitrate)
// - A direct audio stream for the audio-url operation
//
// Iteration follows the backend's list order; the first format seen wins ties.

use serde_json::Value;
use std::str::FromStr;

use super::errors::{Result, StreamLensError};
use super::models::VideoFormat;

/// Format entry exactly as the backend reported it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    /// Total bitrate in kbps
    pub tbr: Option<f64>,
    /// Audio bitrate in kbps
    pub abr: Option<f64>,
    pub url: Option<String>,
    pub format_note: Option<String>,
}

impl RawFormat {
    pub fn from_value(f: &Value) -> Self {
        Self {
            format_id: str_field(f, "format_id"),
            ext: str_field(f, "ext"),
            resolution: str_field(f, "resolution"),
            width: u64_field(f, "width").map(|w| w as u32),
            height: u64_field(f, "height").map(|h| h as u32),
            fps: f["fps"].as_f64(),
            vcodec: str_field(f, "vcodec"),
            acodec: str_field(f, "acodec"),
            filesize: u64_field(f, "filesize"),
            tbr: f["tbr"].as_f64(),
            abr: f["abr"].as_f64(),
            url: str_field(f, "url"),
            format_note: str_field(f, "format_note"),
        }
    }

    /// Parse the `formats` array of a backend record, keeping its order
    pub fn list_from_info(info: &Value) -> Vec<Self> {
        info["formats"]
            .as_array()
            .map(|formats| formats.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }

    pub fn has_video(&self) -> bool {
        is_real_codec(&self.vcodec)
    }

    pub fn has_audio(&self) -> bool {
        is_real_codec(&self.acodec)
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Audio bitrate, falling back to total bitrate
    pub fn audio_bitrate(&self) -> Option<f64> {
        self.abr.or(self.tbr)
    }

    fn size_or_bitrate(&self, bitrate: Option<f64>) -> f64 {
        self.filesize
            .map(|s| s as f64)
            .or(bitrate)
            .unwrap_or(f64::INFINITY)
    }

    fn has_stream_url(&self) -> bool {
        self.url.as_deref().map_or(false, |u| !u.is_empty())
    }

    /// Typed record; `None` when the format lacks an id or extension
    pub fn to_video_format(&self) -> Option<VideoFormat> {
        let format_id = self.format_id.clone().filter(|s| !s.is_empty())?;
        let ext = self.ext.clone().filter(|s| !s.is_empty())?;

        let resolution = self.resolution.clone().or_else(|| match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{}x{}", w, h)),
            _ => None,
        });

        Some(VideoFormat {
            format_id,
            ext,
            resolution,
            height: self.height,
            width: self.width,
            fps: self.fps,
            vcodec: self.vcodec.clone(),
            acodec: self.acodec.clone(),
            filesize: self.filesize,
            bitrate: self.tbr,
            stream_url: self.url.clone(),
            note: self.format_note.clone(),
        })
    }
}

/// The three representative encodings attached to a VideoInfo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatSelection {
    pub best_video: Option<VideoFormat>,
    pub smallest_video: Option<VideoFormat>,
    pub best_audio: Option<VideoFormat>,
}

/// Audio-url selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioQuality {
    #[default]
    Best,
    Smallest,
}

impl AudioQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Smallest => "smallest",
        }
    }
}

impl FromStr for AudioQuality {
    type Err = StreamLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "smallest" => Ok(Self::Smallest),
            _ => Err(StreamLensError::Extraction(
                "quality must be 'best' or 'smallest'".to_string(),
            )),
        }
    }
}

/// Format selector over raw backend formats
pub struct FormatSelector;

impl FormatSelector {
    /// Pick best/smallest video and best audio-only encodings
    pub fn select(formats: &[RawFormat]) -> FormatSelection {
        let video_formats: Vec<&RawFormat> = formats.iter().filter(|f| f.has_video()).collect();
        let audio_formats: Vec<&RawFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();

        FormatSelection {
            best_video: Self::find_best_video(&video_formats).and_then(RawFormat::to_video_format),
            smallest_video: Self::find_smallest_video(&video_formats)
                .and_then(RawFormat::to_video_format),
            best_audio: Self::find_best_audio(&audio_formats).and_then(RawFormat::to_video_format),
        }
    }

    /// Highest height; missing height counts as 0
    fn find_best_video<'a>(formats: &[&'a RawFormat]) -> Option<&'a RawFormat> {
        first_max_by(formats, |f| f.height.unwrap_or(0) as f64)
    }

    /// Lowest filesize, total bitrate as fallback, unknown size as +inf
    fn find_smallest_video<'a>(formats: &[&'a RawFormat]) -> Option<&'a RawFormat> {
        first_min_by(formats, |f| f.size_or_bitrate(f.tbr))
    }

    /// Highest audio bitrate; missing bitrate counts as 0
    fn find_best_audio<'a>(formats: &[&'a RawFormat]) -> Option<&'a RawFormat> {
        first_max_by(formats, |f| f.audio_bitrate().unwrap_or(0.0))
    }

    /// Pick a direct audio stream for the audio-url operation.
    ///
    /// Only audio-only formats with a stream URL, id and extension qualify.
    pub fn select_audio_stream(formats: &[RawFormat], quality: AudioQuality) -> Result<&RawFormat> {
        let candidates: Vec<&RawFormat> = formats
            .iter()
            .filter(|f| f.is_audio_only() && f.has_stream_url())
            .filter(|f| f.to_video_format().is_some())
            .collect();

        let selected = match quality {
            AudioQuality::Best => {
                let mut best: Option<&RawFormat> = None;
                for f in &candidates {
                    let better = match best {
                        None => true,
                        Some(b) => {
                            let (fb, bb) = (
                                f.audio_bitrate().unwrap_or(0.0),
                                b.audio_bitrate().unwrap_or(0.0),
                            );
                            fb > bb || (fb == bb && ext_rank(f) < ext_rank(b))
                        }
                    };
                    if better {
                        best = Some(f);
                    }
                }
                best
            }
            AudioQuality::Smallest => first_min_by(&candidates, |f| f.size_or_bitrate(f.audio_bitrate())),
        };

        selected.ok_or_else(|| {
            StreamLensError::Extraction("No audio-only formats with a stream URL".to_string())
        })
    }
}

/// Container preference for equal-bitrate audio: m4a > opus > mp3 > ogg > rest
fn ext_rank(f: &RawFormat) -> u8 {
    match f.ext.as_deref() {
        Some("m4a") => 0,
        Some("opus") => 1,
        Some("mp3") => 2,
        Some("ogg") => 3,
        _ => 4,
    }
}

fn first_max_by<'a>(formats: &[&'a RawFormat], key: impl Fn(&RawFormat) -> f64) -> Option<&'a RawFormat> {
    let mut best: Option<(&'a RawFormat, f64)> = None;
    for f in formats {
        let k = key(f);
        if best.map_or(true, |(_, bk)| k > bk) {
            best = Some((f, k));
        }
    }
    best.map(|(f, _)| f)
}

fn first_min_by<'a>(formats: &[&'a RawFormat], key: impl Fn(&RawFormat) -> f64) -> Option<&'a RawFormat> {
    let mut best: Option<(&'a RawFormat, f64)> = None;
    for f in formats {
        let k = key(f);
        if best.map_or(true, |(_, bk)| k < bk) {
            best = Some((f, k));
        }
    }
    best.map(|(f, _)| f)
}

fn is_real_codec(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .map_or(false, |c| !c.is_empty() && c != "none")
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v[key].as_str().map(|s| s.to_string())
}

fn u64_field(v: &Value, key: &str) -> Option<u64> {
    let field = &v[key];
    field
        .as_u64()
        .or_else(|| field.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_formats() -> Vec<RawFormat> {
        let raw = json!([
            {
                "format_id": "18", "ext": "mp4", "height": 360, "width": 640, "fps": 30,
                "vcodec": "avc1", "acodec": "mp4a", "filesize": 5_000_000, "tbr": 500,
                "url": "https://example.com/360.mp4", "format_note": "360p"
            },
            {
                "format_id": "22", "ext": "mp4", "height": 720, "width": 1280, "fps": 30,
                "vcodec": "avc1", "acodec": "mp4a", "filesize": 15_000_000, "tbr": 1500,
                "url": "https://example.com/720.mp4", "format_note": "720p"
            },
            {
                "format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a",
                "abr": 128, "tbr": 128, "filesize": 2_000_000,
                "url": "https://example.com/audio.m4a", "format_note": "audio only"
            }
        ]);
        RawFormat::list_from_info(&json!({ "formats": raw }))
    }

    fn audio_formats() -> Vec<RawFormat> {
        let raw = json!([
            { "format_id": "140", "ext": "m4a", "acodec": "mp4a.40.2", "vcodec": "none",
              "abr": 128.0, "filesize": 3000000, "url": "https://example.com/audio_m4a" },
            { "format_id": "251", "ext": "opus", "acodec": "opus", "vcodec": "none",
              "abr": 160.0, "filesize": 3500000, "url": "https://example.com/audio_opus" },
            { "format_id": "250", "ext": "opus", "acodec": "opus", "vcodec": "none",
              "abr": 70.0, "filesize": 1500000, "url": "https://example.com/audio_opus_low" },
            { "format_id": "18", "ext": "mp4", "acodec": "mp4a.40.2", "vcodec": "avc1.42001E",
              "height": 360, "abr": 96.0, "url": "https://example.com/video_mp4" }
        ]);
        raw.as_array().unwrap().iter().map(RawFormat::from_value).collect()
    }

    #[test]
    fn picks_best_smallest_and_audio() {
        let selection = FormatSelector::select(&sample_formats());

        let best = selection.best_video.unwrap();
        assert_eq!(best.format_id, "22");
        assert_eq!(best.height, Some(720));

        let smallest = selection.smallest_video.unwrap();
        assert_eq!(smallest.format_id, "18");

        let audio = selection.best_audio.unwrap();
        assert_eq!(audio.ext, "m4a");
        assert_eq!(audio.stream_url.as_deref(), Some("https://example.com/audio.m4a"));
    }

    #[test]
    fn selection_is_deterministic() {
        let formats = sample_formats();
        assert_eq!(FormatSelector::select(&formats), FormatSelector::select(&formats));
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert_eq!(FormatSelector::select(&[]), FormatSelection::default());
    }

    #[test]
    fn first_seen_wins_ties() {
        let formats: Vec<RawFormat> = ["a", "b"]
            .iter()
            .map(|id| RawFormat {
                format_id: Some(id.to_string()),
                ext: Some("mp4".to_string()),
                height: Some(720),
                vcodec: Some("vp9".to_string()),
                filesize: Some(10),
                ..Default::default()
            })
            .collect();

        let selection = FormatSelector::select(&formats);
        assert_eq!(selection.best_video.unwrap().format_id, "a");
        assert_eq!(selection.smallest_video.unwrap().format_id, "a");
    }

    #[test]
    fn smallest_falls_back_to_bitrate() {
        let formats = vec![
            RawFormat {
                format_id: Some("unknown".into()),
                ext: Some("mp4".into()),
                vcodec: Some("avc1".into()),
                ..Default::default()
            },
            RawFormat {
                format_id: Some("tbr".into()),
                ext: Some("mp4".into()),
                vcodec: Some("avc1".into()),
                tbr: Some(300.0),
                ..Default::default()
            },
        ];
        let selection = FormatSelector::select(&formats);
        assert_eq!(selection.smallest_video.unwrap().format_id, "tbr");
    }

    #[test]
    fn formats_without_id_or_ext_are_dropped() {
        let formats = vec![RawFormat {
            ext: Some("mp4".into()),
            vcodec: Some("avc1".into()),
            height: Some(1080),
            ..Default::default()
        }];
        assert_eq!(FormatSelector::select(&formats).best_video, None);
    }

    #[test]
    fn resolution_is_derived_from_dimensions() {
        let f = RawFormat {
            format_id: Some("1".into()),
            ext: Some("mp4".into()),
            width: Some(1920),
            height: Some(1080),
            ..Default::default()
        };
        assert_eq!(f.to_video_format().unwrap().resolution.as_deref(), Some("1920x1080"));
    }

    #[test]
    fn none_codec_is_not_video() {
        let f = RawFormat::from_value(&json!({ "format_id": "1", "ext": "m4a", "vcodec": "none", "acodec": "opus" }));
        assert!(!f.has_video());
        assert!(f.is_audio_only());
    }

    #[test]
    fn best_audio_stream_picks_highest_bitrate() {
        let formats = audio_formats();
        let f = FormatSelector::select_audio_stream(&formats, AudioQuality::Best).unwrap();
        assert_eq!(f.format_id.as_deref(), Some("251"));
    }

    #[test]
    fn smallest_audio_stream_picks_lowest_filesize() {
        let formats = audio_formats();
        let f = FormatSelector::select_audio_stream(&formats, AudioQuality::Smallest).unwrap();
        assert_eq!(f.format_id.as_deref(), Some("250"));
        assert_eq!(f.filesize, Some(1_500_000));
    }

    #[test]
    fn m4a_preferred_at_equal_bitrate() {
        let raw = json!([
            { "format_id": "1", "ext": "ogg", "acodec": "vorbis", "vcodec": "none", "abr": 128.0, "url": "x" },
            { "format_id": "2", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 128.0, "url": "y" }
        ]);
        let formats: Vec<RawFormat> = raw.as_array().unwrap().iter().map(RawFormat::from_value).collect();
        let f = FormatSelector::select_audio_stream(&formats, AudioQuality::Best).unwrap();
        assert_eq!(f.format_id.as_deref(), Some("2"));
    }

    #[test]
    fn audio_stream_requires_audio_only_with_url() {
        let raw = json!([
            { "format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x" },
            { "format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a", "abr": 128 }
        ]);
        let formats: Vec<RawFormat> = raw.as_array().unwrap().iter().map(RawFormat::from_value).collect();
        let err = FormatSelector::select_audio_stream(&formats, AudioQuality::Best).unwrap_err();
        assert!(err.message().contains("No audio-only"));

        let err = FormatSelector::select_audio_stream(&[], AudioQuality::Smallest).unwrap_err();
        assert_eq!(err.kind(), "ExtractionError");
    }

    #[test]
    fn quality_parsing() {
        assert_eq!("best".parse::<AudioQuality>().unwrap(), AudioQuality::Best);
        assert_eq!(" Smallest ".parse::<AudioQuality>().unwrap(), AudioQuality::Smallest);
        let err = "medium".parse::<AudioQuality>().unwrap_err();
        assert!(err.message().contains("quality must be"));
    }
}
