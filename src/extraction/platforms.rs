// Platform detection and URL canonicalization
//
// Pure pattern matching: no network access happens here.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{Result, StreamLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Douyin,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Tiktok, Platform::Douyin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Douyin => "douyin",
        }
    }

    /// Upper-case key used in per-platform environment variables
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Youtube => "YOUTUBE",
            Self::Tiktok => "TIKTOK",
            Self::Douyin => "DOUYIN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolver output for one input URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlValidationResult {
    pub platform: Platform,
    pub canonical_url: String,
    pub video_id: Option<String>,
}

struct PlatformRule {
    platform: Platform,
    pattern: Regex,
    has_id: bool,
}

impl PlatformRule {
    fn new(platform: Platform, pattern: &str, has_id: bool) -> Self {
        Self {
            platform,
            pattern: Regex::new(pattern).unwrap(),
            has_id,
        }
    }
}

lazy_static::lazy_static! {
    // Evaluated in order; first match wins.
    static ref RULES: Vec<PlatformRule> = vec![
        PlatformRule::new(
            Platform::Youtube,
            r"(?:https?://)?(?:www\.)?youtube\.com/watch\?.*v=(?P<id>[a-zA-Z0-9_-]{11})",
            true,
        ),
        PlatformRule::new(
            Platform::Youtube,
            r"(?:https?://)?youtu\.be/(?P<id>[a-zA-Z0-9_-]{11})",
            true,
        ),
        PlatformRule::new(
            Platform::Youtube,
            r"(?:https?://)?(?:www\.)?youtube\.com/shorts/(?P<id>[a-zA-Z0-9_-]{11})",
            true,
        ),
        PlatformRule::new(
            Platform::Youtube,
            r"(?:https?://)?(?:www\.)?youtube\.com/embed/(?P<id>[a-zA-Z0-9_-]{11})",
            true,
        ),
        PlatformRule::new(
            Platform::Youtube,
            r"(?:https?://)?m\.youtube\.com/watch\?.*v=(?P<id>[a-zA-Z0-9_-]{11})",
            true,
        ),
        PlatformRule::new(
            Platform::Tiktok,
            r"(?:https?://)?(?:www\.)?tiktok\.com/@[^/]+/video/(?P<id>\d+)",
            true,
        ),
        PlatformRule::new(
            Platform::Tiktok,
            r"(?:https?://)?vm\.tiktok\.com/[a-zA-Z0-9]+",
            false,
        ),
        PlatformRule::new(
            Platform::Douyin,
            r"(?:https?://)?(?:www\.)?douyin\.com/video/(?P<id>\d+)",
            true,
        ),
        PlatformRule::new(
            Platform::Douyin,
            r"(?:https?://)?(?:www\.)?douyin\.com/user/[^?]+\?.*modal_id=(?P<id>\d+)",
            true,
        ),
        PlatformRule::new(
            Platform::Douyin,
            r"(?:https?://)?v\.douyin\.com/[a-zA-Z0-9]+",
            false,
        ),
    ];
}

/// Classify and canonicalize a video URL
pub fn resolve(url: &str) -> Result<UrlValidationResult> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(StreamLensError::InvalidUrl(
            "URL must be a non-empty string".to_string(),
        ));
    }

    for rule in RULES.iter() {
        let Some(caps) = rule.pattern.captures(trimmed) else {
            continue;
        };

        let video_id = if rule.has_id {
            caps.name("id").map(|m| m.as_str().to_string())
        } else {
            None
        };

        let canonical_url = match (rule.platform, video_id.as_deref()) {
            (Platform::Youtube, Some(id)) => format!("https://www.youtube.com/watch?v={}", id),
            (Platform::Douyin, Some(id)) => format!("https://www.douyin.com/video/{}", id),
            _ => trimmed.to_string(),
        };

        return Ok(UrlValidationResult {
            platform: rule.platform,
            canonical_url,
            video_id,
        });
    }

    Err(StreamLensError::InvalidUrl(format!(
        "Unsupported or invalid URL: {}",
        trimmed
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YT_ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn youtube_forms_share_one_canonical_url() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10s",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "  https://youtu.be/dQw4w9WgXcQ  ",
        ];

        for url in urls {
            let result = resolve(url).unwrap();
            assert_eq!(result.platform, Platform::Youtube, "{}", url);
            assert_eq!(result.video_id.as_deref(), Some(YT_ID), "{}", url);
            assert_eq!(
                result.canonical_url,
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "{}",
                url
            );
        }
    }

    #[test]
    fn resolving_is_idempotent() {
        let first = resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let second = resolve(&first.canonical_url).unwrap();
        assert_eq!(first, second);

        let douyin = resolve("https://www.douyin.com/user/self?modal_id=7609331978659515499").unwrap();
        assert_eq!(resolve(&douyin.canonical_url).unwrap().canonical_url, douyin.canonical_url);
    }

    #[test]
    fn tiktok_full_urls_keep_the_original_form() {
        for url in [
            "https://www.tiktok.com/@user/video/7234567890123456789",
            "https://tiktok.com/@some.user/video/7234567890123456789",
            "http://www.tiktok.com/@user/video/7234567890123456789",
        ] {
            let result = resolve(url).unwrap();
            assert_eq!(result.platform, Platform::Tiktok);
            assert_eq!(result.video_id.as_deref(), Some("7234567890123456789"));
            assert_eq!(result.canonical_url, url);
        }
    }

    #[test]
    fn short_links_have_no_id() {
        let tiktok = resolve("https://vm.tiktok.com/ZMrABC123").unwrap();
        assert_eq!(tiktok.platform, Platform::Tiktok);
        assert_eq!(tiktok.video_id, None);
        assert_eq!(tiktok.canonical_url, "https://vm.tiktok.com/ZMrABC123");

        let douyin = resolve(" https://v.douyin.com/iRNBho5p ").unwrap();
        assert_eq!(douyin.platform, Platform::Douyin);
        assert_eq!(douyin.video_id, None);
        assert_eq!(douyin.canonical_url, "https://v.douyin.com/iRNBho5p");
    }

    #[test]
    fn douyin_modal_urls_canonicalize_to_video_page() {
        for (url, id) in [
            (
                "https://www.douyin.com/user/self?from_tab_name=main&modal_id=7609331978659515499&showTab=like",
                "7609331978659515499",
            ),
            (
                "https://www.douyin.com/user/MS4wLjABxxx?modal_id=7609331978659515499",
                "7609331978659515499",
            ),
            ("https://douyin.com/video/1234567890123456789", "1234567890123456789"),
        ] {
            let result = resolve(url).unwrap();
            assert_eq!(result.platform, Platform::Douyin);
            assert_eq!(result.video_id.as_deref(), Some(id));
            assert_eq!(result.canonical_url, format!("https://www.douyin.com/video/{}", id));
        }
    }

    #[test]
    fn rejects_blank_and_unknown_urls() {
        for url in ["", "   ", "https://vimeo.com/12345", "not a url", "https://www.youtube.com/watch?v=short"] {
            let err = resolve(url).unwrap_err();
            assert_eq!(err.kind(), "InvalidURL", "{}", url);
        }
    }
}
