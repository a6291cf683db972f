// Runtime settings resolved from STREAMLENS_* environment variables
//
// Lookup order per value: STREAMLENS_{PLATFORM}_{SUFFIX} -> STREAMLENS_{SUFFIX}.
// Blank values count as unset.

use std::collections::HashMap;
use std::time::Duration;

use super::backends::BackendOptions;
use super::cache::DEFAULT_TTL;
use super::platforms::Platform;

pub const ENV_PREFIX: &str = "STREAMLENS";
pub const DEFAULT_WHISPER_MODEL: &str = "base";

/// Network/auth values that can be set globally or per platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSettings {
    /// HTTP/SOCKS proxy URL (e.g., "http://127.0.0.1:7897")
    pub proxy: Option<String>,
    /// Path to a Netscape cookies.txt file
    pub cookie_file: Option<String>,
    /// Browser to read cookies from (edge, chrome, firefox)
    pub cookie_source: Option<String>,
    /// Remote host for backend execution (e.g., "user@macbook.local")
    pub ssh_host: Option<String>,
}

impl NetworkSettings {
    fn read(lookup: &dyn Fn(&str) -> Option<String>, scope: Option<&str>) -> Self {
        let get = |suffix: &str| {
            let key = match scope {
                Some(platform) => format!("{}_{}_{}", ENV_PREFIX, platform, suffix),
                None => format!("{}_{}", ENV_PREFIX, suffix),
            };
            non_blank(lookup(&key))
        };

        Self {
            proxy: get("PROXY"),
            cookie_file: get("COOKIE_FILE"),
            cookie_source: get("COOKIE_SOURCE"),
            ssh_host: get("SSH_HOST"),
        }
    }
}

/// Settings built once at startup and handed to the service
#[derive(Debug, Clone)]
pub struct Settings {
    pub global: NetworkSettings,
    pub platforms: HashMap<Platform, NetworkSettings>,
    pub whisper_model: String,
    pub cache_ttl: Duration,
    /// Explicit yt-dlp binary; auto-detected when unset
    pub ytdlp_path: Option<String>,
    pub socket_timeout_secs: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global: NetworkSettings::default(),
            platforms: HashMap::new(),
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            cache_ttl: DEFAULT_TTL,
            ytdlp_path: None,
            socket_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a map here)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let global = NetworkSettings::read(&lookup, None);
        let platforms = Platform::ALL
            .iter()
            .map(|p| (*p, NetworkSettings::read(&lookup, Some(p.env_key()))))
            .filter(|(_, s)| *s != NetworkSettings::default())
            .collect();

        let whisper_model = non_blank(lookup(&format!("{}_WHISPER_MODEL", ENV_PREFIX)))
            .unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string());

        let cache_ttl = non_blank(lookup(&format!("{}_CACHE_TTL", ENV_PREFIX)))
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        Self {
            global,
            platforms,
            whisper_model,
            cache_ttl,
            ytdlp_path: non_blank(lookup(&format!("{}_YTDLP_PATH", ENV_PREFIX))),
            ..Self::default()
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.global.proxy = proxy;
        self
    }

    pub fn with_cookie_file(mut self, path: Option<String>) -> Self {
        self.global.cookie_file = path;
        self
    }

    pub fn with_cookie_source(mut self, browser: Option<String>) -> Self {
        self.global.cookie_source = browser;
        self
    }

    pub fn with_ssh_host(mut self, host: Option<String>) -> Self {
        self.global.ssh_host = host;
        self
    }

    pub fn with_platform(mut self, platform: Platform, settings: NetworkSettings) -> Self {
        self.platforms.insert(platform, settings);
        self
    }

    pub fn with_whisper_model(mut self, model: impl Into<String>) -> Self {
        self.whisper_model = model.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn pick<'a>(
        &'a self,
        platform: Option<Platform>,
        field: impl Fn(&'a NetworkSettings) -> &'a Option<String>,
    ) -> Option<String> {
        platform
            .and_then(|p| self.platforms.get(&p))
            .and_then(|s| field(s).clone())
            .or_else(|| field(&self.global).clone())
    }

    /// Backend options for a platform; cookie file wins over cookie source
    pub fn backend_options(&self, platform: Option<Platform>) -> BackendOptions {
        let cookie_file = self.pick(platform, |s| &s.cookie_file);
        let cookie_source = if cookie_file.is_some() {
            None
        } else {
            self.pick(platform, |s| &s.cookie_source)
        };

        BackendOptions::default()
            .with_proxy(self.pick(platform, |s| &s.proxy))
            .with_cookie_file(cookie_file)
            .with_cookie_source(cookie_source)
            .with_socket_timeout(self.socket_timeout_secs)
    }

    /// Remote execution host for a platform, if any
    pub fn ssh_host(&self, platform: Option<Platform>) -> Option<String> {
        self.pick(platform, |s| &s.ssh_host)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(move |key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let s = settings(&[]);
        let opts = s.backend_options(None);
        assert_eq!(opts.proxy, None);
        assert_eq!(opts.cookie_file, None);
        assert_eq!(opts.cookie_source, None);
        assert_eq!(s.ssh_host(Some(Platform::Youtube)), None);
        assert_eq!(s.whisper_model, "base");
        assert_eq!(s.cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn cookie_file_takes_priority_over_source() {
        let s = settings(&[
            ("STREAMLENS_COOKIE_SOURCE", "chrome"),
            ("STREAMLENS_COOKIE_FILE", "/tmp/cookies.txt"),
        ]);
        let opts = s.backend_options(None);
        assert_eq!(opts.cookie_file.as_deref(), Some("/tmp/cookies.txt"));
        assert_eq!(opts.cookie_source, None);
    }

    #[test]
    fn cookie_source_alone_is_used() {
        let s = settings(&[("STREAMLENS_COOKIE_SOURCE", "edge")]);
        assert_eq!(s.backend_options(None).cookie_source.as_deref(), Some("edge"));
    }

    #[test]
    fn platform_values_override_global_ones() {
        let s = settings(&[
            ("STREAMLENS_PROXY", "http://global:1"),
            ("STREAMLENS_TIKTOK_PROXY", "http://tiktok:2"),
            ("STREAMLENS_DOUYIN_SSH_HOST", "user@mac.local"),
        ]);

        assert_eq!(
            s.backend_options(Some(Platform::Tiktok)).proxy.as_deref(),
            Some("http://tiktok:2")
        );
        assert_eq!(
            s.backend_options(Some(Platform::Youtube)).proxy.as_deref(),
            Some("http://global:1")
        );
        assert_eq!(s.ssh_host(Some(Platform::Douyin)).as_deref(), Some("user@mac.local"));
        assert_eq!(s.ssh_host(Some(Platform::Tiktok)), None);
    }

    #[test]
    fn platform_cookie_file_beats_global_cookie_source() {
        let s = settings(&[
            ("STREAMLENS_COOKIE_SOURCE", "firefox"),
            ("STREAMLENS_DOUYIN_COOKIE_FILE", "/tmp/douyin.txt"),
        ]);
        let opts = s.backend_options(Some(Platform::Douyin));
        assert_eq!(opts.cookie_file.as_deref(), Some("/tmp/douyin.txt"));
        assert_eq!(opts.cookie_source, None);

        let yt = s.backend_options(Some(Platform::Youtube));
        assert_eq!(yt.cookie_source.as_deref(), Some("firefox"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let s = settings(&[
            ("STREAMLENS_PROXY", "  "),
            ("STREAMLENS_COOKIE_SOURCE", ""),
            ("STREAMLENS_WHISPER_MODEL", " "),
        ]);
        assert_eq!(s.backend_options(None).proxy, None);
        assert_eq!(s.backend_options(None).cookie_source, None);
        assert_eq!(s.whisper_model, "base");
        assert!(s.platforms.is_empty());
    }

    #[test]
    fn numeric_values_are_parsed() {
        let s = settings(&[
            ("STREAMLENS_CACHE_TTL", "30"),
            ("STREAMLENS_WHISPER_MODEL", "small"),
        ]);
        assert_eq!(s.cache_ttl, Duration::from_secs(30));
        assert_eq!(s.whisper_model, "small");
    }
}
