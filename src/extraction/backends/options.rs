// Per-call backend options and their yt-dlp command-line rendering

/// Options handed to an extraction backend for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    pub proxy: Option<String>,
    /// Netscape cookies.txt path
    pub cookie_file: Option<String>,
    /// Browser name for --cookies-from-browser
    pub cookie_source: Option<String>,
    pub socket_timeout: Option<u32>,
    pub no_playlist: bool,
    pub skip_download: bool,
    /// Keep writing side files (subtitles) while dumping JSON
    pub no_simulate: bool,
    pub quiet: bool,
    pub no_warnings: bool,
    pub write_subtitles: bool,
    pub write_auto_subs: bool,
    pub subtitle_langs: Vec<String>,
    /// List playlist entries without resolving each video
    pub flat_playlist: bool,
    pub playlist_end: Option<u32>,
    /// Format selector for downloads (e.g., "bestaudio")
    pub format: Option<String>,
}

impl BackendOptions {
    /// Metadata-only extraction of a single video
    pub fn metadata() -> Self {
        Self {
            no_playlist: true,
            skip_download: true,
            quiet: true,
            no_warnings: true,
            ..Self::default()
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookie_file(mut self, path: Option<String>) -> Self {
        self.cookie_file = path;
        self
    }

    pub fn with_cookie_source(mut self, browser: Option<String>) -> Self {
        self.cookie_source = browser;
        self
    }

    pub fn with_socket_timeout(mut self, secs: u32) -> Self {
        self.socket_timeout = Some(secs);
        self
    }

    /// Request manual and automatic subtitles for `lang` and `{lang}-orig`
    pub fn with_subtitles(mut self, lang: &str) -> Self {
        self.write_subtitles = true;
        self.write_auto_subs = true;
        self.subtitle_langs = vec![lang.to_string(), format!("{}-orig", lang)];
        self
    }

    pub fn with_flat_playlist(mut self, max_entries: u32) -> Self {
        self.flat_playlist = true;
        self.no_playlist = false;
        self.playlist_end = Some(max_entries);
        self
    }

    pub fn with_no_simulate(mut self) -> Self {
        self.no_simulate = true;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Merge network/auth values from `other` into self
    pub fn merged_with(mut self, other: &BackendOptions) -> Self {
        self.proxy = other.proxy.clone().or(self.proxy);
        self.cookie_file = other.cookie_file.clone().or(self.cookie_file);
        self.cookie_source = other.cookie_source.clone().or(self.cookie_source);
        self.socket_timeout = other.socket_timeout.or(self.socket_timeout);
        self
    }

    /// Render as yt-dlp arguments (without the program name).
    ///
    /// Order: dump flag, boolean flags, valued options, URL last.
    pub fn to_args(&self, url: &str, dump_json: bool) -> Vec<String> {
        let mut args = Vec::new();

        if dump_json {
            // Flat playlist listings come back as one document with `entries`
            if self.flat_playlist {
                args.push("--dump-single-json".to_string());
            } else {
                args.push("--dump-json".to_string());
            }
        }

        let flags = [
            (self.flat_playlist, "--flat-playlist"),
            (self.no_playlist, "--no-playlist"),
            (self.skip_download, "--skip-download"),
            (self.no_simulate, "--no-simulate"),
            (self.quiet, "--quiet"),
            (self.no_warnings, "--no-warnings"),
            (self.write_subtitles, "--write-subs"),
            (self.write_auto_subs, "--write-auto-subs"),
        ];
        for (enabled, flag) in flags {
            if enabled {
                args.push(flag.to_string());
            }
        }

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        if let Some(path) = &self.cookie_file {
            args.push("--cookies".to_string());
            args.push(path.clone());
        }
        if let Some(secs) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(secs.to_string());
        }
        if let Some(browser) = &self.cookie_source {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        if !self.subtitle_langs.is_empty() {
            args.push("--sub-langs".to_string());
            args.push(self.subtitle_langs.join(","));
        }
        if let Some(end) = self.playlist_end {
            args.push("--playlist-end".to_string());
            args.push(end.to_string());
        }
        if let Some(format) = &self.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }

        args.push(url.to_string());
        args
    }
}
