// MediaExtractor trait and the options handed to it

use async_trait::async_trait;
use std::path::PathBuf;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::VideoMetadata;
use crate::downloader::progress::ProgressSink;

/// Desktop Chrome user agent sent with fetches and chunk downloads
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

/// Older Windows UA used by the probe profiles
pub const PROBE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Where yt-dlp should read cookies from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookieSource {
    #[default]
    None,
    /// Browser name as understood by `--cookies-from-browser`
    Browser(String),
    /// Netscape cookies.txt
    File(PathBuf),
}

/// Options for one probe or fetch call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractorOptions {
    /// yt-dlp format selector (e.g. `best[height<=720]`)
    pub format: Option<String>,
    /// Output template or literal path. Never set for probes.
    pub output: Option<String>,
    /// Extra HTTP headers, sent in order
    pub headers: Vec<(String, String)>,
    pub cookies: CookieSource,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    pub retries: Option<u32>,
    pub fragment_retries: Option<u32>,
    pub extractor_retries: Option<u32>,
    pub file_access_retries: Option<u32>,
    /// Socket timeout in seconds
    pub socket_timeout: Option<u32>,
    pub geo_bypass: bool,
    pub geo_bypass_country: Option<String>,
    pub concurrent_fragments: Option<u32>,
    /// Bytes per HTTP request for chunked downloads
    pub http_chunk_size: Option<u64>,
    /// Use yt-dlp's own HLS downloader and skip the mpegts container
    pub hls_native: bool,
    pub abort_on_unavailable_fragment: bool,
    pub ignore_errors: bool,
    pub embed_subtitles: bool,
    /// Flat extraction (probe only)
    pub flat: bool,
}

impl ExtractorOptions {
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_cookies(mut self, cookies: CookieSource) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_fragment_retries(mut self, retries: u32) -> Self {
        self.fragment_retries = Some(retries);
        self
    }

    pub fn with_extractor_retries(mut self, retries: u32) -> Self {
        self.extractor_retries = Some(retries);
        self
    }

    pub fn with_file_access_retries(mut self, retries: u32) -> Self {
        self.file_access_retries = Some(retries);
        self
    }

    pub fn with_socket_timeout(mut self, seconds: u32) -> Self {
        self.socket_timeout = Some(seconds);
        self
    }

    /// Geo bypass, optionally pinned to a two-letter country code
    pub fn with_geo_bypass(mut self, country: Option<String>) -> Self {
        self.geo_bypass = true;
        self.geo_bypass_country = country;
        self
    }

    pub fn with_concurrent_fragments(mut self, count: u32) -> Self {
        self.concurrent_fragments = Some(count);
        self
    }

    pub fn with_http_chunk_size(mut self, bytes: u64) -> Self {
        self.http_chunk_size = Some(bytes);
        self
    }

    pub fn with_hls_native(mut self, enabled: bool) -> Self {
        self.hls_native = enabled;
        self
    }

    pub fn with_abort_on_unavailable_fragment(mut self, enabled: bool) -> Self {
        self.abort_on_unavailable_fragment = enabled;
        self
    }

    pub fn with_ignore_errors(mut self, enabled: bool) -> Self {
        self.ignore_errors = enabled;
        self
    }

    pub fn with_embed_subtitles(mut self, enabled: bool) -> Self {
        self.embed_subtitles = enabled;
        self
    }

    pub fn with_flat(mut self, enabled: bool) -> Self {
        self.flat = enabled;
        self
    }
}

/// One named configuration of the probe chain
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeProfile {
    pub name: &'static str,
    pub options: ExtractorOptions,
}

impl ProbeProfile {
    pub fn new(name: &'static str, options: ExtractorOptions) -> Self {
        Self { name, options }
    }
}

/// Ordered probe profiles; earlier profiles are tried first
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeChain {
    profiles: Vec<ProbeProfile>,
}

impl ProbeChain {
    pub fn new(profiles: Vec<ProbeProfile>) -> Self {
        Self { profiles }
    }

    /// Standard, browser headers, segmented, flat
    pub fn default_chain() -> Self {
        Self::build(&CookieSource::None, None, None)
    }

    /// Default chain adjusted for user settings: a cookie profile after
    /// the header profile, geo bypass on the segmented profile and the
    /// proxy on every profile.
    pub fn build(cookies: &CookieSource, geo_country: Option<&str>, proxy: Option<&str>) -> Self {
        let base = ExtractorOptions::default().with_proxy(proxy.map(str::to_string));

        let browser_headers = base.clone().with_headers([
            ("User-Agent", PROBE_USER_AGENT),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Accept-Encoding", "gzip, deflate"),
            ("Connection", "keep-alive"),
        ]);

        let mut profiles = vec![
            ProbeProfile::new("standard", base.clone()),
            ProbeProfile::new("browser-headers", browser_headers.clone()),
        ];

        let cookie_profile = match cookies {
            CookieSource::None => None,
            CookieSource::Browser(_) => Some("browser-cookies"),
            CookieSource::File(_) => Some("cookie-file"),
        };
        if let Some(name) = cookie_profile {
            profiles.push(ProbeProfile::new(
                name,
                browser_headers.with_cookies(cookies.clone()),
            ));
        }

        let mut segmented = base
            .clone()
            .with_header("User-Agent", PROBE_USER_AGENT)
            .with_hls_native(true)
            .with_fragment_retries(3)
            .with_extractor_retries(3);
        if let Some(country) = geo_country {
            segmented = segmented.with_geo_bypass(Some(country.to_string()));
        }
        profiles.push(ProbeProfile::new("segmented", segmented));

        profiles.push(ProbeProfile::new("flat", base.with_flat(true)));

        Self { profiles }
    }

    pub fn profiles(&self) -> &[ProbeProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProbeChain {
    fn default() -> Self {
        Self::default_chain()
    }
}

/// The external extraction engine
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Read-only metadata extraction
    async fn probe(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<VideoMetadata, DownloadError>;

    /// Download and merge. Returns the final file path when the extractor
    /// reports one.
    async fn fetch(
        &self,
        url: &str,
        options: &ExtractorOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Option<PathBuf>, DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(chain: &ProbeChain) -> Vec<&'static str> {
        chain.profiles().iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_default_chain_order() {
        let chain = ProbeChain::default_chain();
        assert_eq!(names(&chain), ["standard", "browser-headers", "segmented", "flat"]);

        let segmented = &chain.profiles()[2].options;
        assert!(segmented.hls_native);
        assert_eq!(segmented.fragment_retries, Some(3));
        assert_eq!(segmented.extractor_retries, Some(3));
        assert!(!segmented.geo_bypass);
        assert!(chain.profiles()[3].options.flat);
    }

    #[test]
    fn test_probe_profiles_never_write() {
        let chain = ProbeChain::build(
            &CookieSource::Browser("firefox".to_string()),
            Some("US"),
            Some("socks5h://127.0.0.1:1080"),
        );
        assert!(chain.profiles().iter().all(|p| p.options.output.is_none()));
        assert!(chain
            .profiles()
            .iter()
            .all(|p| p.options.proxy.as_deref() == Some("socks5h://127.0.0.1:1080")));
    }

    #[test]
    fn test_cookie_profile_follows_headers() {
        let chain = ProbeChain::build(&CookieSource::Browser("firefox".to_string()), None, None);
        assert_eq!(
            names(&chain),
            ["standard", "browser-headers", "browser-cookies", "segmented", "flat"]
        );
        assert_eq!(
            chain.profiles()[2].options.cookies,
            CookieSource::Browser("firefox".to_string())
        );
    }

    #[test]
    fn test_geo_country_on_segmented() {
        let chain = ProbeChain::build(&CookieSource::None, Some("BR"), None);
        let segmented = &chain.profiles()[2].options;
        assert!(segmented.geo_bypass);
        assert_eq!(segmented.geo_bypass_country.as_deref(), Some("BR"));
    }

    #[test]
    fn test_cookie_file_profile() {
        let chain = ProbeChain::build(&CookieSource::File(PathBuf::from("/tmp/c.txt")), None, None);
        assert_eq!(chain.profiles()[2].name, "cookie-file");
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn test_builders() {
        let options = ExtractorOptions::default()
            .with_format("best")
            .with_output("/tmp/out/clip.mp4")
            .with_retries(10)
            .with_socket_timeout(30)
            .with_ignore_errors(true);
        assert_eq!(options.format.as_deref(), Some("best"));
        assert_eq!(options.output.as_deref(), Some("/tmp/out/clip.mp4"));
        assert_eq!(options.retries, Some(10));
        assert!(options.ignore_errors);
        assert!(!options.flat);
    }
}
