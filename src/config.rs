// User configuration - optional TOML file, every field defaulted

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::extractors::{CookieSource, ProbeChain};
use crate::downloader::orchestrator::FetchSettings;

const APP_DIR: &str = "vidgrab";

/// Configuration for vidgrab
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub download: DownloadConfig,
    pub network: NetworkConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory offered when the user just presses Enter
    pub output_dir: String,

    /// Selector used when a video exposes no formats
    pub default_format: String,

    pub fragment_retries: u32,
    pub retries: u32,
    pub file_access_retries: u32,
    pub extractor_retries: u32,

    /// Socket timeout in seconds
    pub socket_timeout: u32,

    pub concurrent_fragments: u32,

    /// Bytes per HTTP request
    pub http_chunk_size: u64,

    /// Two-letter country code for geo bypass; empty disables it
    pub geo_bypass_country: String,

    pub embed_subtitles: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_format: "best[height<=720]".to_string(),
            fragment_retries: 15,
            retries: 10,
            file_access_retries: 5,
            extractor_retries: 5,
            socket_timeout: 60,
            concurrent_fragments: 1,
            http_chunk_size: 10 * 1024 * 1024,
            geo_bypass_country: "US".to_string(),
            embed_subtitles: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,

    /// Browser to borrow cookies from (chrome, firefox, ...)
    pub cookies_from_browser: Option<String>,

    /// Netscape cookies.txt; wins over the browser
    pub cookies_file: Option<PathBuf>,

    /// Upper bound for one probe call, in seconds
    pub probe_timeout: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            cookies_from_browser: None,
            cookies_file: None,
            probe_timeout: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<String>,

    /// Weekly yt-dlp version check
    pub update_check: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            update_check: true,
        }
    }
}

fn default_output_dir() -> String {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "downloads".to_string())
}

impl AppConfig {
    /// `<config dir>/vidgrab/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Load configuration. An explicit path must exist and parse; the
    /// default location is optional and a broken file there only warns.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            tracing::info!("Loaded configuration from: {}", path.display());
            return Ok(config);
        }

        match Self::default_path() {
            Some(path) if path.exists() => match Self::from_file(&path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from: {}", path.display());
                    Ok(config)
                }
                Err(e) => {
                    tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
                    Ok(Self::default())
                }
            },
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn geo_country(&self) -> Option<&str> {
        let country = self.download.geo_bypass_country.trim();
        (!country.is_empty()).then_some(country)
    }

    pub fn cookie_source(&self) -> CookieSource {
        if let Some(file) = &self.network.cookies_file {
            CookieSource::File(file.clone())
        } else if let Some(browser) = &self.network.cookies_from_browser {
            CookieSource::Browser(browser.clone())
        } else {
            CookieSource::None
        }
    }

    /// Probe chain for these settings
    pub fn probe_chain(&self) -> ProbeChain {
        ProbeChain::build(
            &self.cookie_source(),
            self.geo_country(),
            self.network.proxy.as_deref(),
        )
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let d = &self.download;
        FetchSettings {
            fragment_retries: d.fragment_retries,
            retries: d.retries,
            file_access_retries: d.file_access_retries,
            extractor_retries: d.extractor_retries,
            socket_timeout: d.socket_timeout,
            concurrent_fragments: d.concurrent_fragments.max(1),
            http_chunk_size: d.http_chunk_size,
            geo_bypass_country: self.geo_country().map(str::to_string),
            embed_subtitles: d.embed_subtitles,
            proxy: self.network.proxy.clone(),
            cookies: self.cookie_source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.download.default_format, "best[height<=720]");
        assert_eq!(config.download.fragment_retries, 15);
        assert_eq!(config.download.socket_timeout, 60);
        assert_eq!(config.download.concurrent_fragments, 1);
        assert_eq!(config.download.http_chunk_size, 10_485_760);
        assert!(config.tools.update_check);
        assert_eq!(config.cookie_source(), CookieSource::None);
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [download]
            fragment_retries = 20

            [network]
            cookies_from_browser = "firefox"
            "#,
        )
        .unwrap();

        assert_eq!(config.download.fragment_retries, 20);
        assert_eq!(config.download.retries, 10);
        assert_eq!(config.network.probe_timeout, 120);
        assert_eq!(config.cookie_source(), CookieSource::Browser("firefox".to_string()));
        assert_eq!(config.probe_chain().len(), 5);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(AppConfig::from_toml("[download]\nretries = \"many\"").is_err());
    }

    #[test]
    fn test_cookie_file_wins() {
        let mut config = AppConfig::default();
        config.network.cookies_from_browser = Some("chrome".to_string());
        config.network.cookies_file = Some(PathBuf::from("/tmp/c.txt"));
        assert_eq!(config.cookie_source(), CookieSource::File(PathBuf::from("/tmp/c.txt")));
    }

    #[test]
    fn test_empty_country_disables_geo_bypass() {
        let mut config = AppConfig::default();
        config.download.geo_bypass_country = " ".to_string();
        assert!(config.fetch_settings().geo_bypass_country.is_none());
        assert!(config
            .probe_chain()
            .profiles()
            .iter()
            .all(|p| !p.options.geo_bypass));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\nproxy = \"socks5h://127.0.0.1:1080\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.network.proxy.as_deref(), Some("socks5h://127.0.0.1:1080"));
        assert_eq!(config.fetch_settings().proxy, config.network.proxy);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
