// Download orchestrator - builds fetch options and hands off to the extractor

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunk::detect_chunk;
use super::errors::DownloadError;
use super::extractors::diagnostics::chunk_hint;
use super::extractors::traits::{CookieSource, ExtractorOptions, MediaExtractor, DESKTOP_USER_AGENT};
use super::models::ChunkInfo;
use super::progress::ProgressSink;
use super::utils::display_path;

/// Output template for regular downloads, relative to the output dir
pub const OUTPUT_TEMPLATE: &str = "%(title).200s.%(ext)s";

// Browser-like headers accepted by the Vimeo CDN
const CDN_HEADERS: [(&str, &str); 10] = [
    ("Accept", "*/*"),
    ("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Referer", "https://player.vimeo.com/"),
    ("Sec-Ch-Ua", "\"Chromium\";v=\"139\", \"Not;A=Brand\";v=\"99\""),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", "\"macOS\""),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "cross-site"),
];

/// Retry and network budgets for regular downloads
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub fragment_retries: u32,
    pub retries: u32,
    pub file_access_retries: u32,
    pub extractor_retries: u32,
    pub socket_timeout: u32,
    pub concurrent_fragments: u32,
    pub http_chunk_size: u64,
    /// `None` disables geo bypass
    pub geo_bypass_country: Option<String>,
    pub embed_subtitles: bool,
    pub proxy: Option<String>,
    pub cookies: CookieSource,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            fragment_retries: 15,
            retries: 10,
            file_access_retries: 5,
            extractor_retries: 5,
            socket_timeout: 60,
            concurrent_fragments: 1,
            http_chunk_size: 10 * 1024 * 1024,
            geo_bypass_country: Some("US".to_string()),
            embed_subtitles: true,
            proxy: None,
            cookies: CookieSource::None,
        }
    }
}

pub struct DownloadOrchestrator {
    extractor: Arc<dyn MediaExtractor>,
    settings: FetchSettings,
}

impl DownloadOrchestrator {
    pub fn new(extractor: Arc<dyn MediaExtractor>, settings: FetchSettings) -> Self {
        Self { extractor, settings }
    }

    /// Options for a regular (possibly segmented) download
    pub fn general_options(&self, output_dir: &Path, format_selector: &str) -> ExtractorOptions {
        let s = &self.settings;
        let mut options = ExtractorOptions::default()
            .with_format(format_selector)
            .with_output(display_path(&output_dir.join(OUTPUT_TEMPLATE)))
            .with_header("User-Agent", DESKTOP_USER_AGENT)
            .with_headers(CDN_HEADERS)
            .with_header("Connection", "keep-alive")
            .with_cookies(s.cookies.clone())
            .with_proxy(s.proxy.clone())
            .with_fragment_retries(s.fragment_retries)
            .with_retries(s.retries)
            .with_file_access_retries(s.file_access_retries)
            .with_extractor_retries(s.extractor_retries)
            .with_socket_timeout(s.socket_timeout)
            .with_concurrent_fragments(s.concurrent_fragments)
            .with_http_chunk_size(s.http_chunk_size)
            .with_abort_on_unavailable_fragment(true)
            .with_hls_native(true)
            .with_embed_subtitles(s.embed_subtitles);

        if let Some(country) = &s.geo_bypass_country {
            options = options.with_geo_bypass(Some(country.clone()));
        }
        options
    }

    /// Options for a direct Vimeo CDN chunk download
    pub fn chunk_options(&self, output_dir: &Path, chunk: &ChunkInfo) -> ExtractorOptions {
        ExtractorOptions::default()
            .with_format("best")
            .with_output(display_path(&output_dir.join(chunk.download_filename())))
            .with_header("User-Agent", DESKTOP_USER_AGENT)
            .with_headers(CDN_HEADERS)
            .with_proxy(self.settings.proxy.clone())
            .with_retries(10)
            .with_socket_timeout(30)
            .with_ignore_errors(true)
    }

    /// Download `url` into `output_dir`. Returns the final file path, or
    /// `output_dir` when the extractor did not report one.
    pub async fn fetch(
        &self,
        url: &str,
        output_dir: &Path,
        format_selector: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError> {
        ensure_output_dir(output_dir).await?;

        if let Some(chunk) = detect_chunk(url) {
            return self.fetch_chunk(url, output_dir, &chunk, progress).await;
        }

        let options = self.general_options(output_dir, format_selector);
        tracing::info!("Downloading {} with format '{}'", url, format_selector);

        match self.extractor.fetch(url, &options, progress).await {
            Ok(path) => Ok(path.unwrap_or_else(|| output_dir.to_path_buf())),
            Err(e) => {
                tracing::error!("Download failed: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_chunk(
        &self,
        url: &str,
        output_dir: &Path,
        chunk: &ChunkInfo,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError> {
        let options = self.chunk_options(output_dir, chunk);
        tracing::info!("Downloading chunk {}", chunk.download_filename());
        if let Some(size) = chunk.chunk_size() {
            tracing::debug!("Chunk size: {} bytes", size);
        }

        match self.extractor.fetch(url, &options, progress).await {
            Ok(path) => Ok(path.unwrap_or_else(|| output_dir.join(chunk.download_filename()))),
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Chunk download failed: {}", message);
                if let Some((cause, next)) = chunk_hint(&message) {
                    tracing::info!("{} {}", cause, next);
                }
                Err(e)
            }
        }
    }
}

async fn ensure_output_dir(path: &Path) -> Result<(), DownloadError> {
    if path.is_dir() {
        return Ok(());
    }

    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| DownloadError::OutputDir {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!("Directory created: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::ByteRange;

    struct Unused;

    #[async_trait::async_trait]
    impl MediaExtractor for Unused {
        fn name(&self) -> &'static str {
            "unused"
        }

        async fn probe(
            &self,
            _url: &str,
            _options: &ExtractorOptions,
        ) -> Result<crate::downloader::models::VideoMetadata, DownloadError> {
            unreachable!()
        }

        async fn fetch(
            &self,
            _url: &str,
            _options: &ExtractorOptions,
            _progress: &dyn ProgressSink,
        ) -> Result<Option<PathBuf>, DownloadError> {
            unreachable!()
        }
    }

    fn orchestrator() -> DownloadOrchestrator {
        DownloadOrchestrator::new(Arc::new(Unused), FetchSettings::default())
    }

    #[test]
    fn test_general_options() {
        let options = orchestrator().general_options(Path::new("/videos"), "best[height<=720]");
        assert_eq!(options.format.as_deref(), Some("best[height<=720]"));
        assert_eq!(options.output.as_deref(), Some("/videos/%(title).200s.%(ext)s"));
        assert_eq!(options.fragment_retries, Some(15));
        assert_eq!(options.retries, Some(10));
        assert_eq!(options.file_access_retries, Some(5));
        assert_eq!(options.extractor_retries, Some(5));
        assert_eq!(options.socket_timeout, Some(60));
        assert_eq!(options.concurrent_fragments, Some(1));
        assert_eq!(options.http_chunk_size, Some(10_485_760));
        assert!(options.abort_on_unavailable_fragment);
        assert!(options.hls_native);
        assert!(options.embed_subtitles);
        assert!(options.geo_bypass);
        assert_eq!(options.geo_bypass_country.as_deref(), Some("US"));
        assert!(!options.ignore_errors);
    }

    #[test]
    fn test_chunk_options() {
        let chunk = ChunkInfo {
            original_url: String::new(),
            video_id: None,
            range: ByteRange::new(0, 99),
            filename: Some("seg.mp4".to_string()),
        };
        let options = orchestrator().chunk_options(Path::new("/videos"), &chunk);
        assert_eq!(options.format.as_deref(), Some("best"));
        assert_eq!(options.output.as_deref(), Some("/videos/seg_chunk_0-99.mp4"));
        assert!(options
            .headers
            .contains(&("Referer".to_string(), "https://player.vimeo.com/".to_string())));
        assert_eq!(options.retries, Some(10));
        assert_eq!(options.socket_timeout, Some(30));
        assert!(options.ignore_errors);
        assert!(!options.geo_bypass);
    }
}
