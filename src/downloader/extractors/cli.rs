// CLI MediaExtractor - drives the native `yt-dlp` binary
//
// Probes run `--dump-json` and are collected in one go; fetches stream
// stdout/stderr line by line so progress can be forwarded while the
// download runs. In quiet mode (implied by `--print`) yt-dlp writes
// progress to stderr, so both pipes are parsed.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use super::traits::{CookieSource, ExtractorOptions, MediaExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::VideoMetadata;
use crate::downloader::progress::{
    parse_progress_line, ProgressEvent, ProgressSink, PROGRESS_MARKER, SAVED_MARKER,
};
use crate::downloader::utils::{run_output_with_timeout, spawn_error};

/// Default budget for one probe call
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;

/// yt-dlp binary adapter
pub struct YtDlpCli {
    program: String,
    probe_timeout_secs: u64,
}

impl YtDlpCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }

    pub fn with_probe_timeout(mut self, seconds: u64) -> Self {
        self.probe_timeout_secs = seconds;
        self
    }

    /// Arguments for a read-only metadata dump
    pub fn probe_args(url: &str, options: &ExtractorOptions) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        Self::push_common_args(&mut args, options);
        if options.flat {
            args.push("--flat-playlist".to_string());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Arguments for a download with machine-readable progress
    pub fn fetch_args(url: &str, options: &ExtractorOptions) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-simulate".to_string(),
            "--progress-template".to_string(),
            format!("download:{}%(progress)j", PROGRESS_MARKER),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", SAVED_MARKER),
        ];

        if let Some(format) = &options.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }
        if let Some(output) = &options.output {
            args.push("-o".to_string());
            args.push(output.clone());
        }

        Self::push_common_args(&mut args, options);

        if let Some(n) = options.concurrent_fragments {
            args.push("--concurrent-fragments".to_string());
            args.push(n.to_string());
        }
        if let Some(size) = options.http_chunk_size {
            args.push("--http-chunk-size".to_string());
            args.push(size.to_string());
        }
        if let Some(n) = options.file_access_retries {
            args.push("--file-access-retries".to_string());
            args.push(n.to_string());
        }
        if options.abort_on_unavailable_fragment {
            args.push("--abort-on-unavailable-fragments".to_string());
        }
        if options.ignore_errors {
            args.push("--ignore-errors".to_string());
        }
        if options.embed_subtitles {
            args.push("--embed-subs".to_string());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn push_common_args(args: &mut Vec<String>, options: &ExtractorOptions) {
        for (name, value) in &options.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        // Cookies
        match &options.cookies {
            CookieSource::None => {}
            CookieSource::Browser(browser) => {
                args.push("--cookies-from-browser".to_string());
                args.push(browser.clone());
            }
            CookieSource::File(path) => {
                args.push("--cookies".to_string());
                args.push(path.to_string_lossy().into_owned());
            }
        }

        // Proxy
        if let Some(proxy) = &options.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(n) = options.retries {
            args.push("--retries".to_string());
            args.push(n.to_string());
        }
        if let Some(n) = options.fragment_retries {
            args.push("--fragment-retries".to_string());
            args.push(n.to_string());
        }
        if let Some(n) = options.extractor_retries {
            args.push("--extractor-retries".to_string());
            args.push(n.to_string());
        }
        if let Some(secs) = options.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(secs.to_string());
        }

        if options.geo_bypass {
            args.push("--xff".to_string());
            args.push(
                options
                    .geo_bypass_country
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
            );
        }

        if options.hls_native {
            args.push("--downloader".to_string());
            args.push("m3u8:native".to_string());
            args.push("--no-hls-use-mpegts".to_string());
        }
    }

    /// Parse `--dump-json` output. yt-dlp prints one object per line; the
    /// first one is the requested video.
    pub fn parse_json(stdout: &[u8]) -> Result<VideoMetadata, DownloadError> {
        let text = String::from_utf8_lossy(stdout);
        let line = text
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with('{'))
            .ok_or_else(|| DownloadError::Parse("No JSON in yt-dlp output".to_string()))?;

        serde_json::from_str(line).map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))
    }

    fn failure_from(stderr: &str, status: std::process::ExitStatus) -> DownloadError {
        if stderr.trim().is_empty() {
            DownloadError::Extraction(format!("yt-dlp exited with {}", status))
        } else {
            DownloadError::from(stderr.to_string())
        }
    }
}

// One output line: forward progress, remember the final path
fn handle_line(line: &str, progress: &dyn ProgressSink, saved: &mut Option<PathBuf>) -> bool {
    match parse_progress_line(line) {
        Some(event) => {
            if let ProgressEvent::Saved(path) = &event {
                *saved = Some(path.clone());
            }
            progress.on_progress(&event);
            true
        }
        None => false,
    }
}

#[async_trait]
impl MediaExtractor for YtDlpCli {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<VideoMetadata, DownloadError> {
        let args = Self::probe_args(url, options);
        let output = run_output_with_timeout(&self.program, &args, self.probe_timeout_secs).await?;

        if output.status.success() {
            Self::parse_json(&output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Self::failure_from(&stderr, output.status))
        }
    }

    async fn fetch(
        &self,
        url: &str,
        options: &ExtractorOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let args = Self::fetch_args(url, options);
        tracing::debug!("Running {} {}", self.program, args.join(" "));

        // Dropping the child (e.g. on Ctrl-C) kills yt-dlp
        let mut child = TokioCommand::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| spawn_error(&self.program, source))?;

        let exec_err = |source| DownloadError::Execution {
            program: self.program.clone(),
            source,
        };
        let not_captured = || std::io::Error::new(std::io::ErrorKind::Other, "pipe not captured");

        let stdout = child.stdout.take().ok_or_else(|| exec_err(not_captured()))?;
        let stderr = child.stderr.take().ok_or_else(|| exec_err(not_captured()))?;
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let (mut out_open, mut err_open) = (true, true);

        let mut saved = None;
        let mut stderr_text = String::new();

        while out_open || err_open {
            tokio::select! {
                line = out_lines.next_line(), if out_open => match line {
                    Ok(Some(line)) => {
                        if !handle_line(&line, progress, &mut saved) {
                            tracing::trace!("yt-dlp: {}", line);
                        }
                    }
                    Ok(None) => out_open = false,
                    Err(e) => {
                        tracing::warn!("Failed to read yt-dlp stdout: {}", e);
                        out_open = false;
                    }
                },
                line = err_lines.next_line(), if err_open => match line {
                    Ok(Some(line)) => {
                        if !handle_line(&line, progress, &mut saved) {
                            tracing::debug!("yt-dlp stderr: {}", line);
                            stderr_text.push_str(&line);
                            stderr_text.push('\n');
                        }
                    }
                    Ok(None) => err_open = false,
                    Err(e) => {
                        tracing::warn!("Failed to read yt-dlp stderr: {}", e);
                        err_open = false;
                    }
                },
            }
        }

        let status = child.wait().await.map_err(exec_err)?;
        if !status.success() {
            return Err(Self::failure_from(&stderr_text, status));
        }

        // --ignore-errors exits 0 even when nothing was written
        if saved.is_none() && stderr_text.contains("ERROR:") {
            return Err(DownloadError::from(stderr_text));
        }

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn test_probe_args_are_read_only() {
        let options = ExtractorOptions::default()
            .with_header("User-Agent", "UA")
            .with_cookies(CookieSource::Browser("firefox".to_string()))
            .with_flat(true);
        let args = YtDlpCli::probe_args("https://vimeo.com/1", &options);

        assert_eq!(args[0], "--dump-json");
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(!args.contains(&"-o".to_string()));
        assert_eq!(pair(&args, "--add-header").as_deref(), Some("User-Agent:UA"));
        assert_eq!(pair(&args, "--cookies-from-browser").as_deref(), Some("firefox"));
        assert_eq!(args.last().map(String::as_str), Some("https://vimeo.com/1"));
        assert_eq!(args[args.len() - 2], "--");
    }

    #[test]
    fn test_fetch_args_cover_options() {
        let options = ExtractorOptions::default()
            .with_format("best[height<=720]")
            .with_output("/videos/%(title).200s.%(ext)s")
            .with_fragment_retries(15)
            .with_retries(10)
            .with_file_access_retries(5)
            .with_socket_timeout(60)
            .with_concurrent_fragments(1)
            .with_http_chunk_size(10_485_760)
            .with_geo_bypass(Some("US".to_string()))
            .with_hls_native(true)
            .with_abort_on_unavailable_fragment(true)
            .with_embed_subtitles(true);
        let args = YtDlpCli::fetch_args("https://example.com/a.m3u8", &options);

        assert_eq!(pair(&args, "-f").as_deref(), Some("best[height<=720]"));
        assert_eq!(pair(&args, "-o").as_deref(), Some("/videos/%(title).200s.%(ext)s"));
        assert_eq!(pair(&args, "--fragment-retries").as_deref(), Some("15"));
        assert_eq!(pair(&args, "--retries").as_deref(), Some("10"));
        assert_eq!(pair(&args, "--file-access-retries").as_deref(), Some("5"));
        assert_eq!(pair(&args, "--socket-timeout").as_deref(), Some("60"));
        assert_eq!(pair(&args, "--concurrent-fragments").as_deref(), Some("1"));
        assert_eq!(pair(&args, "--http-chunk-size").as_deref(), Some("10485760"));
        assert_eq!(pair(&args, "--xff").as_deref(), Some("US"));
        assert_eq!(pair(&args, "--downloader").as_deref(), Some("m3u8:native"));
        assert!(args.contains(&"--no-hls-use-mpegts".to_string()));
        assert!(args.contains(&"--abort-on-unavailable-fragments".to_string()));
        assert!(args.contains(&"--embed-subs".to_string()));
        assert!(!args.contains(&"--ignore-errors".to_string()));
        assert_eq!(
            pair(&args, "--progress-template").as_deref(),
            Some("download:[progress] %(progress)j")
        );
    }

    #[test]
    fn test_cookie_file_and_proxy() {
        let options = ExtractorOptions::default()
            .with_cookies(CookieSource::File(PathBuf::from("/tmp/cookies.txt")))
            .with_proxy(Some("socks5h://127.0.0.1:1080".to_string()));
        let args = YtDlpCli::probe_args("u", &options);
        assert_eq!(pair(&args, "--cookies").as_deref(), Some("/tmp/cookies.txt"));
        assert_eq!(pair(&args, "--proxy").as_deref(), Some("socks5h://127.0.0.1:1080"));
    }

    #[test]
    fn test_parse_json_skips_noise() {
        let stdout = b"[debug] something\n{\"id\": \"1\", \"title\": \"Clip\", \"duration\": 12.5}\n";
        let meta = YtDlpCli::parse_json(stdout).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Clip"));
        assert_eq!(meta.duration, Some(12.5));
        assert!(meta.formats.is_empty());
    }

    #[test]
    fn test_parse_json_errors() {
        assert!(matches!(YtDlpCli::parse_json(b""), Err(DownloadError::Parse(_))));
        assert!(matches!(YtDlpCli::parse_json(b"{broken"), Err(DownloadError::Parse(_))));
    }

    #[tokio::test]
    async fn test_probe_with_missing_binary() {
        let cli = YtDlpCli::new("/nonexistent/yt-dlp");
        let result = cli.probe("https://vimeo.com/1", &ExtractorOptions::default()).await;
        assert!(matches!(result, Err(DownloadError::ToolNotFound(_))));
    }
}
