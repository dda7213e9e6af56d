// Interactive shell - prompts, probe, format menu, download
//
// Generic over its input and output so the whole flow can be driven
// from scripted bytes in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::downloader::chunk::detect_chunk;
use crate::downloader::extractors::diagnostics::{chunk_hint, diagnose, ErrorKind};
use crate::downloader::extractors::ProbeEngine;
use crate::downloader::fallback::{alternatives, from_chunk};
use crate::downloader::format_selector::{FormatSelector, FALLBACK_SELECTOR};
use crate::downloader::models::{Platform, ProbeFailure, ProbeOutcome, VideoMetadata, VideoReference};
use crate::downloader::orchestrator::DownloadOrchestrator;
use crate::downloader::progress::{ConsoleProgress, NoProgress, ProgressSink};
use crate::downloader::utils::expand_home;

const RULE: &str = "============================================================";

/// How a shell session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Downloaded(PathBuf),
    Cancelled,
    DownloadFailed,
    /// Probe failed and no alternative URL was accepted
    ProbeFailed,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Downloaded(_) | Self::Cancelled | Self::ProbeFailed => 0,
            Self::DownloadFailed => 1,
        }
    }
}

/// Input ended before the flow finished
#[derive(Debug, Error)]
#[error("input closed")]
struct InputClosed;

pub struct Shell<R, W> {
    input: R,
    out: W,
    probe: ProbeEngine,
    orchestrator: DownloadOrchestrator,
    default_output_dir: String,
    default_format: String,
    console_progress: bool,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, probe: ProbeEngine, orchestrator: DownloadOrchestrator) -> Self {
        Self {
            input,
            out,
            probe,
            orchestrator,
            default_output_dir: ".".to_string(),
            default_format: FALLBACK_SELECTOR.to_string(),
            console_progress: false,
        }
    }

    pub fn with_default_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.default_output_dir = dir.into();
        self
    }

    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    /// Draw an indicatif bar during downloads
    pub fn with_console_progress(mut self, enabled: bool) -> Self {
        self.console_progress = enabled;
        self
    }

    /// Run one session. `initial_url` pre-fills the first prompt.
    pub async fn run(&mut self, initial_url: Option<String>) -> Result<Outcome> {
        match self.session(initial_url).await {
            Err(e) if e.is::<InputClosed>() => {
                writeln!(self.out, "\nInput closed, nothing downloaded.")?;
                Ok(Outcome::Cancelled)
            }
            other => other,
        }
    }

    async fn session(&mut self, initial_url: Option<String>) -> Result<Outcome> {
        self.banner()?;

        writeln!(self.out, "\n-- STEP 1: Video URL")?;
        let reference = self.read_url(initial_url).await?;

        writeln!(self.out, "\nTesting video URL accessibility...")?;
        let (url, metadata) = match self.probe.probe(reference.raw_url()).await {
            ProbeOutcome::Success { metadata, .. } => {
                writeln!(self.out, "Video URL is accessible!")?;
                (reference.raw_url().to_string(), metadata)
            }
            ProbeOutcome::Failure(failure) => {
                self.report_failure(&failure)?;
                match self.try_alternatives(reference.raw_url()).await? {
                    Some(found) => found,
                    None => return Ok(Outcome::ProbeFailed),
                }
            }
        };
        self.show_metadata(&metadata)?;

        writeln!(self.out, "\n-- STEP 2: Video format")?;
        let format_selector = self.choose_format(&metadata).await?;

        writeln!(self.out, "\n-- STEP 3: Output directory")?;
        let output_dir = self.choose_output_dir().await?;

        writeln!(self.out, "\n{}", RULE)?;
        writeln!(self.out, "DOWNLOAD SUMMARY:")?;
        writeln!(self.out, "URL: {}", url)?;
        writeln!(self.out, "Format: {}", format_selector)?;
        writeln!(self.out, "Destination: {}", absolute(&output_dir).display())?;
        writeln!(self.out, "{}", RULE)?;

        if !self.confirm("\nStart download? (Y/n): ", true).await? {
            writeln!(self.out, "Download cancelled by user.")?;
            return Ok(Outcome::Cancelled);
        }

        writeln!(self.out, "\nStarting download...")?;
        match self.download(&url, &output_dir, &format_selector).await? {
            Ok(path) => Ok(Outcome::Downloaded(path)),
            Err(message) => {
                if detect_chunk(&url).is_some() {
                    if let Some((cause, next)) = chunk_hint(&message) {
                        writeln!(self.out, "Hint: {}", cause)?;
                        writeln!(self.out, "Suggestion: {}", next)?;
                    }
                    writeln!(self.out, "\nChunk download failed. Would you like to try finding the full video?")?;
                    if self.confirm("Search for full video from chunk? (y/N): ", false).await? {
                        return self.recover_from_chunk(&url, &output_dir).await;
                    }
                }
                writeln!(self.out, "\nDownload failed. Check the URL and try again.")?;
                Ok(Outcome::DownloadFailed)
            }
        }
    }

    fn banner(&mut self) -> Result<()> {
        writeln!(self.out, "vidgrab - Universal Video Downloader")?;
        writeln!(self.out, "{}", RULE)?;
        writeln!(self.out, "Supports: YouTube, Vimeo, HLS/DASH streams, Direct videos")?;
        writeln!(self.out, "Handles segmented/chunked videos automatically")?;
        writeln!(self.out, "{}", RULE)?;
        Ok(())
    }

    async fn read_url(&mut self, initial_url: Option<String>) -> Result<VideoReference> {
        let mut pending = initial_url;
        loop {
            let raw = match pending.take() {
                Some(url) => url.trim().to_string(),
                None => {
                    self.prompt("\nEnter video URL (YouTube, Vimeo, or direct video): ")
                        .await?
                }
            };

            if raw.is_empty() {
                writeln!(self.out, "URL cannot be empty!")?;
                continue;
            }

            let reference = VideoReference::classify(&raw);
            match reference.platform() {
                Platform::Unknown => self.show_url_examples()?,
                Platform::Generic => {
                    writeln!(self.out, "Valid video URL detected!")?;
                    writeln!(self.out, "This appears to be a direct video URL or streaming link.")?;
                    return Ok(reference);
                }
                platform => {
                    writeln!(self.out, "Valid {} URL!", platform.label())?;
                    return Ok(reference);
                }
            }
        }
    }

    fn show_url_examples(&mut self) -> Result<()> {
        writeln!(self.out, "Invalid URL! Please enter a valid video URL.")?;
        writeln!(self.out, "   Valid examples:")?;
        writeln!(self.out, "   YouTube:")?;
        writeln!(self.out, "   - https://www.youtube.com/watch?v=VIDEO_ID")?;
        writeln!(self.out, "   - https://youtu.be/VIDEO_ID")?;
        writeln!(self.out, "   Vimeo:")?;
        writeln!(self.out, "   - https://vimeo.com/123456789")?;
        writeln!(self.out, "   - https://player.vimeo.com/video/123456789")?;
        writeln!(self.out, "   Direct/Streaming videos:")?;
        writeln!(self.out, "   - https://example.com/video.mp4")?;
        writeln!(self.out, "   - https://example.com/stream.m3u8 (HLS)")?;
        writeln!(self.out, "   - https://example.com/manifest.mpd (DASH)")?;
        Ok(())
    }

    fn report_failure(&mut self, failure: &ProbeFailure) -> Result<()> {
        writeln!(self.out, "Cannot access video: {}", failure.message)?;
        if let Some(suggestion) = &failure.suggestion {
            writeln!(self.out, "Suggestion: {}", suggestion)?;
        }
        if let Some(help) = &failure.help {
            writeln!(self.out, "Help: {}", help)?;
        }

        let steps = failure.kind.troubleshooting();
        if !steps.is_empty() {
            writeln!(self.out, "\nTroubleshooting:")?;
            for (i, step) in steps.iter().enumerate() {
                writeln!(self.out, "   {}. {}", i + 1, step)?;
            }
        }
        Ok(())
    }

    /// Probe alternate URLs; the user confirms before one is adopted
    async fn try_alternatives(&mut self, url: &str) -> Result<Option<(String, VideoMetadata)>> {
        for candidate in alternatives(url) {
            writeln!(self.out, "\nTrying alternative URL: {}", candidate)?;
            match self.probe.probe(&candidate).await {
                ProbeOutcome::Success { metadata, .. } => {
                    writeln!(self.out, "Alternative is accessible: {}", metadata.title_or_default())?;
                    if self.confirm("Use this URL instead? (y/N): ", false).await? {
                        return Ok(Some((candidate, metadata)));
                    }
                }
                ProbeOutcome::Failure(failure) => {
                    writeln!(self.out, "Not accessible: {}", truncate(&failure.message, 80))?;
                }
            }
        }
        Ok(None)
    }

    fn show_metadata(&mut self, metadata: &VideoMetadata) -> Result<()> {
        writeln!(self.out, "Title: {}", metadata.title_or_default())?;
        if let Some(duration) = metadata.duration {
            let secs = duration.max(0.0) as u64;
            writeln!(self.out, "Duration: {}:{:02} ({}s)", secs / 60, secs % 60, secs)?;
        }
        if let Some(uploader) = &metadata.uploader {
            writeln!(self.out, "Channel: {}", uploader)?;
        }
        if let Some(views) = metadata.view_count {
            writeln!(self.out, "Views: {}", views)?;
        }
        if let Some(date) = &metadata.upload_date {
            writeln!(self.out, "Upload date: {}", date)?;
        }

        let segmented = metadata.segmented_format_count();
        if segmented > 0 {
            writeln!(self.out, "Detected {} segmented/chunked formats", segmented)?;
            writeln!(
                self.out,
                "This video uses chunks - optimized download settings will be applied"
            )?;
        }
        Ok(())
    }

    async fn choose_format(&mut self, metadata: &VideoMetadata) -> Result<String> {
        let descriptors = FormatSelector::descriptors(&metadata.formats);
        if descriptors.is_empty() {
            writeln!(
                self.out,
                "Could not get formats. Using default quality ({}).",
                self.default_format
            )?;
            return Ok(self.default_format.clone());
        }

        writeln!(self.out, "\nAvailable formats:")?;
        for line in FormatSelector::menu(&descriptors) {
            writeln!(self.out, "{}", line)?;
        }

        let max = FormatSelector::offered(&descriptors).len();
        loop {
            let answer = self
                .prompt(&format!("\nChoose format (0-{}): ", max))
                .await?;
            match FormatSelector::parse_choice(&answer, &descriptors) {
                Ok(choice) => {
                    if let Some(selector) = FormatSelector::selector_for(choice, &descriptors) {
                        writeln!(self.out, "Selected: {}", selector)?;
                        return Ok(selector);
                    }
                }
                Err(e) => writeln!(self.out, "{}", e)?,
            }
        }
    }

    async fn choose_output_dir(&mut self) -> Result<PathBuf> {
        let default_dir = expand_home(&self.default_output_dir);
        writeln!(self.out, "Default directory: {}", absolute(&default_dir).display())?;

        loop {
            let answer = self
                .prompt("\nEnter directory path (or Enter to use default): ")
                .await?;
            if answer.is_empty() {
                return Ok(default_dir);
            }

            let dir = expand_home(&answer);
            if dir.exists() {
                if dir.is_dir() {
                    writeln!(self.out, "Directory selected: {}", absolute(&dir).display())?;
                    return Ok(dir);
                }
                writeln!(self.out, "The specified path is not a directory!")?;
                continue;
            }

            let question = format!("Directory '{}' does not exist. Create? (y/N): ", dir.display());
            if self.confirm(&question, false).await? {
                match tokio::fs::create_dir_all(&dir).await {
                    Ok(()) => {
                        writeln!(self.out, "Directory created: {}", absolute(&dir).display())?;
                        return Ok(dir);
                    }
                    Err(e) => writeln!(self.out, "Error creating directory: {}", e)?,
                }
            } else {
                writeln!(
                    self.out,
                    "Choose an existing directory or allow creation of a new one."
                )?;
            }
        }
    }

    /// Fetch and report. The inner error carries the raw message.
    async fn download(
        &mut self,
        url: &str,
        output_dir: &Path,
        format_selector: &str,
    ) -> Result<Result<PathBuf, String>> {
        let console = self.console_progress.then(ConsoleProgress::new);
        let sink: &dyn ProgressSink = match &console {
            Some(console) => console,
            None => &NoProgress,
        };

        let result = self
            .orchestrator
            .fetch(url, output_dir, format_selector, sink)
            .await;
        if let Some(console) = &console {
            console.finish();
        }

        match result {
            Ok(path) => {
                writeln!(self.out, "\nDownload completed successfully!")?;
                writeln!(self.out, "File saved to: {}", absolute(&path).display())?;
                Ok(Ok(path))
            }
            Err(e) => {
                let message = e.to_string();
                writeln!(self.out, "Download error: {}", message)?;
                if e.kind() != ErrorKind::General {
                    let diagnosis = diagnose(&message);
                    writeln!(self.out, "Suggestion: {}", diagnosis.suggestion)?;
                    writeln!(self.out, "Help: {}", diagnosis.help)?;
                }
                Ok(Err(message))
            }
        }
    }

    async fn recover_from_chunk(&mut self, url: &str, output_dir: &Path) -> Result<Outcome> {
        let Some(chunk) = detect_chunk(url) else {
            writeln!(self.out, "Not a recognized Vimeo chunk URL")?;
            return Ok(Outcome::DownloadFailed);
        };

        writeln!(self.out, "\nAttempting to find full video from chunk...")?;
        writeln!(
            self.out,
            "Chunk info: {}",
            chunk.video_id.as_deref().unwrap_or("unknown")
        )?;

        let suggestions = from_chunk(&chunk);
        if suggestions.is_empty() {
            writeln!(self.out, "Could not generate video URL suggestions from chunk")?;
            return Ok(Outcome::DownloadFailed);
        }

        writeln!(self.out, "Trying {} possible full video URLs...", suggestions.len())?;
        for (i, suggested) in suggestions.iter().enumerate() {
            writeln!(self.out, "\nAttempt {}: {}", i + 1, suggested)?;
            match self.probe.probe(suggested).await {
                ProbeOutcome::Success { metadata, .. } => {
                    writeln!(self.out, "Found accessible video!")?;
                    writeln!(self.out, "Title: {}", metadata.title_or_default())?;
                    writeln!(self.out, "\nThis might be the full video containing your chunk.")?;
                    if self.confirm("Download this full video? (y/N): ", false).await? {
                        writeln!(self.out, "Downloading full video...")?;
                        return Ok(match self.download(suggested, output_dir, FALLBACK_SELECTOR).await? {
                            Ok(path) => Outcome::Downloaded(path),
                            Err(_) => Outcome::DownloadFailed,
                        });
                    }
                    writeln!(self.out, "Skipping this video...")?;
                }
                ProbeOutcome::Failure(failure) => {
                    writeln!(self.out, "Not accessible: {}", truncate(&failure.message, 50))?;
                }
            }
        }

        writeln!(self.out, "Could not find the full video from chunk information")?;
        Ok(Outcome::DownloadFailed)
    }

    async fn prompt(&mut self, question: &str) -> Result<String> {
        write!(self.out, "{}", question)?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Err(InputClosed.into());
        }
        Ok(line.trim().to_string())
    }

    /// `y`/`yes` and `n`/`no`; anything else takes the default
    async fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool> {
        let answer = self.prompt(question).await?.to_lowercase();
        Ok(match answer.as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default_yes,
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
