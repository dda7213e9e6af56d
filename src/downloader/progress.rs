// Download progress - parsing yt-dlp output and rendering it

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

/// Prefix of the JSON progress lines requested via `--progress-template`
pub const PROGRESS_MARKER: &str = "[progress] ";
/// Prefix of the final file path printed via `--print after_move:`
pub const SAVED_MARKER: &str = "[saved] ";

/// One progress notification from the extractor
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// HLS/DASH fragment counter
    Fragment { current: u64, total: u64 },
    /// Percentage of the byte count, 0-100
    Percent(f64),
    Bytes { downloaded: u64, total: Option<u64> },
    /// One file finished downloading (before merging)
    Finished { filename: Option<String> },
    /// Final path after post-processing
    Saved(PathBuf),
}

/// Receives progress while a fetch runs
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards all events
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

// Subset of yt-dlp's progress hook dict; every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProgress {
    status: Option<String>,
    filename: Option<String>,
    fragment_index: Option<f64>,
    fragment_count: Option<f64>,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    #[serde(rename = "_percent_str")]
    percent_str: Option<String>,
}

lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref TEXT_PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%(?:.*?\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
    static ref PERCENT_RE: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap();
}

/// Parse one stdout line from yt-dlp. Unrecognised lines give `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();

    if let Some(path) = line.strip_prefix(SAVED_MARKER) {
        let path = path.trim();
        return (!path.is_empty() && path != "NA").then(|| ProgressEvent::Saved(PathBuf::from(path)));
    }

    if let Some(json) = line.strip_prefix(PROGRESS_MARKER) {
        let raw: RawProgress = serde_json::from_str(json).ok()?;
        return from_raw(raw);
    }

    // Default yt-dlp output, seen with builds that ignore the template
    let caps = TEXT_PROGRESS_RE.captures(line)?;
    if let (Some(current), Some(total)) = (caps.get(2), caps.get(3)) {
        if let (Ok(current), Ok(total)) = (current.as_str().parse(), total.as_str().parse()) {
            return Some(ProgressEvent::Fragment { current, total });
        }
    }
    caps[1].parse().ok().map(ProgressEvent::Percent)
}

fn from_raw(raw: RawProgress) -> Option<ProgressEvent> {
    match raw.status.as_deref() {
        Some("finished") => Some(ProgressEvent::Finished { filename: raw.filename }),
        Some("downloading") | None => {
            if let (Some(current), Some(total)) = (raw.fragment_index, raw.fragment_count) {
                if total > 0.0 {
                    return Some(ProgressEvent::Fragment {
                        current: current as u64,
                        total: total as u64,
                    });
                }
            }

            if let Some(percent) = raw
                .percent_str
                .as_deref()
                .and_then(|s| PERCENT_RE.captures(s))
                .and_then(|caps| caps[1].parse().ok())
            {
                return Some(ProgressEvent::Percent(percent));
            }

            raw.downloaded_bytes.map(|downloaded| ProgressEvent::Bytes {
                downloaded: downloaded as u64,
                total: raw.total_bytes.or(raw.total_bytes_estimate).map(|t| t as u64),
            })
        }
        Some(_) => None,
    }
}

/// Terminal progress bar for interactive fetches
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Fragment { current, total } => {
                let percent = (*current as f64 / *total as f64) * 100.0;
                self.bar.set_length(*total);
                self.bar.set_position(*current);
                self.bar.set_message(format!(
                    "Downloading chunk {}/{} ({:.1}%)",
                    current, total, percent
                ));
            }
            ProgressEvent::Percent(percent) => {
                self.bar.set_length(1000);
                self.bar.set_position((percent * 10.0).clamp(0.0, 1000.0) as u64);
                self.bar.set_message(format!("Downloading: {:.1}%", percent));
            }
            ProgressEvent::Bytes { downloaded, total } => {
                match total {
                    Some(total) if *total > 0 => {
                        self.bar.set_length(*total);
                        self.bar.set_position((*downloaded).min(*total));
                    }
                    _ => self.bar.set_position(0),
                }
                let total = total.map_or_else(|| "?".to_string(), format_bytes);
                self.bar
                    .set_message(format!("Downloaded: {} / {}", format_bytes(*downloaded), total));
            }
            ProgressEvent::Finished { filename } => {
                self.bar.println(format!(
                    "Download finished: {}",
                    filename.as_deref().unwrap_or("(unknown file)")
                ));
            }
            ProgressEvent::Saved(path) => {
                self.bar.println(format!("Saved: {}", path.display()));
            }
        }
    }
}

/// Format byte count for display
pub fn format_bytes(bytes: u64) -> String {
    let mb = bytes as f64 / 1_048_576.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if mb >= 1.0 {
        format!("{:.1} MB", mb)
    } else {
        format!("{:.0} KB", bytes as f64 / 1024.0)
    }
}
