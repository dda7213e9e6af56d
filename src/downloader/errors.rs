// Error types for probing and fetching through yt-dlp

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::extractors::diagnostics::{self, ErrorKind};

#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp binary missing or not runnable
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// yt-dlp ran and reported an error (raw message, `ERROR:` lines only)
    #[error("{0}")]
    Extraction(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Spawning or waiting on the child process failed
    #[error("Failed to run {program}: {source}")]
    Execution {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Probe process exceeded its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Destination directory could not be created
    #[error("Error creating directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DownloadError {
    /// Taxonomy bucket for user-facing suggestions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(msg) => diagnostics::diagnose(msg).kind,
            _ => ErrorKind::General,
        }
    }
}

// yt-dlp stderr arrives as plain text
impl From<String> for DownloadError {
    fn from(stderr: String) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("command not found") || lower.contains("no such file or directory") {
            return Self::ToolNotFound(stderr);
        }

        Self::Extraction(extract_error_message(&stderr))
    }
}

/// Keep the `ERROR:` lines of yt-dlp stderr, or the whole trimmed text
/// when there are none.
pub fn extract_error_message(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if errors.is_empty() {
        stderr.trim().to_string()
    } else {
        errors.join("\n")
    }
}
