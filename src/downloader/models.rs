// Common data models for downloader

use serde::{Deserialize, Serialize};
use std::fmt;

use super::extractors::diagnostics::ErrorKind;

/// Platform a URL was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    YouTube,
    Vimeo,
    /// Direct file, stream manifest, or a page that looks like it hosts video
    Generic,
    Unknown,
}

impl Platform {
    /// Human-readable name for prompts
    pub fn label(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Vimeo => "Vimeo",
            Self::Generic => "Generic",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A raw URL together with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    raw_url: String,
    platform: Platform,
}

impl VideoReference {
    pub fn classify(raw_url: &str) -> Self {
        Self {
            raw_url: raw_url.trim().to_string(),
            platform: super::classifier::classify(raw_url),
        }
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

/// Inclusive byte range taken from a `range=` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Returns `None` when `end < start`
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Metadata recovered from a Vimeo CDN chunk URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub original_url: String,
    pub video_id: Option<String>,
    pub range: Option<ByteRange>,
    pub filename: Option<String>,
}

impl ChunkInfo {
    pub fn chunk_size(&self) -> Option<u64> {
        self.range.map(|r| r.size())
    }

    /// Local file name for a direct chunk download
    pub fn download_filename(&self) -> String {
        let filename = self.filename.as_deref().unwrap_or("vimeo_chunk.mp4");
        match self.range {
            Some(range) => {
                let stem = filename.strip_suffix(".mp4").unwrap_or(filename);
                format!("{}_chunk_{}-{}.mp4", stem, range.start, range.end)
            }
            None => filename.to_string(),
        }
    }
}

/// One entry of yt-dlp's `formats` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    pub format_id: String,
    pub ext: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub protocol: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub fragments: Option<Vec<serde_json::Value>>,
}

impl RawFormat {
    /// Get effective file size (exact or approximate)
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().map_or(true, |v| v != "none")
    }

    /// Delivered as HLS/DASH fragments rather than one file
    pub fn is_fragmented(&self) -> bool {
        if self.fragments.as_ref().map_or(false, |f| !f.is_empty()) {
            return true;
        }
        self.protocol
            .as_deref()
            .map_or(false, |p| p.starts_with("m3u8") || p.contains("dash"))
    }
}

/// Video information returned by a successful probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub webpage_url: Option<String>,
    pub formats: Vec<RawFormat>,
}

impl VideoMetadata {
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("N/A")
    }

    pub fn segmented_format_count(&self) -> usize {
        self.formats.iter().filter(|f| f.is_fragmented()).count()
    }
}

/// Failed probe with guidance for the user
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
    pub help: Option<String>,
}

/// Result of running the probe chain against one URL
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success {
        metadata: VideoMetadata,
        /// Name of the profile that succeeded
        profile: &'static str,
    },
    Failure(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        match self {
            Self::Success { metadata, .. } => Some(metadata),
            Self::Failure(_) => None,
        }
    }
}
