// FormatSelector - turns probed formats into a short menu and a yt-dlp selector
//
// One entry per resolution, highest first, at most MAX_CHOICES entries.
// HLS formats are selected by id so yt-dlp downloads a single stream
// instead of trying to merge.

use serde::{Deserialize, Serialize};

use super::models::RawFormat;

/// Most resolutions shown in the menu
pub const MAX_CHOICES: usize = 8;

/// Selector used when a video reports no formats
pub const FALLBACK_SELECTOR: &str = "best[height<=720]";

/// One menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub width: Option<u32>,
    pub height: u32,
    pub ext: String,
    /// Exact or approximate size in bytes
    pub filesize: Option<u64>,
    pub is_fragmented: bool,
}

impl FormatDescriptor {
    pub fn is_hls(&self) -> bool {
        self.format_id.contains("hls-")
    }

    /// e.g. `1920x1080 (mp4) (~52.3MB)`
    pub fn label(&self) -> String {
        let width = self
            .width
            .map_or_else(|| "N/A".to_string(), |w| w.to_string());
        let size = match self.filesize {
            Some(bytes) if bytes > 0 => format!(" (~{:.1}MB)", bytes as f64 / 1_048_576.0),
            _ => String::new(),
        };
        format!("{}x{} ({}){}", width, self.height, self.ext, size)
    }
}

/// Why a menu answer was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceError {
    NotANumber,
    OutOfRange { max: usize },
}

impl std::fmt::Display for ChoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotANumber => write!(f, "Enter a valid number!"),
            Self::OutOfRange { max } => {
                write!(f, "Invalid choice! Enter a number between 0 and {}.", max)
            }
        }
    }
}

/// Format selector with resolution dedup
pub struct FormatSelector;

impl FormatSelector {
    /// Video formats with a height, first one per height, highest first
    pub fn descriptors(formats: &[RawFormat]) -> Vec<FormatDescriptor> {
        let mut seen = std::collections::HashSet::new();
        let mut descriptors: Vec<FormatDescriptor> = formats
            .iter()
            .filter(|f| f.has_video())
            .filter_map(|f| {
                let height = f.height?;
                seen.insert(height).then(|| FormatDescriptor {
                    format_id: f.format_id.clone(),
                    width: f.width,
                    height,
                    ext: f.ext.clone().unwrap_or_else(|| "mp4".to_string()),
                    filesize: f.effective_size(),
                    is_fragmented: f.is_fragmented(),
                })
            })
            .collect();

        descriptors.sort_by(|a, b| b.height.cmp(&a.height));
        descriptors
    }

    /// The entries actually offered
    pub fn offered(descriptors: &[FormatDescriptor]) -> &[FormatDescriptor] {
        &descriptors[..descriptors.len().min(MAX_CHOICES)]
    }

    /// Menu lines, starting with choice 0
    pub fn menu(descriptors: &[FormatDescriptor]) -> Vec<String> {
        let mut lines = vec!["0. Best quality available (recommended)".to_string()];
        lines.extend(
            Self::offered(descriptors)
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}. {}", i + 1, d.label())),
        );
        lines
    }

    /// Parse a typed menu answer
    pub fn parse_choice(input: &str, descriptors: &[FormatDescriptor]) -> Result<usize, ChoiceError> {
        let max = Self::offered(descriptors).len();
        let choice: usize = input.trim().parse().map_err(|_| ChoiceError::NotANumber)?;
        if choice > max {
            return Err(ChoiceError::OutOfRange { max });
        }
        Ok(choice)
    }

    /// yt-dlp selector for a validated choice
    pub fn selector_for(choice: usize, descriptors: &[FormatDescriptor]) -> Option<String> {
        let offered = Self::offered(descriptors);

        if choice == 0 {
            if descriptors.iter().any(FormatDescriptor::is_hls) {
                // Highest single HLS stream avoids an ffmpeg merge
                return Some(
                    descriptors
                        .first()
                        .map_or_else(|| "best".to_string(), |d| d.format_id.clone()),
                );
            }
            return Some("best".to_string());
        }

        let selected = offered.get(choice - 1)?;
        if selected.is_hls() {
            Some(selected.format_id.clone())
        } else {
            Some(format!("best[height<={}]", selected.height))
        }
    }
}
