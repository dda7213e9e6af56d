// Failure diagnostics - maps yt-dlp error text to a small taxonomy
//
// yt-dlp error messages are free text, not a stable contract, so matching
// is heuristic. All substring rules live in the tables below.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failed probe or fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Vimeo OAuth token rejected
    #[serde(rename = "oauth_error")]
    OAuth,

    /// Video only plays when embedded on its host page
    #[serde(rename = "embed_only")]
    EmbedOnly,

    #[serde(rename = "private")]
    Private,

    /// Deleted, blocked or geo-restricted
    #[serde(rename = "unavailable")]
    Unavailable,

    #[serde(rename = "general")]
    General,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth_error",
            Self::EmbedOnly => "embed_only",
            Self::Private => "private",
            Self::Unavailable => "unavailable",
            Self::General => "general",
        }
    }

    /// Extra troubleshooting steps shown by the shell
    pub fn troubleshooting(&self) -> &'static [&'static str] {
        match self {
            Self::OAuth => &[
                "Try using a different Vimeo URL format",
                "Look for the webpage that embeds this video",
                "Some Vimeo videos require special permissions",
                "The video may be restricted or private",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure with user guidance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub kind: ErrorKind,
    pub suggestion: &'static str,
    pub help: &'static str,
}

struct Rule {
    needle: &'static str,
    kind: ErrorKind,
    suggestion: &'static str,
    help: &'static str,
}

// Checked top to bottom, first match wins
const RULES: &[Rule] = &[
    Rule {
        needle: "oauth token",
        kind: ErrorKind::OAuth,
        suggestion: "Vimeo OAuth authentication failed. This video may require special permissions or be restricted.",
        help: "Try using the webpage URL that embeds this video instead of the direct player URL.",
    },
    Rule {
        needle: "embed-only video",
        kind: ErrorKind::EmbedOnly,
        suggestion: "This video can only be played when embedded. Find the webpage that shows this video.",
        help: "Look for articles or pages that display this video and use that URL instead.",
    },
    Rule {
        needle: "private video",
        kind: ErrorKind::Private,
        suggestion: "This video is private and cannot be downloaded.",
        help: "Only the video owner can access private videos.",
    },
    Rule {
        needle: "unavailable",
        kind: ErrorKind::Unavailable,
        suggestion: "Video is unavailable. May be deleted, private, or geo-restricted.",
        help: "Check if the video exists and is accessible from your location.",
    },
];

const GENERAL: Diagnosis = Diagnosis {
    kind: ErrorKind::General,
    suggestion: "Unknown error occurred. The video may have restrictions or be inaccessible.",
    help: "Try a different video URL or check your internet connection.",
};

/// Phrases after which no other probe profile can succeed
const TERMINAL_PHRASES: &[&str] = &["private video", "video removed", "this video is unavailable"];

/// Classify an error message
pub fn diagnose(message: &str) -> Diagnosis {
    let lower = message.to_lowercase();

    RULES
        .iter()
        .find(|rule| lower.contains(rule.needle))
        .map(|rule| Diagnosis {
            kind: rule.kind,
            suggestion: rule.suggestion,
            help: rule.help,
        })
        .unwrap_or(GENERAL)
}

/// True when retrying with another profile is pointless
pub fn is_terminal(message: &str) -> bool {
    let lower = message.to_lowercase();
    TERMINAL_PHRASES.iter().any(|p| lower.contains(p))
}

/// Hint for failed direct chunk downloads, as (cause, next step)
pub fn chunk_hint(message: &str) -> Option<(&'static str, &'static str)> {
    if message.contains("Requested format is not available") {
        Some((
            "This chunk URL might require the full video context.",
            "Try to find the original video page that contains this chunk.",
        ))
    } else if message.contains("HTTP Error 403") || message.contains("HTTP Error 401") {
        Some((
            "Authentication/permission error.",
            "This chunk might be expired or require specific cookies.",
        ))
    } else if message.contains("HTTP Error 404") {
        Some((
            "Chunk not found.",
            "The chunk URL might be expired or incorrect.",
        ))
    } else {
        None
    }
}
