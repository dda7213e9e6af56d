// URL classification - YouTube, Vimeo, generic video or unknown
//
// Pure functions: nothing here fails, unmatched or malformed input
// degrades to `Platform::Unknown`.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::chunk::CDN_CHUNK_HOST;
use super::models::Platform;

const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"];
const VIMEO_HOSTS: [&str; 3] = ["vimeo.com", "www.vimeo.com", "player.vimeo.com"];

const VIDEO_EXTENSIONS: [&str; 11] = [
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", // files
    ".m3u8", ".mpd", ".ts", ".m4s", // streaming
];

const STREAMING_INDICATORS: [&str; 5] = ["m3u8", "mpd", "segments", "chunks", "stream"];

// Deliberately broad: the probe chain decides whether a page really has video
const VIDEO_PAGE_INDICATORS: [&str; 10] = [
    "watch", "video", "play", "stream", "embed", "player", "aula", "lesson", "course", "lecture",
];

lazy_static! {
    // Only a scheme at the very start counts; nested URLs in a query do not
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap();
    // The trailing group stops an 11-char match inside a longer token
    static ref YOUTUBE_PATTERNS: [Regex; 2] = [
        Regex::new(
            r"(?:youtube\.com/watch\?v=|youtube\.com/embed/|youtu\.be/|youtube\.com/v/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)"
        ).unwrap(),
        Regex::new(r"youtube\.com/watch\?.*[&?]v=([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)").unwrap(),
    ];
    static ref VIMEO_PATTERNS: [Regex; 5] = [
        Regex::new(r"vimeo\.com/(\d+)(?:[^A-Za-z0-9_-]|$)").unwrap(),
        Regex::new(r"player\.vimeo\.com/video/(\d+)(?:[^A-Za-z0-9_-]|$)").unwrap(),
        Regex::new(r"player\.vimeo\.com/([a-f0-9-]{36})(?:[^A-Za-z0-9_-]|$)").unwrap(),
        Regex::new(r"vimeo\.com/channels/[\w-]+/(\d+)(?:[^A-Za-z0-9_-]|$)").unwrap(),
        Regex::new(r"vimeo\.com/groups/[\w-]+/videos/(\d+)(?:[^A-Za-z0-9_-]|$)").unwrap(),
    ];
}

/// Classify a raw, user-typed URL
pub fn classify(url: &str) -> Platform {
    let url = normalize(url);

    if is_youtube_url(&url) {
        Platform::YouTube
    } else if is_vimeo_url(&url) {
        Platform::Vimeo
    } else if is_generic_video_url(&url) {
        Platform::Generic
    } else {
        Platform::Unknown
    }
}

/// Trim and add `https://` when no scheme is present
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    if SCHEME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Lower-cased host, if the string parses as a URL
pub(crate) fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Lower-cased path; falls back to slicing the string when it does not parse
pub(crate) fn path_of(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.path().to_lowercase();
    }

    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    let rest = rest.split(['?', '#']).next().unwrap_or("");
    match rest.find('/') {
        Some(idx) => rest[idx..].to_lowercase(),
        None => String::new(),
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    let url = normalize(url);
    let Some(host) = host_of(&url) else {
        return false;
    };
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return false;
    }

    YOUTUBE_PATTERNS.iter().any(|re| re.is_match(&url))
}

pub fn is_vimeo_url(url: &str) -> bool {
    let url = normalize(url);
    let Some(host) = host_of(&url) else {
        return false;
    };
    if !VIMEO_HOSTS.contains(&host.as_str()) {
        return false;
    }

    VIMEO_PATTERNS.iter().any(|re| {
        re.captures(&url)
            .and_then(|caps| caps.get(1))
            .map_or(false, |id| {
                let id = id.as_str();
                id.chars().all(|c| c.is_ascii_digit()) || id.len() == 36
            })
    })
}

/// Direct files, stream manifests, CDN chunks and video-looking pages
pub fn is_generic_video_url(url: &str) -> bool {
    let url = normalize(url);
    let lower = url.to_lowercase();

    let path = path_of(&url);
    if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }

    if STREAMING_INDICATORS.iter().any(|i| lower.contains(i)) {
        return true;
    }

    let on_chunk_host = host_of(&url).map_or(false, |h| h.contains(CDN_CHUNK_HOST));
    if on_chunk_host && lower.contains("range=") {
        return true;
    }

    VIDEO_PAGE_INDICATORS.iter().any(|i| lower.contains(i))
}
