// Alternate URLs to try when a probe fails

use lazy_static::lazy_static;
use regex::Regex;

use super::chunk::detect_chunk;
use super::classifier::{host_of, normalize};
use super::models::ChunkInfo;

lazy_static! {
    static ref EMBED_ID_RE: Regex = Regex::new(r"/video/(\d+)").unwrap();
    static ref CANONICAL_ID_RE: Regex = Regex::new(r"vimeo\.com/(\d+)").unwrap();
    static ref DIGITS_RE: Regex = Regex::new(r"\d+").unwrap();
}

/// Candidate URLs for `url`, most likely first. Empty for anything
/// without Vimeo structure.
pub fn alternatives(url: &str) -> impl Iterator<Item = String> {
    let normalized = normalize(url);
    let host = host_of(&normalized).unwrap_or_default();

    let mut candidates = Vec::new();

    if host == "player.vimeo.com" {
        if let Some(caps) = EMBED_ID_RE.captures(&normalized) {
            let id = &caps[1];
            candidates.push(format!("https://vimeo.com/{}", id));
            candidates.push(format!("https://www.vimeo.com/{}", id));
        }
    } else if (host == "vimeo.com" || host == "www.vimeo.com") && !normalized.contains("/video/") {
        if let Some(caps) = CANONICAL_ID_RE.captures(&normalized) {
            candidates.push(format!("https://player.vimeo.com/video/{}", &caps[1]));
        }
    } else if let Some(chunk) = detect_chunk(url) {
        candidates.extend(from_chunk(&chunk));
    }

    candidates.into_iter()
}

/// Guesses at the full video behind a CDN chunk.
///
/// The id in a chunk path is not guaranteed to be the public video id, so
/// callers must confirm with the user before downloading any of these.
pub fn from_chunk(chunk: &ChunkInfo) -> Vec<String> {
    let Some(video_id) = chunk.video_id.as_deref() else {
        return Vec::new();
    };

    let mut ids = vec![video_id];
    if let Some(digits) = DIGITS_RE.find(video_id) {
        ids.push(digits.as_str());
    }

    let mut suggestions: Vec<String> = Vec::new();
    for id in ids {
        for candidate in [
            format!("https://vimeo.com/{}", id),
            format!("https://player.vimeo.com/video/{}", id),
        ] {
            if !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(url: &str) -> Vec<String> {
        alternatives(url).collect()
    }

    #[test]
    fn test_scheme_less_with_nested_url() {
        assert_eq!(
            collect("player.vimeo.com/video/123456789?ref=https://example.com/page"),
            vec![
                "https://vimeo.com/123456789".to_string(),
                "https://www.vimeo.com/123456789".to_string(),
            ]
        );
    }

    #[test]
    fn test_embed_to_canonical() {
        assert_eq!(
            collect("https://player.vimeo.com/video/123456789?h=abc"),
            vec!["https://vimeo.com/123456789", "https://www.vimeo.com/123456789"]
        );
    }

    #[test]
    fn test_canonical_to_embed() {
        assert_eq!(
            collect("vimeo.com/123456789"),
            vec!["https://player.vimeo.com/video/123456789"]
        );
    }

    #[test]
    fn test_embed_without_numeric_id() {
        assert!(collect("https://player.vimeo.com/0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b").is_empty());
    }

    #[test]
    fn test_no_vimeo_structure() {
        assert!(collect("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_empty());
        assert!(collect("https://cdn.example.com/video.m3u8").is_empty());
        assert!(collect("https://example.com").is_empty());
        assert!(collect("").is_empty());
        assert!(collect("https://notvimeo.com/123").is_empty());
    }

    #[test]
    fn test_chunk_guesses() {
        let url = "https://vod-adaptive-ak.vimeocdn.com/exp=1/0f1e2d3c-4b5a/v2/range/x.mp4?range=0-10";
        assert_eq!(
            collect(url),
            vec![
                "https://vimeo.com/0f1e2d3c-4b5a",
                "https://player.vimeo.com/video/0f1e2d3c-4b5a",
                "https://vimeo.com/0",
                "https://player.vimeo.com/video/0",
            ]
        );
    }

    #[test]
    fn test_numeric_chunk_id_is_not_duplicated() {
        let chunk = ChunkInfo {
            original_url: String::new(),
            video_id: Some("123456".to_string()),
            range: None,
            filename: None,
        };
        assert_eq!(
            from_chunk(&chunk),
            vec!["https://vimeo.com/123456", "https://player.vimeo.com/video/123456"]
        );
    }
}
