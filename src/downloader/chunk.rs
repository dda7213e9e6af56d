// Vimeo CDN chunk detection

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::classifier::{host_of, normalize};
use super::models::{ByteRange, ChunkInfo};

/// Host serving Vimeo's adaptive byte-range chunks
pub const CDN_CHUNK_HOST: &str = "vod-adaptive-ak.vimeocdn.com";

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"/([a-f0-9-]+)/v2/").unwrap();
    static ref RANGE_RE: Regex = Regex::new(r"range=(\d+)-(\d+)").unwrap();
}

/// Extract chunk metadata, or `None` when the URL is not on the chunk CDN
pub fn detect_chunk(url: &str) -> Option<ChunkInfo> {
    let normalized = normalize(url);
    let host = host_of(&normalized)?;
    if !host.contains(CDN_CHUNK_HOST) {
        return None;
    }

    let video_id = VIDEO_ID_RE
        .captures(&normalized)
        .map(|caps| caps[1].to_string());

    let range = RANGE_RE.captures(&normalized).and_then(|caps| {
        let start = caps[1].parse().ok()?;
        let end = caps[2].parse().ok()?;
        ByteRange::new(start, end)
    });

    let filename = Url::parse(&normalized).ok().and_then(|parsed| {
        parsed
            .path()
            .rsplit('/')
            .next()
            .filter(|segment| segment.ends_with(".mp4") && segment.len() > ".mp4".len())
            .map(str::to_string)
    });

    Some(ChunkInfo {
        original_url: url.to_string(),
        video_id,
        range,
        filename,
    })
}
