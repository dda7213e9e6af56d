//! Scripted stand-in for yt-dlp shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use vidgrab::downloader::errors::DownloadError;
use vidgrab::downloader::extractors::{ExtractorOptions, MediaExtractor, ProbeChain, ProbeProfile};
use vidgrab::downloader::models::{RawFormat, VideoMetadata};
use vidgrab::downloader::progress::ProgressSink;

/// Returned once the probe script runs dry
pub const UNSCRIPTED_ERROR: &str = "ERROR: Unsupported URL";

/// One recorded call into the extractor
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub options: ExtractorOptions,
}

/// Answers probes from a queue and fetches from a single scripted result
#[derive(Default)]
pub struct ScriptedExtractor {
    probe_script: Mutex<VecDeque<Result<VideoMetadata, String>>>,
    fetch_result: Mutex<Option<Result<Option<PathBuf>, String>>>,
    probe_calls: Mutex<Vec<Call>>,
    fetch_calls: Mutex<Vec<Call>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_ok(self, metadata: VideoMetadata) -> Self {
        self.probe_script.lock().unwrap().push_back(Ok(metadata));
        self
    }

    pub fn probe_err(self, message: &str) -> Self {
        self.probe_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn fetch_ok(self, path: Option<PathBuf>) -> Self {
        *self.fetch_result.lock().unwrap() = Some(Ok(path));
        self
    }

    pub fn fetch_err(self, message: &str) -> Self {
        *self.fetch_result.lock().unwrap() = Some(Err(message.to_string()));
        self
    }

    pub fn probe_calls(&self) -> Vec<Call> {
        self.probe_calls.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> Vec<Call> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn probe(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<VideoMetadata, DownloadError> {
        self.probe_calls.lock().unwrap().push(Call {
            url: url.to_string(),
            options: options.clone(),
        });

        let next = self.probe_script.lock().unwrap().pop_front();
        match next {
            Some(Ok(metadata)) => Ok(metadata),
            Some(Err(message)) => Err(DownloadError::Extraction(message)),
            None => Err(DownloadError::Extraction(UNSCRIPTED_ERROR.to_string())),
        }
    }

    async fn fetch(
        &self,
        url: &str,
        options: &ExtractorOptions,
        _progress: &dyn ProgressSink,
    ) -> Result<Option<PathBuf>, DownloadError> {
        self.fetch_calls.lock().unwrap().push(Call {
            url: url.to_string(),
            options: options.clone(),
        });

        match self.fetch_result.lock().unwrap().clone() {
            Some(Ok(path)) => Ok(path),
            Some(Err(message)) => Err(DownloadError::Extraction(message)),
            None => Ok(None),
        }
    }
}

/// Chain of `n` plain profiles named `p1`, `p2`, ...
pub fn plain_chain(n: usize) -> ProbeChain {
    const NAMES: [&str; 6] = ["p1", "p2", "p3", "p4", "p5", "p6"];
    ProbeChain::new(
        NAMES
            .iter()
            .take(n)
            .map(|name| ProbeProfile::new(*name, ExtractorOptions::default()))
            .collect(),
    )
}

pub fn sample_metadata(title: &str) -> VideoMetadata {
    VideoMetadata {
        id: Some("abc123".to_string()),
        title: Some(title.to_string()),
        uploader: Some("Uploader".to_string()),
        duration: Some(125.0),
        formats: vec![
            video_format("137", 1920, 1080),
            video_format("22", 1280, 720),
            video_format("18", 640, 360),
        ],
        ..Default::default()
    }
}

pub fn video_format(id: &str, width: u32, height: u32) -> RawFormat {
    RawFormat {
        format_id: id.to_string(),
        ext: Some("mp4".to_string()),
        width: Some(width),
        height: Some(height),
        vcodec: Some("avc1".to_string()),
        acodec: Some("mp4a".to_string()),
        protocol: Some("https".to_string()),
        ..Default::default()
    }
}
