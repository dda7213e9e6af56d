// Downloader module - URL analysis, probing and fetching

pub mod chunk;
pub mod classifier;
pub mod errors;
pub mod extractors;
pub mod fallback;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod update_check;
pub mod utils;

pub use classifier::classify;
pub use errors::DownloadError;
pub use models::{ChunkInfo, Platform, ProbeFailure, ProbeOutcome, VideoMetadata, VideoReference};
pub use orchestrator::{DownloadOrchestrator, FetchSettings};
