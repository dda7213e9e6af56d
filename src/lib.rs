// vidgrab - classify, probe and download videos through yt-dlp

pub mod config;
pub mod downloader;
pub mod shell;

pub use config::AppConfig;
pub use downloader::DownloadError;
pub use shell::{Outcome, Shell};
