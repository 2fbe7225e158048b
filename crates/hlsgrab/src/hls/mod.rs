// Manual HLS download path for fMP4/CMAF streams.

pub mod assembler;
pub mod config;
pub mod downloader;
pub mod events;
pub mod fetcher;
pub mod playlist;
pub mod range;
pub mod retry;
pub mod variant;

// Re-exports for easier access
pub use config::{HlsConfig, HlsConfigBuilder};
pub use downloader::{DownloadRequest, DownloadResult, HlsSegmentDownloader};
pub use events::{DownloadEvent, OnProgress};
pub use range::TimeWindow;
