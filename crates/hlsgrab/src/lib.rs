//! # hlsgrab
//!
//! A manual HLS downloader for fragmented-MP4 (fMP4/CMAF) streams.
//! It fetches a playlist segment by segment and reassembles the
//! fragments into a single playable file. Used as a fallback when a
//! general-purpose downloader cannot handle a stream (short-lived signed
//! URLs, non-standard playlist variants).
//!
//! ## Features
//!
//! - Lenient media playlist parsing (`#EXT-X-MAP`, `#EXTINF`, segment URIs)
//! - Quality-label variant selection for master playlists
//! - Time-window segment filtering at segment granularity
//! - Sequential or bounded-concurrency fetching with ordered assembly
//! - Cooperative cancellation, per-segment timeout and retry with backoff
//! - Scoped temporary storage removed on every exit path

pub mod builder;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod hls;
pub mod manager;
pub mod proxy;

pub use builder::DownloaderConfigBuilder;
pub use client::create_client;
pub use config::DownloaderConfig;
pub use cookies::CookieSet;
pub use error::DownloadError;

pub use hls::{
    DownloadEvent, DownloadRequest, DownloadResult, HlsConfig, HlsConfigBuilder,
    HlsSegmentDownloader, OnProgress, TimeWindow,
};
pub use manager::DownloadManager;

pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};

// Re-exported so hosts do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
