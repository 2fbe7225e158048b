use std::time::Duration;

use crate::DownloaderConfig;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    pub playlist_config: HlsPlaylistConfig,
    pub fetcher_config: HlsFetcherConfig,
    pub output_config: HlsOutputConfig,
}

impl HlsConfig {
    pub fn builder() -> HlsConfigBuilder {
        HlsConfigBuilder::new()
    }
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    pub playlist_fetch_timeout: Duration,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_fetch_timeout: Duration::from_secs(15),
        }
    }
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    /// Per-transfer timeout for init and media segments. `None` leaves only
    /// the session timeout in place.
    pub segment_download_timeout: Option<Duration>,
    /// Extra attempts after a retryable failure. Zero fails on the first error.
    pub max_segment_retries: u32,
    pub segment_retry_delay_base: Duration, // Base for exponential backoff
    pub segment_retry_max_delay: Duration,
    pub retry_jitter: bool,
    /// Transfers in flight at once. One keeps the fetch strictly sequential.
    pub download_concurrency: usize,
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Some(Duration::from_secs(30)),
            max_segment_retries: 0,
            segment_retry_delay_base: Duration::from_millis(500),
            segment_retry_max_delay: Duration::from_secs(10),
            retry_jitter: true,
            download_concurrency: 1,
        }
    }
}

// --- Output Configuration ---
#[derive(Debug, Clone)]
pub struct HlsOutputConfig {
    /// Extension of the assembled file, without the dot
    pub container_extension: String,
    /// Prefix of the scoped temporary directory created next to the output
    pub temp_dir_prefix: String,
}

impl Default for HlsOutputConfig {
    fn default() -> Self {
        Self {
            container_extension: "mp4".to_string(),
            temp_dir_prefix: "temp_".to_string(),
        }
    }
}

/// Fluent builder for [`HlsConfig`].
#[derive(Debug, Clone, Default)]
pub struct HlsConfigBuilder {
    config: HlsConfig,
}

impl HlsConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HlsConfig::default(),
        }
    }

    pub fn with_base_config(mut self, base_config: DownloaderConfig) -> Self {
        self.config.base = base_config;
        self
    }

    // --- Playlist methods ---

    pub fn playlist_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.playlist_fetch_timeout = timeout;
        self
    }

    // --- Fetcher methods ---

    pub fn segment_download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.fetcher_config.segment_download_timeout = timeout;
        self
    }

    pub fn max_segment_retries(mut self, retries: u32) -> Self {
        self.config.fetcher_config.max_segment_retries = retries;
        self
    }

    pub fn segment_retry_delay_base(mut self, delay: Duration) -> Self {
        self.config.fetcher_config.segment_retry_delay_base = delay;
        self
    }

    pub fn segment_retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.fetcher_config.segment_retry_max_delay = delay;
        self
    }

    pub fn retry_jitter(mut self, jitter: bool) -> Self {
        self.config.fetcher_config.retry_jitter = jitter;
        self
    }

    /// Set maximum concurrent segment transfers. Zero is treated as one.
    pub fn download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.fetcher_config.download_concurrency = concurrency.max(1);
        self
    }

    // --- Output methods ---

    pub fn container_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.output_config.container_extension =
            extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn temp_dir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_config.temp_dir_prefix = prefix.into();
        self
    }

    /// Apply arbitrary changes to the configuration being built.
    pub fn with_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut HlsConfig),
    {
        f(&mut self.config);
        self
    }

    /// Get a copy of the current configuration.
    pub fn get_config(&self) -> HlsConfig {
        self.config.clone()
    }

    pub fn build(self) -> HlsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_fast_and_stay_sequential() {
        let config = HlsConfig::default();
        assert_eq!(config.fetcher_config.max_segment_retries, 0);
        assert_eq!(config.fetcher_config.download_concurrency, 1);
        assert_eq!(config.output_config.container_extension, "mp4");
        assert_eq!(config.output_config.temp_dir_prefix, "temp_");
    }

    #[test]
    fn builder_sets_nested_sections() {
        let base = DownloaderConfig::builder()
            .with_user_agent("hlsgrab-test")
            .with_header("Referer", "https://example.com/")
            .build();
        let config = HlsConfig::builder()
            .with_base_config(base)
            .max_segment_retries(3)
            .download_concurrency(0)
            .container_extension(".m4v")
            .with_config(|c| c.fetcher_config.retry_jitter = false)
            .build();

        assert_eq!(config.base.user_agent, "hlsgrab-test");
        assert_eq!(config.base.headers["referer"], "https://example.com/");
        assert_eq!(config.fetcher_config.max_segment_retries, 3);
        assert_eq!(config.fetcher_config.download_concurrency, 1);
        assert_eq!(config.output_config.container_extension, "m4v");
        assert!(!config.fetcher_config.retry_jitter);
    }
}
