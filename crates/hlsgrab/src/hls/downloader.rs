use std::path::{Path, PathBuf};

use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cookies::CookieSet;
use crate::hls::assembler::{combine_segments, normalize_output_path};
use crate::hls::config::HlsConfig;
use crate::hls::events::{DownloadEvent, OnProgress, emit};
use crate::hls::fetcher::{FetchPlan, SegmentFetcher, SegmentStore, fetch_segments};
use crate::hls::playlist::{
    fetch_playlist_text, parse_media_playlist, playlist_base_url, resolve_uri,
};
use crate::hls::range::{TimeWindow, limit_segments, select_segments};
use crate::hls::variant::{is_master_playlist, select_variant};
use crate::{DownloadError, create_client};

/// Everything a single download needs from its caller.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Master or media playlist URL
    pub manifest_url: String,
    /// Output path; the container extension is appended when missing
    pub output: PathBuf,
    pub headers: HeaderMap,
    pub cookies: CookieSet,
    /// Required when the manifest is a master playlist
    pub quality: Option<String>,
    pub time_window: TimeWindow,
    /// Cap on the number of selected segments, mostly for bounded test runs
    pub max_segments: Option<usize>,
}

impl DownloadRequest {
    pub fn new(manifest_url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            output: output.into(),
            headers: HeaderMap::new(),
            cookies: CookieSet::new(),
            quality: None,
            time_window: TimeWindow::unbounded(),
            max_segments: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_cookies(mut self, cookies: CookieSet) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_time_window(mut self, time_window: TimeWindow) -> Self {
        self.time_window = time_window;
        self
    }

    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = Some(max_segments);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    /// Final file path
    pub path: PathBuf,
    /// Bytes written to the final file
    pub bytes: u64,
    /// Media segments assembled (init segment excluded)
    pub segments: usize,
    pub media_playlist_url: String,
}

/// A media playlist ready to be fetched.
struct ResolvedPlaylist {
    url: Url,
    plan: FetchPlan,
}

/// Single-shot HLS downloader for fMP4/CMAF streams.
///
/// Each call to [`download`](Self::download) opens its own HTTP session and
/// temporary store; nothing is shared between calls.
#[derive(Debug, Clone, Default)]
pub struct HlsSegmentDownloader {
    config: HlsConfig,
}

impl HlsSegmentDownloader {
    pub fn new(config: HlsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    /// Download the stream behind `request.manifest_url` into a single file.
    ///
    /// The temporary store is gone by the time this returns, whatever the
    /// outcome.
    #[instrument(skip_all, fields(url = %request.manifest_url))]
    pub async fn download(
        &self,
        request: DownloadRequest,
        token: &CancellationToken,
        on_progress: Option<OnProgress>,
    ) -> Result<DownloadResult, DownloadError> {
        let on_progress = on_progress.as_ref();
        let manifest_url = Url::parse(request.manifest_url.trim())
            .map_err(|e| DownloadError::invalid_url(&request.manifest_url, e.to_string()))?;

        let client = self.open_session(&request)?;
        let resolved = self
            .resolve_playlist(&client, &manifest_url, &request, token, on_progress)
            .await?;

        let output = normalize_output_path(
            &request.output,
            &self.config.output_config.container_extension,
        );
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;

        let stem = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let store =
            SegmentStore::create_in(&parent, &self.config.output_config.temp_dir_prefix, &stem)?;
        debug!(store = %store.path().display(), "Created temporary segment store");

        let result = self
            .fetch_and_assemble(&client, &resolved.plan, &store, &output, token, on_progress)
            .await;

        let store_path = store.path().to_path_buf();
        if let Err(e) = store.close() {
            warn!(store = %store_path.display(), error = %e, "Failed to remove temporary segment store");
        }

        let bytes = result?;
        info!(path = %output.display(), bytes, "Download complete");
        emit(
            on_progress,
            DownloadEvent::Completed {
                path: output.clone(),
                bytes,
            },
        );

        Ok(DownloadResult {
            path: output,
            bytes,
            segments: resolved.plan.media.len(),
            media_playlist_url: resolved.url.to_string(),
        })
    }

    /// HTTP session scoped to one download: configured defaults, then the
    /// request's own headers and cookies on top.
    fn open_session(&self, request: &DownloadRequest) -> Result<Client, DownloadError> {
        let mut session = self.config.base.clone();
        session.cookies.extend(
            request
                .cookies
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        create_client(&session, &request.headers)
    }

    /// Fetch the manifest, follow a master playlist to the requested variant
    /// and turn the filtered segment list into absolute URLs.
    async fn resolve_playlist(
        &self,
        client: &Client,
        manifest_url: &Url,
        request: &DownloadRequest,
        token: &CancellationToken,
        on_progress: Option<&OnProgress>,
    ) -> Result<ResolvedPlaylist, DownloadError> {
        let timeout = self.config.playlist_config.playlist_fetch_timeout;
        let mut text = fetch_playlist_text(client, manifest_url, timeout, token).await?;
        let mut media_url = manifest_url.clone();

        let from_master = is_master_playlist(&text);
        if from_master {
            let quality = request
                .quality
                .as_deref()
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| DownloadError::QualityRequired {
                    url: manifest_url.to_string(),
                })?;
            media_url = select_variant(&text, &playlist_base_url(manifest_url)?, quality)?;
            info!(quality, media_playlist = %media_url, "Resolved variant");
            text = fetch_playlist_text(client, &media_url, timeout, token).await?;
        }

        let manifest = parse_media_playlist(&text);
        if manifest.media_segments.is_empty() {
            return Err(DownloadError::manifest("no segments found"));
        }

        let selected = limit_segments(
            select_segments(&manifest.media_segments, &request.time_window),
            request.max_segments,
        );
        if selected.is_empty() {
            return Err(DownloadError::manifest("no segments in range"));
        }

        let base = playlist_base_url(&media_url)?;
        let plan = FetchPlan {
            init: manifest
                .init_segment_uri
                .as_deref()
                .map(|uri| resolve_uri(&base, uri))
                .transpose()?,
            media: selected
                .iter()
                .map(|segment| resolve_uri(&base, &segment.uri))
                .collect::<Result<_, _>>()?,
        };

        info!(
            media_playlist = %media_url,
            selected = plan.media.len(),
            total = manifest.media_segments.len(),
            init = plan.init.is_some(),
            "Media playlist resolved"
        );
        emit(
            on_progress,
            DownloadEvent::PlaylistResolved {
                media_playlist_url: media_url.to_string(),
                from_master,
                has_init_segment: plan.init.is_some(),
                selected_segments: plan.media.len(),
                total_segments: manifest.media_segments.len(),
            },
        );

        Ok(ResolvedPlaylist {
            url: media_url,
            plan,
        })
    }

    async fn fetch_and_assemble(
        &self,
        client: &Client,
        plan: &FetchPlan,
        store: &SegmentStore,
        output: &Path,
        token: &CancellationToken,
        on_progress: Option<&OnProgress>,
    ) -> Result<u64, DownloadError> {
        let fetcher = SegmentFetcher::new(client.clone(), &self.config.fetcher_config);
        let fetched = fetch_segments(
            &fetcher,
            plan,
            store,
            self.config.fetcher_config.download_concurrency,
            token,
            on_progress,
        )
        .await?;

        emit(
            on_progress,
            DownloadEvent::Assembling {
                output: output.to_path_buf(),
                files: plan.transfer_count(),
            },
        );

        combine_segments(fetched.ordered_paths(), output).await
    }
}
