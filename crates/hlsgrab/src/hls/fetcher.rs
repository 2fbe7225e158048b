// Segment fetcher: transfers the init segment and the selected media segments
// into a scoped temporary store, in selection order.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use reqwest::Client;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::DownloadError;
use crate::hls::config::HlsFetcherConfig;
use crate::hls::events::{DownloadEvent, OnProgress, emit};
use crate::hls::retry::{RetryPolicy, retry_with_backoff};

const INIT_FILE_NAME: &str = "init.m4s";

/// Scratch directory owned by a single download.
///
/// File names only depend on the position in the selection, so the assembler
/// can rely on them. The directory is removed by [`SegmentStore::close`] or,
/// failing that, when the store is dropped.
#[derive(Debug)]
pub struct SegmentStore {
    dir: TempDir,
}

impl SegmentStore {
    /// Create a uniquely named store inside `parent`, named after `prefix`
    /// and the output file stem.
    pub fn create_in(parent: &Path, prefix: &str, stem: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}{stem}_"))
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn init_path(&self) -> PathBuf {
        self.dir.path().join(INIT_FILE_NAME)
    }

    /// Path of the `index`-th selected media segment.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("seg_{index:04}.m4v"))
    }

    /// Remove the directory and everything in it.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Absolute URLs to transfer, in assembly order.
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    pub init: Option<Url>,
    pub media: Vec<Url>,
}

impl FetchPlan {
    /// Number of transfers, init segment included.
    pub fn transfer_count(&self) -> usize {
        self.media.len() + usize::from(self.init.is_some())
    }
}

/// Files written by a completed fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedSegments {
    pub init_path: Option<PathBuf>,
    pub segment_paths: Vec<PathBuf>,
    pub bytes: u64,
}

impl FetchedSegments {
    /// All files in assembly order: init first, then media segments.
    pub fn ordered_paths(&self) -> impl Iterator<Item = &Path> {
        self.init_path
            .iter()
            .chain(self.segment_paths.iter())
            .map(PathBuf::as_path)
    }
}

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    /// Transfer `url` into a new file at `path`, returning the bytes written.
    async fn download_to_file(
        &self,
        url: &Url,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<u64, DownloadError>;
}

/// HTTP implementation of [`SegmentDownloader`] on top of a shared session.
pub struct SegmentFetcher {
    http_client: Client,
    timeout: Option<Duration>,
    retry_policy: RetryPolicy,
}

impl SegmentFetcher {
    pub fn new(http_client: Client, config: &HlsFetcherConfig) -> Self {
        Self {
            http_client,
            timeout: config.segment_download_timeout.filter(|t| !t.is_zero()),
            retry_policy: RetryPolicy::from_fetcher_config(config),
        }
    }

    /// One attempt: stream the body of `url` into `path`, truncating any
    /// file left by an earlier attempt.
    async fn transfer(&self, url: &Url, path: &Path) -> Result<u64, DownloadError> {
        let mut request = self.http_client.get(url.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::transfer_network(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::transfer_status(url.as_str(), status));
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::transfer_network(url.as_str(), &e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl SegmentDownloader for SegmentFetcher {
    async fn download_to_file(
        &self,
        url: &Url,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let bytes =
            retry_with_backoff(&self.retry_policy, token, move |_| self.transfer(url, path)).await?;
        debug!(url = %url, bytes, "Segment downloaded");
        Ok(bytes)
    }
}

/// Transfer every entry of `plan` into `store`.
///
/// The init segment goes first. Media segments run through an ordered buffer
/// of `concurrency` transfers, so completions are reported and recorded in
/// selection order; `concurrency` of one is a strictly sequential loop. The
/// token is consulted before each transfer starts and the first error ends
/// the whole fetch.
pub async fn fetch_segments<D>(
    downloader: &D,
    plan: &FetchPlan,
    store: &SegmentStore,
    concurrency: usize,
    token: &CancellationToken,
    on_progress: Option<&OnProgress>,
) -> Result<FetchedSegments, DownloadError>
where
    D: SegmentDownloader + ?Sized,
{
    let total = plan.transfer_count();
    let mut completed = 0;
    let mut fetched = FetchedSegments::default();

    if let Some(init_url) = &plan.init {
        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        let path = store.init_path();
        let bytes = downloader.download_to_file(init_url, &path, token).await?;

        completed += 1;
        fetched.bytes += bytes;
        fetched.init_path = Some(path);
        emit(
            on_progress,
            DownloadEvent::SegmentCompleted {
                completed,
                total,
                bytes,
            },
        );
    }

    // Nothing runs until the buffer polls a transfer.
    let transfers: Vec<_> = plan
        .media
        .iter()
        .enumerate()
        .map(|(index, url)| {
            let path = store.segment_path(index);
            async move {
                if token.is_cancelled() {
                    return Err(DownloadError::Cancelled);
                }
                let bytes = downloader.download_to_file(url, &path, token).await?;
                Ok::<_, DownloadError>((path, bytes))
            }
        })
        .collect();

    let mut in_order = stream::iter(transfers).buffered(concurrency.max(1));
    while let Some(result) = in_order.next().await {
        let (path, bytes) = result?;

        completed += 1;
        fetched.bytes += bytes;
        fetched.segment_paths.push(path);
        emit(
            on_progress,
            DownloadEvent::SegmentCompleted {
                completed,
                total,
                bytes,
            },
        );
    }

    Ok(fetched)
}
