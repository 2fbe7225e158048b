//! Registry of concurrently running downloads.
//!
//! Each download runs as its own tokio task with its own cancellation token.
//! The registry is the only state the downloads share.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::DownloadError;
use crate::hls::{DownloadRequest, DownloadResult, HlsConfig, HlsSegmentDownloader, OnProgress};

struct ActiveDownload {
    token: CancellationToken,
    handle: JoinHandle<Result<DownloadResult, DownloadError>>,
}

pub struct DownloadManager {
    downloader: Arc<HlsSegmentDownloader>,
    downloads: Mutex<HashMap<Uuid, ActiveDownload>>,
}

impl DownloadManager {
    pub fn new(config: HlsConfig) -> Self {
        Self {
            downloader: Arc::new(HlsSegmentDownloader::new(config)),
            downloads: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a download and return its id. Must be called within a tokio runtime.
    pub fn start(&self, request: DownloadRequest, on_progress: Option<OnProgress>) -> Uuid {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let downloader = self.downloader.clone();
        let task_token = token.clone();

        info!(%id, url = %request.manifest_url, "Starting download");
        let handle = tokio::spawn(async move {
            downloader
                .download(request, &task_token, on_progress)
                .await
        });

        self.downloads
            .lock()
            .insert(id, ActiveDownload { token, handle });
        id
    }

    /// Signal cancellation. The download stops before its next transfer.
    /// Returns false for unknown ids.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.downloads.lock().get(&id) {
            Some(download) => {
                debug!(%id, "Cancelling download");
                download.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for download in self.downloads.lock().values() {
            download.token.cancel();
        }
    }

    /// Ids of downloads that have not been waited on yet.
    pub fn active(&self) -> Vec<Uuid> {
        self.downloads.lock().keys().copied().collect()
    }

    pub fn is_finished(&self, id: Uuid) -> Option<bool> {
        self.downloads
            .lock()
            .get(&id)
            .map(|download| download.handle.is_finished())
    }

    /// Wait for a download to end and remove it from the registry.
    /// Returns `None` for unknown ids.
    pub async fn wait(&self, id: Uuid) -> Option<Result<DownloadResult, DownloadError>> {
        let download = self.downloads.lock().remove(&id)?;
        let result = download.handle.await.unwrap_or_else(|e| {
            Err(DownloadError::Internal {
                reason: format!("download task failed: {e}"),
            })
        });
        Some(result)
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
