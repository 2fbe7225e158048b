use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

/// Progress and lifecycle notifications of one download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// The media playlist to download from is known and filtered.
    PlaylistResolved {
        media_playlist_url: String,
        from_master: bool,
        has_init_segment: bool,
        selected_segments: usize,
        total_segments: usize,
    },
    /// One transfer (init or media) finished. `total` counts the init
    /// segment when there is one.
    SegmentCompleted {
        completed: usize,
        total: usize,
        bytes: u64,
    },
    Assembling {
        output: PathBuf,
        files: usize,
    },
    Completed {
        path: PathBuf,
        bytes: u64,
    },
}

/// One-way progress sink. It is invoked inline from the download task and
/// cannot influence the download; stopping is done through the
/// cancellation token.
pub type OnProgress = Arc<dyn Fn(DownloadEvent) + Send + Sync>;

pub(crate) fn emit(on_progress: Option<&OnProgress>, event: DownloadEvent) {
    if let Some(callback) = on_progress {
        callback(event);
    }
}
