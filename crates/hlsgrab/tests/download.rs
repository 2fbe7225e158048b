
use std::sync::Arc;
use std::time::Duration;

use fixture::{
    SEGMENT_COUNT, TestServer, event_recorder, expected_output, temp_dirs_in,
};
use hlsgrab_engine::cookies::parse_cookie_string;
use hlsgrab_engine::{
    CancellationToken, DownloadError, DownloadEvent, DownloadManager, DownloadRequest,
    DownloaderConfig, HlsConfig, HlsSegmentDownloader, OnProgress, TimeWindow,
};
use reqwest::StatusCode;
use tempfile::TempDir;

fn downloader() -> HlsSegmentDownloader {
    HlsSegmentDownloader::new(
        HlsConfig::builder()
            .with_config(|config| config.base.use_system_proxy = false)
            .build(),
    )
}

#[tokio::test]
async fn media_playlist_is_assembled_in_order() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let (callback, events) = event_recorder();

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/vod/media.m3u8"), out.path().join("show")),
            &CancellationToken::new(),
            Some(callback),
        )
        .await
        .unwrap();

    assert_eq!(result.path, out.path().join("show.mp4"));
    assert_eq!(result.segments, SEGMENT_COUNT);
    let expected = expected_output("vod", &[0, 1, 2, 3]);
    assert_eq!(std::fs::read(&result.path).unwrap(), expected);
    assert_eq!(result.bytes, expected.len() as u64);
    assert!(temp_dirs_in(out.path()).is_empty());

    let events = events.lock();
    assert!(matches!(
        events.first(),
        Some(DownloadEvent::PlaylistResolved {
            from_master: false,
            has_init_segment: true,
            selected_segments: 4,
            ..
        })
    ));
    let progress: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            DownloadEvent::SegmentCompleted { completed, total, .. } => Some((*completed, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, [(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
    assert!(matches!(events.last(), Some(DownloadEvent::Completed { .. })));
}

#[tokio::test]
async fn time_window_fetches_only_overlapping_segments() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/window/media.m3u8"), out.path().join("clip.mp4"))
                .with_time_window(TimeWindow::new(Some(10.0), Some(30.0))),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.path, out.path().join("clip.mp4"));
    assert_eq!(result.segments, 2);
    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("window", &[1, 2])
    );
    assert_eq!(server.request_count("/window/seg/0.m4v"), 0);
    assert_eq!(server.request_count("/window/seg/3.m4v"), 0);
}

#[tokio::test]
async fn max_segments_truncates_selection() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/capped/media.m3u8"), out.path().join("capped"))
                .with_max_segments(2),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("capped", &[0, 1])
    );
}

#[tokio::test]
async fn master_playlist_resolves_quality_by_resolution() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/master.m3u8"), out.path().join("live"))
                .with_quality("720p"),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.media_playlist_url, server.url("/sd/media.m3u8"));
    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("sd", &[0, 1, 2, 3])
    );
    assert_eq!(server.request_count("/hd/media.m3u8"), 0);
}

#[tokio::test]
async fn master_playlist_without_matching_quality_fails() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let missing_label = downloader()
        .download(
            DownloadRequest::new(server.url("/master.m3u8"), out.path().join("live")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(missing_label, DownloadError::QualityRequired { .. }));

    let unknown = downloader()
        .download(
            DownloadRequest::new(server.url("/master.m3u8"), out.path().join("live"))
                .with_quality("480p"),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(unknown, DownloadError::VariantNotFound { ref quality } if quality == "480p"));

    assert_eq!(server.request_count("/hd/media.m3u8"), 0);
    assert_eq!(server.request_count("/sd/media.m3u8"), 0);
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn failed_segment_reports_url_and_status_and_cleans_up() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let err = downloader()
        .download(
            DownloadRequest::new(server.url("/broken/media.m3u8"), out.path().join("broken")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    match &err {
        DownloadError::Transfer { url, status, .. } => {
            assert_eq!(url, &server.url("/broken/seg/1.m4v"));
            assert_eq!(*status, Some(StatusCode::NOT_FOUND));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(server.request_count("/broken/seg/2.m4v"), 0);
    assert!(temp_dirs_in(out.path()).is_empty());
    assert!(!out.path().join("broken.mp4").exists());
}

#[tokio::test]
async fn cancellation_before_second_segment_stops_download() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    let callback: OnProgress = Arc::new(move |event| {
        // init + first media segment done
        if let DownloadEvent::SegmentCompleted { completed: 2, .. } = event {
            canceller.cancel();
        }
    });

    let err = downloader()
        .download(
            DownloadRequest::new(server.url("/cancel/media.m3u8"), out.path().join("cancel")),
            &token,
            Some(callback),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Cancelled));
    assert_eq!(server.request_count("/cancel/init.mp4"), 1);
    assert_eq!(server.request_count("/cancel/seg/0.m4v"), 1);
    assert_eq!(server.request_count("/cancel/seg/1.m4v"), 0);
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried_when_enabled() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let fail_fast = downloader()
        .download(
            DownloadRequest::new(server.url("/flaky/media.m3u8"), out.path().join("flaky")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(fail_fast.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

    let retrying = HlsSegmentDownloader::new(
        HlsConfig::builder()
            .max_segment_retries(2)
            .segment_retry_delay_base(Duration::from_millis(5))
            .retry_jitter(false)
            .with_config(|config| config.base.use_system_proxy = false)
            .build(),
    );
    let result = retrying
        .download(
            DownloadRequest::new(server.url("/flaky/media.m3u8"), out.path().join("flaky")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("flaky", &[0, 1, 2, 3])
    );
    // seg 0 failed once in each run; the others failed once in the second run
    assert_eq!(server.request_count("/flaky/seg/0.m4v"), 2);
    assert_eq!(server.request_count("/flaky/seg/1.m4v"), 2);
}

#[tokio::test]
async fn concurrent_fetch_produces_identical_output() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let parallel = HlsSegmentDownloader::new(
        HlsConfig::builder()
            .download_concurrency(3)
            .with_config(|config| config.base.use_system_proxy = false)
            .build(),
    );
    let result = parallel
        .download(
            DownloadRequest::new(server.url("/par/media.m3u8"), out.path().join("par")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("par", &[0, 1, 2, 3])
    );
}

#[tokio::test]
async fn cookies_are_sent_with_playlist_requests() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let denied = downloader()
        .download(
            DownloadRequest::new(server.url("/private/media.m3u8"), out.path().join("private")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), "manifest");

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/private/media.m3u8"), out.path().join("private"))
                .with_cookies(parse_cookie_string("lang=ko; session=ok")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(&result.path).unwrap(),
        expected_output("private", &[0, 1, 2, 3])
    );
}

#[tokio::test]
async fn unencodable_cookie_fails_before_any_request() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let err = downloader()
        .download(
            DownloadRequest::new(server.url("/private/media.m3u8"), out.path().join("private"))
                .with_cookies(parse_cookie_string("session=ok; note=caf\u{e9}")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "configuration");
    assert!(err.to_string().contains("`note`"), "{err}");
    assert_eq!(server.request_count("/private/media.m3u8"), 0);
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn read_timeout_aborts_a_stalled_playlist() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let base = DownloaderConfig::builder()
        .with_read_timeout(Duration::from_millis(300))
        .with_system_proxy(false)
        .build();
    let downloader = HlsSegmentDownloader::new(
        HlsConfig::builder()
            .with_base_config(base)
            .playlist_fetch_timeout(Duration::ZERO)
            .build(),
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        downloader.download(
            DownloadRequest::new(server.url("/stalled/media.m3u8"), out.path().join("stalled")),
            &CancellationToken::new(),
            None,
        ),
    )
    .await
    .expect("read timeout did not fire");

    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), "network");
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn unwritable_output_is_an_assembly_error_and_cleans_up() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    // The normalized output path is an existing directory.
    let occupied = out.path().join("video.mp4");
    std::fs::create_dir(&occupied).unwrap();

    let err = downloader()
        .download(
            DownloadRequest::new(server.url("/vod/media.m3u8"), out.path().join("video"))
                .with_max_segments(2),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "assembly");
    assert!(matches!(err, DownloadError::Assembly { ref path, .. } if *path == occupied));
    assert!(occupied.is_dir());
    assert_eq!(server.request_count("/vod/seg/1.m4v"), 1);
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn empty_selection_is_a_manifest_error() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();

    let empty = downloader()
        .download(
            DownloadRequest::new(server.url("/empty.m3u8"), out.path().join("empty")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(empty, DownloadError::Manifest { ref reason } if reason == "no segments found"));

    let out_of_range = downloader()
        .download(
            DownloadRequest::new(server.url("/vod/media.m3u8"), out.path().join("late"))
                .with_time_window(TimeWindow::new(Some(45.0), None)),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert!(
        matches!(out_of_range, DownloadError::Manifest { ref reason } if reason == "no segments in range")
    );

    let missing = downloader()
        .download(
            DownloadRequest::new(server.url("/missing.m3u8"), out.path().join("missing")),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), "manifest");
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn output_directory_is_created() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let nested = out.path().join("a").join("b").join("video");

    let result = downloader()
        .download(
            DownloadRequest::new(server.url("/vod/media.m3u8"), &nested).with_max_segments(1),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.path, nested.with_extension("mp4"));
    assert!(temp_dirs_in(&out.path().join("a").join("b")).is_empty());
}

#[tokio::test]
async fn manager_runs_downloads_independently() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let manager = DownloadManager::new(
        HlsConfig::builder()
            .with_config(|config| config.base.use_system_proxy = false)
            .build(),
    );

    let first = manager.start(
        DownloadRequest::new(server.url("/one/media.m3u8"), out.path().join("one")),
        None,
    );
    let second = manager.start(
        DownloadRequest::new(server.url("/two/media.m3u8"), out.path().join("two")),
        None,
    );
    assert_eq!(manager.active().len(), 2);

    let one = manager.wait(first).await.unwrap().unwrap();
    let two = manager.wait(second).await.unwrap().unwrap();
    assert_eq!(std::fs::read(one.path).unwrap(), expected_output("one", &[0, 1, 2, 3]));
    assert_eq!(std::fs::read(two.path).unwrap(), expected_output("two", &[0, 1, 2, 3]));
    assert!(manager.active().is_empty());
    assert!(temp_dirs_in(out.path()).is_empty());
}

#[tokio::test]
async fn manager_cancel_stops_a_download() {
    let server = TestServer::new().await;
    let out = TempDir::new().unwrap();
    let manager = DownloadManager::new(HlsConfig::default());

    let id = manager.start(
        DownloadRequest::new(server.url("/stop/media.m3u8"), out.path().join("stop")),
        None,
    );
    assert!(manager.cancel(id));

    let result = manager.wait(id).await.unwrap();
    assert!(matches!(result, Err(DownloadError::Cancelled)));
    assert!(temp_dirs_in(out.path()).is_empty());
}
