use std::time::Duration;

use hlsgrab_engine::cookies::parse_cookie_string;
use hlsgrab_engine::{
    DownloadRequest, DownloaderConfig, HlsConfig, ProxyAuth, ProxyConfig, TimeWindow,
};
use reqwest::header::{ORIGIN, REFERER};
use tracing::info;

use crate::cli::CliArgs;
use crate::error::AppError;
use crate::utils::{format_duration, parse_headers, parse_time};

/// Resolve proxy flags. `--no-proxy` wins over everything else.
fn proxy_settings(args: &CliArgs) -> (Option<ProxyConfig>, bool) {
    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        return (None, false);
    }

    let Some(proxy_url) = args.proxy.as_ref() else {
        if args.use_system_proxy {
            info!("Using system proxy settings for downloads");
        }
        return (None, args.use_system_proxy);
    };

    // Authentication only applies when both username and password are given
    let auth = match (&args.proxy_user, &args.proxy_pass) {
        (Some(username), Some(password)) => Some(ProxyAuth {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    info!(
        proxy_url = %proxy_url,
        proxy_type = ?args.proxy_type,
        has_auth = auth.is_some(),
        "Using explicit proxy configuration for downloads"
    );

    let proxy = ProxyConfig {
        url: proxy_url.clone(),
        proxy_type: args.proxy_type,
        auth,
    };
    (Some(proxy), false)
}

/// Engine configuration derived from the command line.
pub fn build_hls_config(args: &CliArgs) -> Result<HlsConfig, AppError> {
    if args.concurrency == 0 {
        return Err(AppError::InvalidInput(
            "--concurrency must be at least 1".to_string(),
        ));
    }

    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, playlist={}s, segment={}s",
        args.timeout, args.connect_timeout, args.playlist_timeout, args.segment_timeout
    );

    let (proxy, use_system_proxy) = proxy_settings(args);

    let mut builder = DownloaderConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_read_timeout(Duration::from_secs(args.read_timeout));
    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent);
    }
    builder = match proxy {
        Some(proxy) => builder.with_proxy(proxy),
        None => builder.with_system_proxy(use_system_proxy),
    };

    let segment_timeout = (args.segment_timeout > 0).then(|| Duration::from_secs(args.segment_timeout));

    Ok(HlsConfig::builder()
        .with_base_config(builder.build())
        .playlist_fetch_timeout(Duration::from_secs(args.playlist_timeout))
        .segment_download_timeout(segment_timeout)
        .max_segment_retries(args.retries)
        .download_concurrency(args.concurrency)
        .build())
}

/// The download request described by the command line.
pub fn build_request(args: &CliArgs) -> Result<DownloadRequest, AppError> {
    let start = args.start.as_deref().map(parse_time).transpose()?;
    let end = args.end.as_deref().map(parse_time).transpose()?;
    if let (Some(start), Some(end)) = (start, end)
        && start >= end
    {
        return Err(AppError::InvalidInput(format!(
            "--start ({}) must be before --end ({})",
            format_duration(start),
            format_duration(end)
        )));
    }
    if start.is_some() || end.is_some() {
        info!(
            start = ?start.map(format_duration),
            end = ?end.map(format_duration),
            "Downloading time window"
        );
    }

    let mut headers = parse_headers(&args.headers);
    for (name, value) in [(REFERER, &args.referer), (ORIGIN, &args.origin)] {
        if let Some(value) = value {
            let value = value
                .parse()
                .map_err(|_| AppError::InvalidInput(format!("Invalid {name} header: {value}")))?;
            headers.insert(name, value);
        }
    }

    let mut request = DownloadRequest::new(args.url.trim(), &args.output)
        .with_headers(headers)
        .with_time_window(TimeWindow::new(start, end));
    if let Some(cookies) = &args.cookies {
        request = request.with_cookies(parse_cookie_string(cookies));
    }
    if let Some(quality) = &args.quality {
        request = request.with_quality(quality);
    }
    if let Some(max_segments) = args.max_segments {
        request = request.with_max_segments(max_segments);
    }
    Ok(request)
}
