// Playlist handling: fetching manifest text, lenient media playlist parsing
// and URI resolution against the playlist location.

use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::DownloadError;

const EXT_X_MAP: &str = "#EXT-X-MAP:";
const EXTINF: &str = "#EXTINF:";

/// One media segment as declared by a media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Segment URI exactly as written, relative or absolute
    pub uri: String,
    /// Declared duration in seconds, `0.0` when missing or malformed
    pub duration: f64,
}

/// Parsed media playlist. Segment order is playback order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub init_segment_uri: Option<String>,
    pub media_segments: Vec<Segment>,
}

impl Manifest {
    pub fn total_duration(&self) -> f64 {
        self.media_segments.iter().map(|s| s.duration).sum()
    }
}

/// Parse media playlist text.
///
/// Never fails: unknown tags are skipped and a malformed `#EXTINF` duration
/// becomes `0.0`. A playlist without segment lines yields an empty manifest.
pub fn parse_media_playlist(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    let mut pending_duration = 0.0;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if let Some(attributes) = line.strip_prefix(EXT_X_MAP) {
            if let Some(uri) = attribute_value(attributes, "URI") {
                manifest.init_segment_uri = Some(uri);
            }
        } else if let Some(info) = line.strip_prefix(EXTINF) {
            pending_duration = parse_duration(info);
        } else if !line.starts_with('#') {
            manifest.media_segments.push(Segment {
                uri: line.to_string(),
                duration: pending_duration,
            });
            pending_duration = 0.0;
        }
    }

    manifest
}

/// Duration field of an `#EXTINF` tag: everything before the first comma.
fn parse_duration(info: &str) -> f64 {
    let field = info.split(',').next().unwrap_or_default().trim();
    match field.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration >= 0.0 => duration,
        _ => 0.0,
    }
}

/// Split an HLS attribute list (`KEY=value,KEY="quoted,value"`) into ordered
/// key/value pairs. Quotes around values are removed.
pub fn parse_attribute_list(input: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().to_string();

        let (value, remaining) = if let Some(quoted) = after_key.strip_prefix('"') {
            match quoted.split_once('"') {
                Some((value, tail)) => (value.to_string(), tail),
                None => (quoted.to_string(), ""),
            }
        } else {
            match after_key.split_once(',') {
                Some((value, tail)) => (value.trim().to_string(), tail),
                None => (after_key.trim().to_string(), ""),
            }
        };

        if !key.is_empty() {
            attributes.push((key, value));
        }

        rest = remaining.trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    attributes
}

fn attribute_value(attributes: &str, name: &str) -> Option<String> {
    parse_attribute_list(attributes)
        .into_iter()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Location relative URIs of a playlist resolve against: the playlist URL
/// with its last path segment and query removed.
pub fn playlist_base_url(playlist_url: &Url) -> Result<Url, DownloadError> {
    playlist_url.join(".").map_err(|e| {
        DownloadError::invalid_url(
            playlist_url.as_str(),
            format!("failed to determine base URL: {e}"),
        )
    })
}

/// Join `uri` onto `base`. Absolute URIs are returned unchanged.
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url, DownloadError> {
    base.join(uri)
        .map_err(|e| DownloadError::invalid_url(uri, e.to_string()))
}

/// Fetch the text of a playlist. Cancellation is checked before the request.
pub(crate) async fn fetch_playlist_text(
    client: &Client,
    url: &Url,
    timeout: Duration,
    token: &CancellationToken,
) -> Result<String, DownloadError> {
    if token.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    debug!(url = %url, "Fetching playlist");
    let mut request = client.get(url.clone());
    if !timeout.is_zero() {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::manifest(format!(
            "failed to fetch playlist {url}: HTTP {status}"
        )));
    }

    let bytes = response.bytes().await?;
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        DownloadError::manifest(format!("playlist {url} is not valid UTF-8: {e}"))
    })
}
