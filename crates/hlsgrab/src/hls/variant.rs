// Variant selection for master playlists.

use url::Url;

use crate::DownloadError;
use crate::hls::playlist::{parse_attribute_list, resolve_uri};

const EXT_X_STREAM_INF: &str = "#EXT-X-STREAM-INF";

/// Label to pixel dimensions used when the label is not part of the URI.
const QUALITY_DIMENSIONS: &[(&str, &str)] = &[
    ("1080p", "1920x1080"),
    ("720p", "1280x720"),
    ("480p", "852x480"),
    ("360p", "640x360"),
    ("144p", "256x144"),
];

/// One `#EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantReference {
    /// Stream-info attributes in declaration order
    pub attributes: Vec<(String, String)>,
    /// Media playlist URI as written
    pub uri: String,
}

impl VariantReference {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn resolution(&self) -> Option<&str> {
        self.attribute("RESOLUTION")
    }

    fn matches(&self, quality: &str) -> bool {
        if self.uri.contains(quality) || self.uri.contains(&format!("/{quality}/")) {
            return true;
        }

        match (quality_dimensions(quality), self.resolution()) {
            (Some(expected), Some(declared)) => declared.eq_ignore_ascii_case(expected),
            _ => false,
        }
    }
}

/// Pixel dimensions (`WxH`) of a known quality label.
pub fn quality_dimensions(quality: &str) -> Option<&'static str> {
    QUALITY_DIMENSIONS
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(quality))
        .map(|(_, dimensions)| *dimensions)
}

/// A manifest is a master playlist when it carries a stream-info tag.
pub fn is_master_playlist(text: &str) -> bool {
    text.contains(EXT_X_STREAM_INF)
}

/// All variants of a master playlist, in declaration order.
///
/// The URI of a variant is the next non-empty line that is not a tag. A
/// stream-info tag directly followed by another stream-info tag is dropped.
pub fn parse_variants(text: &str) -> Vec<VariantReference> {
    let mut variants = Vec::new();
    let mut pending: Option<Vec<(String, String)>> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if let Some(tag) = line.strip_prefix(EXT_X_STREAM_INF) {
            let attributes = tag.strip_prefix(':').unwrap_or(tag);
            pending = Some(parse_attribute_list(attributes));
        } else if line.starts_with('#') {
            continue;
        } else if let Some(attributes) = pending.take() {
            variants.push(VariantReference {
                attributes,
                uri: line.to_string(),
            });
        }
    }

    variants
}

/// Resolve the media playlist URL for `quality` from master playlist text.
///
/// The first variant whose URI contains the label, or whose `RESOLUTION`
/// equals the label's known dimensions, wins. No fallback variant is chosen.
pub fn select_variant(text: &str, base_url: &Url, quality: &str) -> Result<Url, DownloadError> {
    let quality = quality.trim();
    if quality.is_empty() {
        return Err(DownloadError::variant_not_found(quality));
    }

    let variant = parse_variants(text)
        .into_iter()
        .find(|variant| variant.matches(quality))
        .ok_or_else(|| DownloadError::variant_not_found(quality))?;

    resolve_uri(base_url, &variant.uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
        #EXT-X-STREAM-INF:BANDWIDTH=8000000,RESOLUTION=1920x1080,CODECS=\"avc1.640028,mp4a.40.2\"\n\
        hd/chunklist.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=3000000,RESOLUTION=1280x720\n\
        mid/chunklist.m3u8\n";

    fn base() -> Url {
        Url::parse("https://cdn.example.com/live/abc/master.m3u8").unwrap()
    }

    #[test]
    fn detects_master_playlist() {
        assert!(is_master_playlist(MASTER));
        assert!(!is_master_playlist("#EXTM3U\n#EXTINF:4,\na.m4v\n"));
    }

    #[test]
    fn resolution_fallback_selects_720p() {
        let url = select_variant(MASTER, &base(), "720p").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/live/abc/mid/chunklist.m3u8");
    }

    #[test]
    fn label_in_uri_wins_over_later_resolution_match() {
        let master = "#EXTM3U\n\
            #EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=640x360\n\
            https://other.example.com/720p/index.m3u8\n\
            #EXT-X-STREAM-INF:BANDWIDTH=2,RESOLUTION=1280x720\n\
            b.m3u8\n";
        let url = select_variant(master, &base(), "720p").unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/720p/index.m3u8");
    }

    #[test]
    fn unknown_quality_is_not_found() {
        let err = select_variant(MASTER, &base(), "480p").unwrap_err();
        assert!(matches!(err, DownloadError::VariantNotFound { ref quality } if quality == "480p"));

        let err = select_variant(MASTER, &base(), "4k").unwrap_err();
        assert!(matches!(err, DownloadError::VariantNotFound { .. }));
    }

    #[test]
    fn stream_inf_without_uri_is_skipped() {
        let master = "#EXTM3U\n\
            #EXT-X-STREAM-INF:RESOLUTION=1920x1080\n\
            #EXT-X-STREAM-INF:RESOLUTION=1280x720\n\
            \n\
            720.m3u8\n";
        let variants = parse_variants(master);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].resolution(), Some("1280x720"));
        assert_eq!(variants[0].uri, "720.m3u8");
    }
}
