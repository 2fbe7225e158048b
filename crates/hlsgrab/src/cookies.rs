//! Cookie helpers for authenticated stream sessions.

use std::collections::BTreeMap;

use reqwest::header::HeaderValue;

use crate::DownloadError;

/// Flat cookie mapping sent with every request of a download session.
pub type CookieSet = BTreeMap<String, String>;

/// Parse a browser-style cookie string (`"NID_AUT=abc; NID_SES=def"`).
///
/// Fragments without `=` are skipped. Only the first `=` separates the
/// name from the value, so values may themselves contain `=`.
pub fn parse_cookie_string(input: &str) -> CookieSet {
    input
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Render a cookie set as a `Cookie` header value.
///
/// Returns `Ok(None)` for an empty set. A pair that cannot be carried in a
/// header is a configuration error naming the cookie.
pub fn cookie_header(cookies: &CookieSet) -> Result<Option<HeaderValue>, DownloadError> {
    if cookies.is_empty() {
        return Ok(None);
    }

    let mut pairs = Vec::with_capacity(cookies.len());
    for (name, value) in cookies {
        let pair = format!("{name}={value}");
        if HeaderValue::from_str(&pair).is_err() {
            return Err(DownloadError::configuration(format!(
                "cookie `{name}` contains characters not allowed in an HTTP header"
            )));
        }
        pairs.push(pair);
    }

    HeaderValue::from_str(&pairs.join("; "))
        .map(Some)
        .map_err(|e| DownloadError::configuration(format!("invalid cookie header: {e}")))
}
