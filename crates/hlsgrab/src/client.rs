use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap};
use tracing::{debug, info};

use crate::{DownloadError, DownloaderConfig, cookies, proxy::build_proxy_from_config};

/// Create the HTTP session shared by every transfer of one download.
///
/// `extra_headers` are layered over the configured headers and the cookie
/// set is folded into a single `Cookie` default header.
pub fn create_client(
    config: &DownloaderConfig,
    extra_headers: &HeaderMap,
) -> Result<Client, DownloadError> {
    let mut headers = config.merged_headers(extra_headers);
    if let Some(cookie) = cookies::cookie_header(&config.cookies)? {
        headers.insert(COOKIE, cookie);
    }

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        let proxy = build_proxy_from_config(proxy_config)?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy");
    } else if config.use_system_proxy {
        debug!("Using system proxy settings");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled");
    }

    client_builder.build().map_err(DownloadError::from)
}
