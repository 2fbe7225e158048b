use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("proxy configuration error: {reason}")]
    ProxyConfiguration { reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("manifest error: {reason}")]
    Manifest { reason: String },

    #[error("target quality required for master playlist {url}")]
    QualityRequired { url: String },

    #[error("quality {quality} not found in master playlist")]
    VariantNotFound { quality: String },

    #[error("failed to download {url}: {reason}")]
    Transfer {
        url: String,
        status: Option<StatusCode>,
        reason: String,
    },

    #[error("failed to write output file {}: {source}", path.display())]
    Assembly {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn proxy_configuration(reason: impl Into<String>) -> Self {
        Self::ProxyConfiguration {
            reason: reason.into(),
        }
    }

    pub fn manifest(reason: impl Into<String>) -> Self {
        Self::Manifest {
            reason: reason.into(),
        }
    }

    pub fn variant_not_found(quality: impl Into<String>) -> Self {
        Self::VariantNotFound {
            quality: quality.into(),
        }
    }

    /// A transfer the server answered with a non-success status.
    pub fn transfer_status(url: impl Into<String>, status: StatusCode) -> Self {
        Self::Transfer {
            url: url.into(),
            status: Some(status),
            reason: format!("HTTP {status}"),
        }
    }

    /// A transfer that failed before a complete response was received.
    pub fn transfer_network(url: impl Into<String>, source: &reqwest::Error) -> Self {
        let reason = if source.is_timeout() {
            format!("timed out: {source}")
        } else {
            source.to_string()
        };
        Self::Transfer {
            url: url.into(),
            status: source.status(),
            reason,
        }
    }

    pub fn assembly(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Assembly {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Short machine-readable label of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::ProxyConfiguration { .. } => "proxy_configuration",
            Self::Network { .. } => "network",
            Self::Manifest { .. } => "manifest",
            Self::QualityRequired { .. } | Self::VariantNotFound { .. } => "variant_not_found",
            Self::Transfer { .. } => "transfer",
            Self::Assembly { .. } => "assembly",
            Self::Io { .. } => "io",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }

    /// HTTP status carried by a failed transfer, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transfer { status, .. } => *status,
            Self::Network { source } => source.status(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transfer { status, .. } => match status {
                Some(status) => {
                    status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
                }
                None => true,
            },
            Self::Network { source } => {
                source.is_connect() || source.is_timeout() || source.is_request() || source.is_body()
            }
            Self::Cancelled
            | Self::InvalidUrl { .. }
            | Self::ProxyConfiguration { .. }
            | Self::Manifest { .. }
            | Self::QualityRequired { .. }
            | Self::VariantNotFound { .. }
            | Self::Assembly { .. }
            | Self::Io { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }
}
