use thiserror::Error;
use ttb_core::ErrorKind;

/// Errors returned while fetching a directory page.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory refused automated access (HTTP 403).
    #[error("directory blocked automated requests at {url}")]
    Blocked { url: String },

    #[error("directory rate limited requests (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid directory base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl EnrichmentError {
    /// Only a block reaches the caller as such; the other failures are
    /// absorbed per item and map onto the closest upstream kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Blocked { .. } => ErrorKind::EnrichmentBlocked,
            Self::RateLimited { .. } => ErrorKind::RegistryThrottled,
            Self::Http(_) | Self::UnexpectedStatus { .. } | Self::InvalidBaseUrl { .. } => {
                ErrorKind::RegistryUnavailable
            }
        }
    }
}
