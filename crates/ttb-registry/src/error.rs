use thiserror::Error;
use ttb_core::ErrorKind;

/// Errors returned by the company registry adapters.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Credentials were rejected (HTTP 401/403).
    #[error("{registry} rejected the credentials (HTTP {status})")]
    Auth { registry: &'static str, status: u16 },

    /// Paid quota exhausted (HTTP 402).
    #[error("{registry} quota exhausted")]
    Quota { registry: &'static str },

    #[error("{registry} is throttling requests (retry after {retry_after_secs:?}s)")]
    Throttled {
        registry: &'static str,
        retry_after_secs: Option<u64>,
    },

    /// Any other 4xx answer.
    #[error("{registry} rejected the request (HTTP {status}): {message}")]
    BadRequest {
        registry: &'static str,
        status: u16,
        message: String,
    },

    /// 5xx answer from the upstream.
    #[error("{registry} unavailable (HTTP {status})")]
    Unavailable { registry: &'static str, status: u16 },

    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("{registry} HTTP error: {source}")]
    Http {
        registry: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The filter lacks the location field this registry searches by.
    #[error("{registry} needs a {field} to search")]
    MissingLocation {
        registry: &'static str,
        field: &'static str,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl RegistryError {
    /// Maps a non-success HTTP status onto the taxonomy.
    #[must_use]
    pub fn from_status(
        registry: &'static str,
        status: reqwest::StatusCode,
        retry_after_secs: Option<u64>,
        message: String,
    ) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth {
                registry,
                status: status.as_u16(),
            },
            402 => Self::Quota { registry },
            429 => Self::Throttled {
                registry,
                retry_after_secs,
            },
            code if status.is_client_error() => Self::BadRequest {
                registry,
                status: code,
                message,
            },
            code => Self::Unavailable {
                registry,
                status: code,
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::RegistryAuthError,
            Self::Quota { .. } => ErrorKind::RegistryQuotaError,
            Self::Throttled { .. } => ErrorKind::RegistryThrottled,
            Self::BadRequest { .. } | Self::MissingLocation { .. } => {
                ErrorKind::RegistryBadRequest
            }
            Self::Unavailable { .. }
            | Self::Http { .. }
            | Self::Deserialize { .. }
            | Self::InvalidBaseUrl { .. } => ErrorKind::RegistryUnavailable,
        }
    }

    /// `true` for errors that say more than "the upstream could not be reached".
    #[must_use]
    pub fn is_specific(&self) -> bool {
        self.kind() != ErrorKind::RegistryUnavailable
    }

    /// Auth and quota failures will not clear up within the same request.
    #[must_use]
    pub fn exhausts_budget(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Quota { .. })
    }
}

/// Errors returned by the geocoder.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no municipality matches '{query}'")]
    NotFound { query: String },

    #[error("geocoder unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    #[error("geocoder HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl GeocodeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::GeocodeNotFound,
            Self::Unavailable { .. }
            | Self::Http(_)
            | Self::Deserialize { .. }
            | Self::InvalidBaseUrl { .. } => ErrorKind::GeocodeUnavailable,
        }
    }
}
