use thiserror::Error;
use ttb_core::{ConfigError, ErrorKind};
use ttb_enrich::EnrichmentError;
use ttb_registry::{GeocodeError, RegistryError};

/// Errors a search can end with. Absorbed failures surface as warnings on
/// the outcome instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("could not locate the requested place: {0}")]
    Geocode(#[from] GeocodeError),

    /// Every registry sub-query failed; `cause` is the most specific failure.
    #[error("all registry sources failed: {cause}")]
    AllSourcesFailed {
        #[source]
        cause: RegistryError,
    },
}

impl SearchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Geocode(e) => e.kind(),
            Self::AllSourcesFailed { .. } => ErrorKind::AllSourcesFailed,
        }
    }

    /// Kind of the retained upstream failure, for `AllSourcesFailed`.
    #[must_use]
    pub fn cause_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::AllSourcesFailed { cause } => Some(cause.kind()),
            _ => None,
        }
    }
}

/// Errors raised while wiring a [`crate::SearchService`] from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build registry client: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to build geocoder: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("failed to build directory client: {0}")]
    Enrichment(#[from] EnrichmentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failed_keeps_cause_kind() {
        let err = SearchError::AllSourcesFailed {
            cause: RegistryError::Auth {
                registry: "pappers",
                status: 401,
            },
        };
        assert_eq!(err.kind(), ErrorKind::AllSourcesFailed);
        assert_eq!(err.cause_kind(), Some(ErrorKind::RegistryAuthError));
        assert!(err.to_string().contains("all registry sources failed"));
    }

    #[test]
    fn geocode_error_keeps_its_kind() {
        let err = SearchError::from(GeocodeError::NotFound {
            query: "Nowhere".into(),
        });
        assert_eq!(err.kind(), ErrorKind::GeocodeNotFound);
        assert_eq!(err.cause_kind(), None);
    }
}
