//! Error taxonomy shared by every pipeline stage.
//!
//! Each crate keeps its own `thiserror` enum; they all project onto
//! [`ErrorKind`] so the boundary layer can map failures to a status code
//! without knowing which upstream produced them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    GeocodeNotFound,
    GeocodeUnavailable,
    RegistryAuthError,
    RegistryQuotaError,
    RegistryThrottled,
    RegistryBadRequest,
    RegistryUnavailable,
    EnrichmentBlocked,
    AllSourcesFailed,
}

impl ErrorKind {
    /// Stable wire code, identical to the serde representation.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::GeocodeNotFound => "geocode_not_found",
            Self::GeocodeUnavailable => "geocode_unavailable",
            Self::RegistryAuthError => "registry_auth_error",
            Self::RegistryQuotaError => "registry_quota_error",
            Self::RegistryThrottled => "registry_throttled",
            Self::RegistryBadRequest => "registry_bad_request",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::EnrichmentBlocked => "enrichment_blocked",
            Self::AllSourcesFailed => "all_sources_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_serde_representation() {
        for kind in [
            ErrorKind::InvalidRequest,
            ErrorKind::GeocodeNotFound,
            ErrorKind::RegistryThrottled,
            ErrorKind::EnrichmentBlocked,
            ErrorKind::AllSourcesFailed,
        ] {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }
}
