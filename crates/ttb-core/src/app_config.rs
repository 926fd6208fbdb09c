use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Upstream company registries a deployment can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Recherche,
    Pappers,
    Sirene,
}

impl RegistryKind {
    /// Parses one entry of `TTB_REGISTRIES`. Case-insensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recherche" | "recherche-entreprises" => Some(Self::Recherche),
            "pappers" => Some(Self::Pappers),
            "sirene" | "insee" => Some(Self::Sirene),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recherche => "recherche",
            Self::Pappers => "pappers",
            Self::Sirene => "sirene",
        }
    }
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URL overrides for every upstream. `None` means the public production host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamUrls {
    pub recherche: Option<String>,
    pub pappers: Option<String>,
    pub sirene: Option<String>,
    pub geocoder: Option<String>,
    pub directory: Option<String>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub sectors_path: Option<PathBuf>,
    pub registries: Vec<RegistryKind>,
    pub pappers_api_token: Option<String>,
    pub insee_api_key: Option<String>,
    pub upstream_urls: UpstreamUrls,
    pub http_timeout_secs: u64,
    pub geocoder_timeout_secs: u64,
    pub user_agent: String,
    pub default_radius_km: f64,
    pub max_concurrent_subqueries: usize,
    pub max_codes_per_sector: usize,
    pub registry_max_pages: u32,
    pub pappers_max_detail_calls: usize,
    pub pappers_detail_delay_ms: u64,
    pub enrichment_limit: usize,
    pub enrichment_delay_ms: u64,
    pub enrichment_rate_limit_pause_ms: u64,
    pub enrichment_timeout_secs: u64,
    pub search_rate_limit_per_minute: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("sectors_path", &self.sectors_path)
            .field("registries", &self.registries)
            .field(
                "pappers_api_token",
                &self.pappers_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "insee_api_key",
                &self.insee_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("upstream_urls", &self.upstream_urls)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("geocoder_timeout_secs", &self.geocoder_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("default_radius_km", &self.default_radius_km)
            .field(
                "max_concurrent_subqueries",
                &self.max_concurrent_subqueries,
            )
            .field("max_codes_per_sector", &self.max_codes_per_sector)
            .field("registry_max_pages", &self.registry_max_pages)
            .field("pappers_max_detail_calls", &self.pappers_max_detail_calls)
            .field("pappers_detail_delay_ms", &self.pappers_detail_delay_ms)
            .field("enrichment_limit", &self.enrichment_limit)
            .field("enrichment_delay_ms", &self.enrichment_delay_ms)
            .field(
                "enrichment_rate_limit_pause_ms",
                &self.enrichment_rate_limit_pause_ms,
            )
            .field("enrichment_timeout_secs", &self.enrichment_timeout_secs)
            .field(
                "search_rate_limit_per_minute",
                &self.search_rate_limit_per_minute,
            )
            .finish()
    }
}
