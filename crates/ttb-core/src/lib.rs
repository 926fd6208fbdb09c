pub mod app_config;
pub mod company;
pub mod config;
pub mod kind;
pub mod request;
pub mod sectors;

pub use app_config::{AppConfig, Environment, RegistryKind, UpstreamUrls};
pub use company::{
    clean_value, compose_address, CompanyRecord, Contact, Coordinates, Executive, RecordSource,
    MAX_EXECUTIVES,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use kind::ErrorKind;
pub use request::{Location, SearchOptions, SearchRequest, MAX_RADIUS_KM};
pub use sectors::{SectorEntry, SectorTable};

use thiserror::Error;

/// Errors produced while loading process-level configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sector table {path}: {source}")]
    SectorsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sector table: {0}")]
    SectorsParse(#[from] serde_yaml::Error),

    #[error("invalid sector table: {0}")]
    SectorsInvalid(String),
}
