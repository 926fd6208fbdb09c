use crate::app_config::{AppConfig, Environment, RegistryKind, UpstreamUrls};
use crate::request::MAX_RADIUS_KM;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("TTB_ENV", "development"))?;

    let bind_addr = parse_addr("TTB_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("TTB_LOG_LEVEL", "info");
    let sectors_path = optional("TTB_SECTORS_PATH").map(PathBuf::from);

    let registries = parse_registries(&or_default("TTB_REGISTRIES", "recherche"))?;
    let pappers_api_token = if registries.contains(&RegistryKind::Pappers) {
        Some(require("PAPPERS_API_TOKEN")?)
    } else {
        optional("PAPPERS_API_TOKEN")
    };
    let insee_api_key = if registries.contains(&RegistryKind::Sirene) {
        Some(require("INSEE_API_KEY")?)
    } else {
        optional("INSEE_API_KEY")
    };

    let upstream_urls = UpstreamUrls {
        recherche: optional("TTB_RECHERCHE_BASE_URL"),
        pappers: optional("TTB_PAPPERS_BASE_URL"),
        sirene: optional("TTB_SIRENE_BASE_URL"),
        geocoder: optional("TTB_GEOCODER_BASE_URL"),
        directory: optional("TTB_DIRECTORY_BASE_URL"),
    };

    let http_timeout_secs = parse_u64("TTB_HTTP_TIMEOUT_SECS", "30")?;
    let geocoder_timeout_secs = parse_u64("TTB_GEOCODER_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("TTB_USER_AGENT", "trouvetaboite/0.1 (company-search)");

    let default_radius_km = parse_radius(&or_default("TTB_DEFAULT_RADIUS_KM", "20"))?;

    let max_concurrent_subqueries = parse_usize("TTB_MAX_CONCURRENT_SUBQUERIES", "5")?;
    if max_concurrent_subqueries == 0 {
        return Err(invalid(
            "TTB_MAX_CONCURRENT_SUBQUERIES",
            "must be at least 1".to_string(),
        ));
    }
    let max_codes_per_sector = parse_usize("TTB_MAX_CODES_PER_SECTOR", "5")?;
    if max_codes_per_sector == 0 {
        return Err(invalid(
            "TTB_MAX_CODES_PER_SECTOR",
            "must be at least 1".to_string(),
        ));
    }
    let registry_max_pages = parse_u32("TTB_REGISTRY_MAX_PAGES", "1")?.max(1);

    let pappers_max_detail_calls = parse_usize("TTB_PAPPERS_MAX_DETAIL_CALLS", "50")?;
    let pappers_detail_delay_ms = parse_u64("TTB_PAPPERS_DETAIL_DELAY_MS", "100")?;

    let enrichment_limit = parse_usize("TTB_ENRICHMENT_LIMIT", "20")?;
    let enrichment_delay_ms = parse_u64("TTB_ENRICHMENT_DELAY_MS", "2000")?;
    let enrichment_rate_limit_pause_ms = parse_u64("TTB_ENRICHMENT_RATE_LIMIT_PAUSE_MS", "5000")?;
    let enrichment_timeout_secs = parse_u64("TTB_ENRICHMENT_TIMEOUT_SECS", "20")?;

    let default_rate_limit = if env == Environment::Production {
        "10"
    } else {
        "100"
    };
    let search_rate_limit_per_minute =
        parse_u32("TTB_SEARCH_RATE_LIMIT_PER_MINUTE", default_rate_limit)?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        sectors_path,
        registries,
        pappers_api_token,
        insee_api_key,
        upstream_urls,
        http_timeout_secs,
        geocoder_timeout_secs,
        user_agent,
        default_radius_km,
        max_concurrent_subqueries,
        max_codes_per_sector,
        registry_max_pages,
        pappers_max_detail_calls,
        pappers_detail_delay_ms,
        enrichment_limit,
        enrichment_delay_ms,
        enrichment_rate_limit_pause_ms,
        enrichment_timeout_secs,
        search_rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TTB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parses the comma-separated `TTB_REGISTRIES` list, dropping duplicates.
fn parse_registries(raw: &str) -> Result<Vec<RegistryKind>, ConfigError> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = RegistryKind::parse(part).ok_or_else(|| ConfigError::InvalidEnvVar {
            var: "TTB_REGISTRIES".to_string(),
            reason: format!("unknown registry '{part}'"),
        })?;
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    if out.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "TTB_REGISTRIES".to_string(),
            reason: "at least one registry must be enabled".to_string(),
        });
    }
    Ok(out)
}

fn parse_radius(raw: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "TTB_DEFAULT_RADIUS_KM".to_string(),
        reason,
    };
    let value = raw.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;
    if !value.is_finite() || value <= 0.0 || value > MAX_RADIUS_KM {
        return Err(invalid(format!(
            "must be greater than 0 and at most {MAX_RADIUS_KM}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
