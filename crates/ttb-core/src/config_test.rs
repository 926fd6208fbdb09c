use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TTB_ENV"));
}

#[test]
fn build_app_config_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:5000");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.sectors_path.is_none());
    assert_eq!(cfg.registries, vec![RegistryKind::Recherche]);
    assert!(cfg.pappers_api_token.is_none());
    assert!(cfg.insee_api_key.is_none());
    assert_eq!(cfg.upstream_urls, UpstreamUrls::default());
    assert_eq!(cfg.http_timeout_secs, 30);
    assert_eq!(cfg.geocoder_timeout_secs, 10);
    assert_eq!(cfg.user_agent, "trouvetaboite/0.1 (company-search)");
    assert!((cfg.default_radius_km - 20.0).abs() < f64::EPSILON);
    assert_eq!(cfg.max_concurrent_subqueries, 5);
    assert_eq!(cfg.max_codes_per_sector, 5);
    assert_eq!(cfg.registry_max_pages, 1);
    assert_eq!(cfg.pappers_max_detail_calls, 50);
    assert_eq!(cfg.pappers_detail_delay_ms, 100);
    assert_eq!(cfg.enrichment_limit, 20);
    assert_eq!(cfg.enrichment_delay_ms, 2000);
    assert_eq!(cfg.enrichment_rate_limit_pause_ms, 5000);
    assert_eq!(cfg.enrichment_timeout_secs, 20);
    assert_eq!(cfg.search_rate_limit_per_minute, 100);
}

#[test]
fn production_tightens_default_rate_limit() {
    let mut map = HashMap::new();
    map.insert("TTB_ENV", "production");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.search_rate_limit_per_minute, 10);
}

#[test]
fn explicit_rate_limit_wins_in_production() {
    let mut map = HashMap::new();
    map.insert("TTB_ENV", "production");
    map.insert("TTB_SEARCH_RATE_LIMIT_PER_MINUTE", "42");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.search_rate_limit_per_minute, 42);
}

#[test]
fn pappers_requires_token() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", "recherche,pappers");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "PAPPERS_API_TOKEN"),
        "expected MissingEnvVar(PAPPERS_API_TOKEN), got: {result:?}"
    );
}

#[test]
fn sirene_requires_api_key() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", "sirene");
    map.insert("INSEE_API_KEY", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "INSEE_API_KEY"),
        "expected MissingEnvVar(INSEE_API_KEY), got: {result:?}"
    );
}

#[test]
fn registries_parse_case_insensitive_and_dedupe() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", " Pappers, sirene ,pappers");
    map.insert("PAPPERS_API_TOKEN", "tok");
    map.insert("INSEE_API_KEY", "key");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.registries,
        vec![RegistryKind::Pappers, RegistryKind::Sirene]
    );
    assert_eq!(cfg.pappers_api_token.as_deref(), Some("tok"));
}

#[test]
fn unknown_registry_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", "recherche,societe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TTB_REGISTRIES"
        ),
        "expected InvalidEnvVar(TTB_REGISTRIES), got: {result:?}"
    );
}

#[test]
fn empty_registry_list_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", " , ");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn invalid_bind_addr_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TTB_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TTB_BIND_ADDR"),
        "expected InvalidEnvVar(TTB_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn default_radius_must_be_in_range() {
    for bad in ["0", "-3", "250", "abc"] {
        let mut map = HashMap::new();
        map.insert("TTB_DEFAULT_RADIUS_KM", bad);
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(
                result,
                Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TTB_DEFAULT_RADIUS_KM"
            ),
            "radius {bad} should be rejected, got: {result:?}"
        );
    }
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TTB_MAX_CONCURRENT_SUBQUERIES", "0");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn enrichment_limit_zero_means_unlimited_and_is_accepted() {
    let mut map = HashMap::new();
    map.insert("TTB_ENRICHMENT_LIMIT", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.enrichment_limit, 0);
}

#[test]
fn base_url_overrides_are_read() {
    let mut map = HashMap::new();
    map.insert("TTB_GEOCODER_BASE_URL", "http://127.0.0.1:9000");
    map.insert("TTB_DIRECTORY_BASE_URL", " ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.upstream_urls.geocoder.as_deref(),
        Some("http://127.0.0.1:9000")
    );
    assert!(cfg.upstream_urls.directory.is_none());
}

#[test]
fn debug_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("TTB_REGISTRIES", "pappers");
    map.insert("PAPPERS_API_TOKEN", "super-secret-token");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret-token"));
    assert!(rendered.contains("[redacted]"));
}
