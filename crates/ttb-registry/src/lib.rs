//! Upstream company registries and the geocoder, behind one adapter trait.

pub mod adapter;
pub mod error;
pub mod fanout;
pub mod geocode;
mod http;
mod normalize;
pub mod pappers;
pub mod recherche;
pub mod sirene;

use std::sync::Arc;
use std::time::Duration;

pub use adapter::{DetailBudget, LocationFilter, RegistryAdapter};
pub use error::{GeocodeError, RegistryError};
pub use fanout::{bounded_codes, fan_out, FanOutLimits, FanOutReport, SubQueryFailure};
pub use geocode::{Geocoder, ResolvedPlace};
pub use pappers::{PappersClient, PappersLimits};
pub use recherche::RechercheClient;
pub use sirene::SireneClient;

use ttb_core::{AppConfig, RegistryKind};

/// Builds the registries enabled in `config`, in configuration order.
///
/// # Errors
///
/// Returns [`RegistryError::Auth`] for an enabled registry whose credential
/// is missing, or any construction error from the individual clients.
pub fn build_registries(
    config: &AppConfig,
) -> Result<Vec<Arc<dyn RegistryAdapter>>, RegistryError> {
    let urls = &config.upstream_urls;
    let mut registries: Vec<Arc<dyn RegistryAdapter>> =
        Vec::with_capacity(config.registries.len());

    for kind in &config.registries {
        let registry: Arc<dyn RegistryAdapter> = match kind {
            RegistryKind::Recherche => Arc::new(match urls.recherche.as_deref() {
                Some(base) => RechercheClient::with_base_url(
                    config.http_timeout_secs,
                    &config.user_agent,
                    config.registry_max_pages,
                    base,
                )?,
                None => RechercheClient::new(
                    config.http_timeout_secs,
                    &config.user_agent,
                    config.registry_max_pages,
                )?,
            }),
            RegistryKind::Pappers => {
                let token = config
                    .pappers_api_token
                    .as_deref()
                    .ok_or(RegistryError::Auth {
                        registry: "pappers",
                        status: 401,
                    })?;
                let limits = PappersLimits {
                    max_pages: config.registry_max_pages,
                    max_detail_calls: config.pappers_max_detail_calls,
                    detail_delay: Duration::from_millis(config.pappers_detail_delay_ms),
                };
                Arc::new(match urls.pappers.as_deref() {
                    Some(base) => PappersClient::with_base_url(
                        token,
                        config.http_timeout_secs,
                        &config.user_agent,
                        limits,
                        base,
                    )?,
                    None => PappersClient::new(
                        token,
                        config.http_timeout_secs,
                        &config.user_agent,
                        limits,
                    )?,
                })
            }
            RegistryKind::Sirene => {
                let key = config.insee_api_key.as_deref().ok_or(RegistryError::Auth {
                    registry: "sirene",
                    status: 401,
                })?;
                Arc::new(match urls.sirene.as_deref() {
                    Some(base) => SireneClient::with_base_url(
                        key,
                        config.http_timeout_secs,
                        &config.user_agent,
                        config.registry_max_pages,
                        base,
                    )?,
                    None => SireneClient::new(
                        key,
                        config.http_timeout_secs,
                        &config.user_agent,
                        config.registry_max_pages,
                    )?,
                })
            }
        };
        registries.push(registry);
    }

    Ok(registries)
}

/// Builds the geocoder from `config`.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the client cannot be constructed.
pub fn build_geocoder(config: &AppConfig) -> Result<Geocoder, GeocodeError> {
    match config.upstream_urls.geocoder.as_deref() {
        Some(base) => {
            Geocoder::with_base_url(config.geocoder_timeout_secs, &config.user_agent, base)
        }
        None => Geocoder::new(config.geocoder_timeout_secs, &config.user_agent),
    }
}
