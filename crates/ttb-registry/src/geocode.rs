//! Resolves a postcode or commune name to a point, and a point back to its
//! commune, via the national address service (`api-adresse.data.gouv.fr`).
//! Never retries.

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use ttb_core::{clean_value, Coordinates};

use crate::error::GeocodeError;
use crate::http::{build_client, parse_base_url};

const DEFAULT_BASE_URL: &str = "https://api-adresse.data.gouv.fr";

/// A geocoded municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub point: Coordinates,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub label: Option<String>,
}

pub struct Geocoder {
    client: Client,
    base_url: Url,
}

impl Geocoder {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GeocodeError::InvalidBaseUrl`] for a malformed `base_url`.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = build_client(timeout_secs, user_agent)?;
        let base_url = parse_base_url(base_url).map_err(|reason| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        })?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GeocodeError> {
        self.base_url
            .join(path)
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    fn search_url(&self, term: &str) -> Result<Url, GeocodeError> {
        let mut url = self.endpoint("search/")?;
        url.query_pairs_mut()
            .append_pair("q", term)
            .append_pair("type", "municipality")
            .append_pair("limit", "1");
        Ok(url)
    }

    fn reverse_url(&self, point: Coordinates) -> Result<Url, GeocodeError> {
        let mut url = self.endpoint("reverse/")?;
        url.query_pairs_mut()
            .append_pair("lat", &point.lat.to_string())
            .append_pair("lon", &point.lon.to_string())
            .append_pair("type", "municipality")
            .append_pair("limit", "1");
        Ok(url)
    }

    /// Resolves `term` (postcode or commune name) to its municipality centre.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::NotFound`] when the service returns no match, or
    ///   rejects the term as a bad query (400/404).
    /// - [`GeocodeError::Unavailable`] on a 5xx answer, a timeout or a
    ///   rate-limit status.
    /// - [`GeocodeError::Http`] on network failure or timeout.
    /// - [`GeocodeError::Deserialize`] if the body is not the expected GeoJSON.
    pub async fn resolve(&self, term: &str) -> Result<ResolvedPlace, GeocodeError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(GeocodeError::NotFound {
                query: String::new(),
            });
        }

        let url = self.search_url(term)?;
        let place = self.first_place(url, term).await?;
        tracing::debug!(
            query = term,
            lat = place.point.lat,
            lon = place.point.lon,
            city = ?place.city,
            "geocoded location"
        );
        Ok(place)
    }

    /// Finds the municipality containing `point`. Registries search by
    /// postcode or commune, so a bare point needs one of those first.
    ///
    /// # Errors
    ///
    /// Same as [`Geocoder::resolve`].
    pub async fn reverse(&self, point: Coordinates) -> Result<ResolvedPlace, GeocodeError> {
        let query = format!("{},{}", point.lat, point.lon);
        let url = self.reverse_url(point)?;
        let place = self.first_place(url, &query).await?;
        tracing::debug!(
            query = %query,
            city = ?place.city,
            postcode = ?place.postcode,
            "reverse geocoded point"
        );
        Ok(place)
    }

    async fn first_place(&self, url: Url, query: &str) -> Result<ResolvedPlace, GeocodeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Err(GeocodeError::NotFound {
                query: query.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(GeocodeError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let collection: FeatureCollection =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: format!("geocode(q={query})"),
                source: e,
            })?;

        collection
            .features
            .into_iter()
            .find_map(Feature::into_place)
            .ok_or_else(|| GeocodeError::NotFound {
                query: query.to_owned(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// GeoJSON order: longitude first.
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    city: Option<String>,
    name: Option<String>,
    postcode: Option<String>,
    label: Option<String>,
}

impl Feature {
    fn into_place(self) -> Option<ResolvedPlace> {
        let [lon, lat] = self.geometry.coordinates.as_slice() else {
            return None;
        };
        Some(ResolvedPlace {
            point: Coordinates::new(*lat, *lon)?,
            city: clean_value(self.properties.city).or_else(|| clean_value(self.properties.name)),
            postcode: clean_value(self.properties.postcode),
            label: clean_value(self.properties.label),
        })
    }
}
