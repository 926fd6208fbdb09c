//! Request-scoped search inputs.

use serde::{Deserialize, Serialize};

use crate::company::{clean_value, Coordinates};

pub const MAX_RADIUS_KM: f64 = 200.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub label: Option<String>,
}

impl Location {
    /// The user-supplied center, when both components are present and valid.
    #[must_use]
    pub fn center(&self) -> Option<Coordinates> {
        Coordinates::new(self.lat?, self.lon?)
    }

    #[must_use]
    pub fn postcode(&self) -> Option<String> {
        clean_value(self.postcode.as_deref())
    }

    #[must_use]
    pub fn city(&self) -> Option<String> {
        clean_value(self.city.as_deref())
    }

    /// At least one of postcode, city, or a full lat/lon pair.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.postcode().is_some() || self.city().is_some() || self.center().is_some()
    }

    /// Term handed to the geocoder: the postcode wins over the city.
    #[must_use]
    pub fn geocode_term(&self) -> Option<String> {
        self.postcode().or_else(|| self.city())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub location: Location,
    /// Search radius in kilometres, within `0..=MAX_RADIUS_KM`.
    pub radius_km: f64,
    /// Stable sector id; `None` or empty means no sector filter.
    pub sector_id: Option<String>,
}

/// Per-request switches that do not change what is searched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub enrich: bool,
    /// Overrides the configured enrichment cap for this request (0 = unlimited).
    pub enrichment_limit: Option<usize>,
}
