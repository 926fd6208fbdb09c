//! POST /api/v1/companies/search

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use ttb_core::{Location, SearchOptions, SearchRequest, MAX_RADIUS_KM};
use ttb_search::SearchOutcome;

use crate::middleware::RequestId;

use super::{map_search_error, public_message, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_CITY_CHARS: usize = 100;
const MAX_LABEL_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct LocationBody {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct SearchBody {
    #[serde(default)]
    pub location: LocationBody,
    pub radius: Option<f64>,
    pub sector: Option<String>,
    #[serde(default)]
    pub enrich: bool,
    pub enrichment_limit: Option<usize>,
}

fn invalid(req_id: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(req_id, "validation_error", message)
}

/// Trims a free-text field; empty becomes `None`.
fn text_field(
    req_id: &str,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, ApiError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max_chars {
        return Err(invalid(
            req_id,
            format!("{field} must be at most {max_chars} characters"),
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(invalid(
            req_id,
            format!("{field} must not contain control characters"),
        ));
    }
    Ok(Some(value.to_owned()))
}

fn validate_postcode(req_id: &str, value: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.len() == 5 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(Some(value.to_owned()))
    } else {
        Err(invalid(
            req_id,
            format!("postcode must be 5 digits, got '{value}'"),
        ))
    }
}

fn validate_point(
    req_id: &str,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), ApiError> {
    match (lat, lon) {
        (None, None) => Ok((None, None)),
        (Some(lat), Some(lon)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(invalid(req_id, "lat must be between -90 and 90"));
            }
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(invalid(req_id, "lon must be between -180 and 180"));
            }
            Ok((Some(lat), Some(lon)))
        }
        _ => Err(invalid(req_id, "lat and lon must be given together")),
    }
}

pub(in crate::api) fn validate(
    state: &AppState,
    req_id: &str,
    body: &SearchBody,
) -> Result<(SearchRequest, SearchOptions), ApiError> {
    let radius_km = body.radius.unwrap_or(state.default_radius_km);
    if !radius_km.is_finite() || !(0.0..=MAX_RADIUS_KM).contains(&radius_km) {
        return Err(invalid(
            req_id,
            format!("radius must be between 0 and {MAX_RADIUS_KM} km"),
        ));
    }

    let (lat, lon) = validate_point(req_id, body.location.lat, body.location.lon)?;
    let location = Location {
        lat,
        lon,
        city: text_field(req_id, "city", body.location.city.as_deref(), MAX_CITY_CHARS)?,
        postcode: validate_postcode(req_id, body.location.postcode.as_deref())?,
        label: text_field(req_id, "label", body.location.label.as_deref(), MAX_LABEL_CHARS)?,
    };
    if !location.is_usable() {
        return Err(invalid(
            req_id,
            "location needs a postcode, a city or a lat/lon pair",
        ));
    }

    let sector_id = match body.sector.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(id) if state.service.sectors().is_known(id) => Some(id.to_owned()),
        Some(id) => return Err(invalid(req_id, format!("unknown sector '{id}'"))),
    };

    Ok((
        SearchRequest {
            location,
            radius_km,
            sector_id,
        },
        SearchOptions {
            enrich: body.enrich,
            enrichment_limit: body.enrichment_limit,
        },
    ))
}

pub(in crate::api) async fn search_companies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SearchBody>,
) -> Result<Json<ApiResponse<SearchOutcome>>, ApiError> {
    let (request, options) = validate(&state, &req_id.0, &body)?;

    let mut outcome = state
        .service
        .search(&request, options)
        .await
        .map_err(|e| map_search_error(&state, req_id.0.clone(), &e))?;

    // Absorbed failures can quote upstream bodies.
    if !state.expose_details {
        for warning in &mut outcome.warnings {
            public_message(warning.kind).clone_into(&mut warning.message);
        }
    }

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}
