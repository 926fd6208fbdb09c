mod search;
mod sectors;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use ttb_core::ErrorKind;
use ttb_search::{SearchError, SearchService};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub default_radius_km: f64,
    /// Upstream error details are only echoed outside production.
    pub expose_details: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Upstream failure behind `all_sources_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    registries: usize,
    sectors: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                cause: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn with_cause(mut self, cause: Option<ErrorKind>) -> Self {
        self.error.cause = cause.map(|k| k.code().to_owned());
        self
    }
}

fn status_for(code: &str) -> StatusCode {
    match code {
        "invalid_request" | "validation_error" | "registry_bad_request" => StatusCode::BAD_REQUEST,
        "geocode_not_found" => StatusCode::NOT_FOUND,
        "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
        "geocode_unavailable" | "registry_quota_error" | "registry_throttled" => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        "registry_auth_error" | "registry_unavailable" | "all_sources_failed" => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let code = self.error.cause.as_deref().unwrap_or(&self.error.code);
        let status = status_for(code);
        (status, Json(self)).into_response()
    }
}

fn public_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidRequest => "invalid search request",
        ErrorKind::GeocodeNotFound => "the requested place could not be located",
        ErrorKind::GeocodeUnavailable => "the geocoding service is unavailable",
        ErrorKind::RegistryAuthError => "a company registry rejected our credentials",
        ErrorKind::RegistryQuotaError => "the company registry quota is exhausted",
        ErrorKind::RegistryThrottled => "the company registries are throttling requests",
        ErrorKind::RegistryBadRequest => "a company registry rejected the search",
        ErrorKind::RegistryUnavailable => "the company registries are unavailable",
        ErrorKind::EnrichmentBlocked => "contact enrichment was blocked",
        ErrorKind::AllSourcesFailed => "no company registry could answer the search",
    }
}

pub(super) fn map_search_error(
    state: &AppState,
    request_id: String,
    error: &SearchError,
) -> ApiError {
    let kind = error.kind();
    if matches!(kind, ErrorKind::InvalidRequest) {
        tracing::debug!(error = %error, "search rejected");
    } else {
        tracing::warn!(error = %error, kind = %kind, "search failed");
    }
    let message = if state.expose_details || matches!(kind, ErrorKind::InvalidRequest) {
        error.to_string()
    } else {
        public_message(kind).to_owned()
    };
    ApiError::new(request_id, kind.code(), message).with_cause(error.cause_kind())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn search_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/companies/search", post(search::search_companies))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/sectors", get(sectors::list_sectors));

    Router::new()
        .merge(public_routes)
        .merge(search_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            data: HealthData {
                status: "ok",
                registries: state.service.registry_count(),
                sectors: state.service.sectors().sectors().len(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}
