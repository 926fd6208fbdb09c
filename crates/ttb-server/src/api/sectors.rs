use axum::{extract::State, Extension, Json};
use serde::Serialize;
use ttb_core::SectorEntry;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct SectorsData {
    pub version: u32,
    pub sectors: Vec<SectorEntry>,
}

/// GET /api/v1/sectors
pub(in crate::api) async fn list_sectors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SectorsData>> {
    let table = state.service.sectors();
    Json(ApiResponse {
        data: SectorsData {
            version: table.version(),
            sectors: table.sectors().to_vec(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
