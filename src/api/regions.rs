//! Region catalogue endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::Region;
use crate::AppState;

/// GET /api/v1/regions - List all regions.
pub async fn list_regions(State(state): State<AppState>) -> ApiResult<Vec<Region>> {
    success(state.repo.list_regions().await?)
}
