//! Crew API endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Local;
use tower_sessions::Session;

use super::{success, ApiResponse, ApiResult};
use crate::auth::AuthSession;
use crate::models::{
    CrewCreated, CrewDetail, CrewSearchQuery, CrewSpec, CrewSummary, NearbyCrew, NearbyParams,
    Page,
};
use crate::AppState;

/// POST /api/v1/crews - Create a crew hosted by the signed-in user.
pub async fn create_crew(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<CrewSpec>, JsonRejection>,
) -> ApiResult<CrewCreated> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Json(spec) = body?;
    spec.validate()?;

    let crew_id = state.crews.create(&user_id, spec).await?;
    Ok(ApiResponse::new(CrewCreated { crew_id }).with_status(StatusCode::CREATED))
}

/// GET /api/v1/crews - Search crews by region, level and meeting date.
pub async fn list_crews(
    State(state): State<AppState>,
    query: Result<Query<CrewSearchQuery>, QueryRejection>,
) -> ApiResult<Page<CrewSummary>> {
    let Query(query) = query?;
    let (condition, page) = query.into_condition(Local::now().naive_local())?;

    success(state.crews.search(&condition, page).await?)
}

/// GET /api/v1/crews/nearby - Crews within a radius, nearest first.
pub async fn nearby_crews(
    State(state): State<AppState>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> ApiResult<Vec<NearbyCrew>> {
    let Query(params) = params?;
    let query = params.validate(state.config.max_radius_km)?;

    success(state.crews.nearby(&query).await?)
}

/// GET /api/v1/crews/{id}
pub async fn get_crew(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<CrewDetail> {
    let Path(id) = id?;
    success(state.crews.detail(&id).await?)
}

/// PUT /api/v1/crews/{id} - Host only.
pub async fn update_crew(
    State(state): State<AppState>,
    session: Session,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<CrewSpec>, JsonRejection>,
) -> ApiResult<CrewDetail> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Path(id) = id?;
    let Json(spec) = body?;
    spec.validate()?;

    state.crews.update(&id, &user_id, spec).await?;
    success(state.crews.detail(&id).await?)
}

/// DELETE /api/v1/crews/{id} - Host only.
pub async fn delete_crew(
    State(state): State<AppState>,
    session: Session,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<()> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Path(id) = id?;

    state.crews.delete(&id, &user_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/v1/crews/{id}/join
pub async fn join_crew(
    State(state): State<AppState>,
    session: Session,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<()> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Path(id) = id?;

    state.crews.join(&id, &user_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/v1/crews/{id}/leave
pub async fn leave_crew(
    State(state): State<AppState>,
    session: Session,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<()> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Path(id) = id?;

    state.crews.leave(&id, &user_id).await?;
    Ok(ApiResponse::empty())
}
