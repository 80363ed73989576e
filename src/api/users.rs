//! Endpoints for the signed-in user's own account.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tower_sessions::Session;

use super::{success, ApiResponse, ApiResult};
use crate::auth::AuthSession;
use crate::models::{ChangePasswordRequest, UpdateProfileRequest, UserProfile};
use crate::AppState;

/// GET /api/v1/users/me
pub async fn get_me(State(state): State<AppState>, session: Session) -> ApiResult<UserProfile> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    success(state.users.profile(&user_id).await?)
}

/// PUT /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Json(request) = body?;
    request.validate()?;

    success(state.users.update_profile(&user_id, request).await?)
}

/// PUT /api/v1/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<()> {
    let user_id = AuthSession::new(&session).require_user_id().await?;
    let Json(request) = body?;
    request.validate()?;

    state.users.change_password(&user_id, request).await?;
    Ok(ApiResponse::empty())
}
