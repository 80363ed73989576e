//! Sign-up, login and logout endpoints.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tower_sessions::Session;

use super::{success, ApiResponse, ApiResult};
use crate::auth::AuthSession;
use crate::models::{LoginRequest, LoginResponse, SignUpRequest, SignUpResponse};
use crate::AppState;

/// POST /api/v1/auth/signup - Register a new account.
pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<SignUpResponse> {
    let Json(request) = body?;
    request.validate()?;

    let user_id = state.users.sign_up(request).await?;
    Ok(ApiResponse::new(SignUpResponse { user_id }).with_status(StatusCode::CREATED))
}

/// POST /api/v1/auth/login - Check credentials and start a session.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = body?;
    request.validate()?;

    let user = state.users.authenticate(&request).await?;
    AuthSession::new(&session).sign_in(&user.user_id).await?;

    tracing::info!(user_id = %user.user_id, "User logged in");
    success(user)
}

/// POST /api/v1/auth/logout - End the current session.
pub async fn logout(session: Session) -> ApiResult<()> {
    let auth = AuthSession::new(&session);
    if let Some(user_id) = auth.user_id().await? {
        tracing::info!(user_id = %user_id, "User logged out");
    }
    auth.sign_out().await?;
    Ok(ApiResponse::empty())
}
