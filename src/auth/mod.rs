//! Session-backed authentication.
//!
//! The signed-in user's id lives in the server-side session; the client only
//! holds the session cookie.

use sqlx::SqlitePool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::errors::AppError;

const SESSION_USER_ID: &str = "auth:user_id";

/// Typed view over the authentication part of a session.
pub struct AuthSession<'a> {
    session: &'a Session,
}

impl<'a> AuthSession<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Start an authenticated session. The id is rotated to prevent fixation.
    pub async fn sign_in(&self, user_id: &str) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session
            .insert(SESSION_USER_ID, user_id.to_string())
            .await?;
        Ok(())
    }

    pub async fn user_id(&self) -> Result<Option<String>, AppError> {
        Ok(self.session.get::<String>(SESSION_USER_ID).await?)
    }

    /// The signed-in user's id, or `AUTHENTICATION_REQUIRED`.
    pub async fn require_user_id(&self) -> Result<String, AppError> {
        self.user_id()
            .await?
            .ok_or_else(AppError::authentication_required)
    }

    /// Drop all session data and delete the session record.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.session.flush().await?;
        Ok(())
    }
}

/// Session store sharing the application database. Creates its table on first use.
pub async fn session_store(pool: &SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Cookie-based session layer configured from `config`.
pub fn session_layer(store: SqliteStore, config: &Config) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(config.session_cookie.clone())
        .with_secure(config.secure_cookies)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_ttl_minutes,
        )))
}
