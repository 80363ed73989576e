//! Runcrew Backend
//!
//! REST backend for organising local group runs, with SQLite persistence,
//! cookie sessions and radius-based crew search.

mod api;
mod auth;
mod config;
mod crew;
mod db;
mod errors;
mod geo;
mod models;
mod users;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use crew::CrewService;
use db::Repository;
use users::UserService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub crews: Arc<CrewService<Repository>>,
    pub users: Arc<UserService<Repository>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let repo = Arc::new(Repository::new(pool));
        Self {
            crews: Arc::new(CrewService::new(repo.clone())),
            users: Arc::new(UserService::new(repo.clone(), config.bcrypt_cost)),
            repo,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Runcrew Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.secure_cookies {
        tracing::warn!("Session cookies are not marked Secure (RUNCREW_SECURE_COOKIES=false)");
    }

    // Initialize database and session storage
    let pool = db::init_database(&config.db_path).await?;
    let sessions = auth::session_layer(auth::session_store(&pool).await?, &config);

    let bind_addr = config.bind_addr;
    let state = AppState::new(pool, config);
    let app = create_router(state, sessions);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState, sessions: SessionManagerLayer<SqliteStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/signup", post(api::sign_up))
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        // Users
        .route("/users/me", get(api::get_me).put(api::update_me))
        .route("/users/me/password", put(api::change_password))
        // Regions
        .route("/regions", get(api::list_regions))
        // Crews
        .route("/crews", post(api::create_crew).get(api::list_crews))
        .route("/crews/nearby", get(api::nearby_crews))
        .route(
            "/crews/{id}",
            get(api::get_crew)
                .put(api::update_crew)
                .delete(api::delete_crew),
        )
        .route("/crews/{id}/join", post(api::join_crew))
        .route("/crews/{id}/leave", post(api::leave_crew))
        .layer(sessions);

    // Health check (no session required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
