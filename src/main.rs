//! Brigades Backend
//!
//! REST backend for field survey brigades: member profiles, one brigade per
//! survey cluster, and the invitations linking members to brigades.

mod api;
mod auth;
mod clusters;
mod config;
mod db;
mod errors;
mod models;
mod services;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AuthKeys;
use clusters::{ClusterDirectory, HttpClusterDirectory};
use config::{Config, LogFormat};
use db::Repository;
use services::{AssignmentCoordinator, BrigadeRegistry, MemberRegistry};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub members: MemberRegistry,
    pub brigades: BrigadeRegistry,
    pub assignments: AssignmentCoordinator,
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, clusters: Arc<dyn ClusterDirectory>, config: Config) -> Self {
        Self {
            members: MemberRegistry::new(repo.clone()),
            brigades: BrigadeRegistry::new(repo.clone(), clusters),
            assignments: AssignmentCoordinator::new(repo.clone()),
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
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Brigades Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Clusters service: {}", config.clusters_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.auth_enabled() {
        tracing::warn!(
            "No API keys configured (BRIGADES_API_PSK, BRIGADES_ADMIN_PSK). Authentication is disabled!"
        );
    } else if config.admin_psk.is_none() {
        tracing::warn!("No admin key configured (BRIGADES_ADMIN_PSK). Admin operations are open to API key holders");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let clusters = Arc::new(HttpClusterDirectory::new(
        config.clusters_url.clone(),
        config.clusters_timeout,
    )?);

    let state = AppState::new(repo.clone(), clusters, config.clone());
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let keys = AuthKeys::from_config(&state.config);

    // API routes
    let api_routes = Router::new()
        // Members
        .route("/members", get(api::list_members).post(api::create_member))
        .route("/members/available", get(api::list_available_members))
        .route("/members/user/{user_id}", get(api::get_member_by_user))
        .route("/members/locality/{locality}", get(api::list_members_by_locality))
        .route("/members/role/{role}", get(api::list_members_by_role))
        .route(
            "/members/{id}",
            get(api::get_member)
                .put(api::update_member)
                .delete(api::delete_member),
        )
        .route("/members/{id}/details", get(api::get_member_details))
        .route("/members/{id}/availability", put(api::set_member_availability))
        .route("/members/{id}/verificar-titulos", put(api::verify_member_credentials))
        // Brigades
        .route("/brigades", get(api::list_brigades).post(api::create_brigade))
        .route("/brigades/cluster/{cluster_id}", get(api::get_brigade_by_cluster))
        .route("/brigades/status/{status}", get(api::list_brigades_by_status))
        .route(
            "/brigades/{id}",
            get(api::get_brigade)
                .put(api::update_brigade)
                .delete(api::delete_brigade),
        )
        .route("/brigades/{id}/estado", put(api::change_brigade_status))
        .route("/brigades/{id}/brigadistas", get(api::get_brigade_with_members))
        // Assignments
        .route("/assignments/invitar", post(api::invite_member))
        .route("/assignments/brigade/{id}", get(api::list_brigade_assignments))
        .route("/assignments/member/{id}", get(api::list_member_assignments))
        .route(
            "/assignments/member/{id}/pendientes",
            get(api::list_pending_invitations),
        )
        .route("/assignments/{id}/responder", put(api::respond_invitation))
        .route("/assignments/{id}/fechas", put(api::update_work_dates))
        .route("/assignments/{id}/{member_id}", delete(api::unassign_member))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(keys.clone(), req, next)
        }));

    // Self-service registration and health check (no auth required)
    let public_routes = Router::new()
        .route("/api/members/register", post(api::register_member))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Service status and storage connectivity.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "service": "brigades-service",
                "timestamp": timestamp,
                "storage": "connected",
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "DEGRADED",
                    "service": "brigades-service",
                    "timestamp": timestamp,
                    "storage": "unavailable",
                })),
            )
        }
    }
}
