//! HTTP server for the delivery board API.
//!
//! This module provides the axum-based server: shared state, router
//! construction with CORS and request tracing, and startup/shutdown.

pub mod handlers;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::admin::AdminDirectory;
use crate::config::Config;
use crate::db::Database;

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reference to the task database.
    db: Database,
    /// TTL-cached admin allow-list.
    admins: Arc<AdminDirectory>,
}

impl AppState {
    /// Create new server state.
    pub fn new(db: Database, admins: Arc<AdminDirectory>) -> Self {
        Self { db, admins }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get the admin directory.
    pub fn admins(&self) -> &AdminDirectory {
        &self.admins
    }
}

/// Build the CORS layer from the configured origin allow-list.
///
/// Credentials stay enabled, so origins are listed explicitly; an origin
/// that fails to parse is skipped with a warning rather than aborting
/// startup.
fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the router with all routes.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/persons", get(handlers::persons))
        .route("/api/data", get(handlers::data))
        // PUT takes an integer task key, DELETE takes a delivery code; the
        // two share one path pattern and parse the segment themselves.
        .route(
            "/api/data/{id}",
            put(handlers::update_task).delete(handlers::delete_delivery),
        )
        .route("/api/per-key-per-day", get(handlers::per_key_per_day))
        .route("/api/per-person-per-day", get(handlers::per_person_per_day))
        .route("/api/post", post(handlers::post_task))
        .route(
            "/api/delivery_counts/{del_code}",
            put(handlers::update_delivery_counts),
        )
        .route(
            "/api/admin/tasks/{key}/deadline",
            put(handlers::set_deadline),
        )
        .route(
            "/api/admin/tasks/{key}/reassign",
            put(handlers::reassign_task),
        )
        .layer(build_cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &Config, db: Database) -> anyhow::Result<()> {
    let admins = Arc::new(AdminDirectory::new(
        db.clone(),
        &config.admin.emails,
        Duration::from_secs(config.admin.cache_ttl_secs),
    ));
    info!("Admin allow-list seeded with {} entries", admins.len());

    let state = AppState::new(db, admins);
    let app = build_router(state, &config.cors.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
