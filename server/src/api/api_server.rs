//! HTTP server implementation for the key-value API

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use docstore_kv_core::KeyValueService;

use super::api_handlers;

/// State shared by every handler
#[derive(Clone)]
pub struct ApiState {
    /// Key-value service
    pub service: KeyValueService,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
}

impl ApiState {
    /// Create handler state
    pub fn new(service: KeyValueService, metrics_enabled: bool) -> Self {
        Self {
            service,
            metrics_enabled,
        }
    }
}

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        // Key routes; keys may contain slashes
        .route(
            "/v1/kv/{store}/{*key}",
            get(api_handlers::get_value)
                .put(api_handlers::set_value)
                .delete(api_handlers::delete_value),
        )
        // Prefix scan
        .route("/v1/kv/{store}", get(api_handlers::scan_keys))
        // System routes
        .route("/health", get(api_handlers::health_check))
        .route("/metrics", get(api_handlers::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Bind `addr` and serve the API until the server fails
pub async fn start_api_server(addr: SocketAddr, state: ApiState) -> anyhow::Result<()> {
    let backend = state.service.backend_name();
    let app = create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{} ({} backend)", addr, backend);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
