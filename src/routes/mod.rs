//! API Routes
//!
//! - `/api/external/upload` - failover upload for external clients
//! - `/api/external/signature` - client-side upload signatures
//! - `/api/health` - Health check

pub mod external;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(external::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}
