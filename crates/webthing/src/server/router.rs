//! HTTP Router
//!
//! Sets up the axum router for the Web Thing REST API. `GET /things/:id`
//! doubles as the WebSocket endpoint.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::http::*;
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_things))
        // Health check for monitoring/load balancers
        .route("/health", get(health_check))
        .route("/things/:id", get(get_thing))
        .route("/things/:id/properties", get(get_properties))
        .route(
            "/things/:id/properties/:name",
            get(get_property).put(put_property),
        )
        .route("/things/:id/actions", get(list_actions).post(request_action))
        .route(
            "/things/:id/actions/:name",
            get(list_named_actions).post(request_named_action),
        )
        .route(
            "/things/:id/actions/:name/:action_id",
            get(get_action).delete(delete_action),
        )
        .route("/things/:id/events", get(list_events))
        .route("/things/:id/events/:name", get(list_named_events))
        .layer(TraceLayer::new_for_http())
        // CORS for browser clients
        .layer(CorsLayer::permissive())
        .with_state(state)
}
