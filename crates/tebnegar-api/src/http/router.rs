//! Axum router configuration with middleware.
//!
//! All routes except `/health` are under `/api/v1/`.
//! Middleware: CORS (origins from `[server].cors_origins`), request tracing.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let api_routes = Router::new()
        // Sessions
        .route("/sessions", post(handlers::session::create_session))
        .route("/sessions/{id}/end", post(handlers::session::end_session))
        // Conversations
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::create_conversation),
        )
        .route(
            "/conversations/{id}",
            axum::routing::patch(handlers::conversation::rename_conversation)
                .delete(handlers::conversation::delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversation::get_conversation_messages),
        )
        .route(
            "/conversations/{id}/generate-title",
            post(handlers::conversation::generate_title),
        )
        // Chat exchange
        .route(
            "/messages/{conversation_id}",
            post(handlers::message::post_message),
        )
        // Feedback
        .route(
            "/response-feedback/{message_id}",
            post(handlers::feedback::submit_response_feedback),
        )
        .route("/survey", post(handlers::feedback::submit_survey))
        // Admin
        .route("/admin/stats", get(handlers::admin::get_stats))
        .route(
            "/admin/response-feedback",
            get(handlers::admin::list_response_feedback),
        )
        .route(
            "/admin/conversations",
            get(handlers::admin::search_conversations),
        )
        .route("/admin/download-db", get(handlers::admin::download_db));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}
