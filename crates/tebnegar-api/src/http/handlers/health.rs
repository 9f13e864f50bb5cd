//! GET /health - liveness plus a database ping (no auth required).

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match sqlx::query("SELECT 1")
        .execute(&state.db_pool.reader)
        .await
    {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check database ping failed");
            "unavailable"
        }
    };

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "ai_provider": state.registry.provider_name(),
        "active_ai_sessions": state.registry.len(),
    }))
}
