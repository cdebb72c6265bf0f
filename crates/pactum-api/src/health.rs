use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use pactum_platform::HealthResponse;

use crate::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.store.ping().await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    let cache = match state.cache.ping().await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    let healthy = database == "up" && cache == "up";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            database: database.to_string(),
            cache: cache.to_string(),
        }),
    )
}
