use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::app_state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub cache_bytes: usize,
    pub cache_max_bytes: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.dispatcher.cache_stats();
    debug!(?stats, "health check");

    Json(HealthResponse {
        status: "OK".to_string(),
        cache_entries: stats.entries,
        cache_capacity: stats.capacity,
        cache_bytes: stats.bytes,
        cache_max_bytes: stats.max_bytes,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
    })
}
