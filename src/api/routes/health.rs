//! Health Routes
//!
//! - GET /health/live - Liveness check (process is alive)
//! - GET /health - Hub and project table status

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::state::AppState;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Connected viewers, `None` if the hub has stopped
    pub consumers: Option<usize>,
    pub projects: usize,
    pub project_version: u64,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let consumers = state.hub.count().await.ok();

    let (status_code, status) = match consumers {
        Some(_) => (StatusCode::OK, "healthy"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "hub stopped"),
    };

    let body = HealthResponse {
        status: status.to_string(),
        consumers,
        projects: state.projects.len(),
        project_version: state.projects.version(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
