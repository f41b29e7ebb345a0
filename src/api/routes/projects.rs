//! Project Routes
//!
//! - GET /map/projects - Legend metadata for every project on the map

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::projects::Project;

/// GET /map/projects
///
/// Ordered by wire id, so a viewer can index the list by the id byte of each
/// message after a lookup.
pub async fn list_projects(State(state): State<Arc<AppState>>) -> Json<Vec<Project>> {
    Json(state.projects.projects())
}
