//! Status and health check handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::ApiState;
use crate::error::LibraryError;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Number of songs in the library.
    pub songs: usize,

    /// Number of playlists in the library.
    pub playlists: usize,
}

/// Health check endpoint.
pub async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<HealthResponse>, LibraryError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        songs: state.repo.count_songs()?,
        playlists: state.repo.count_playlists()?,
    }))
}
