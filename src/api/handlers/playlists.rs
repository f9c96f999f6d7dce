//! Playlist and membership handlers.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::auth::Principal;
use crate::error::LibraryError;
use crate::library::Playlist;
use crate::playlists::{PlaylistDetail, PlaylistEdit};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRef {
    pub song_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EditPlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct Confirmation {
    pub message: String,
}

/// Create a new playlist.
///
/// `POST /playlists` — JSON `{name, description?}`.
pub async fn create(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Json(request): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<Playlist>), LibraryError> {
    let name = request
        .name
        .ok_or_else(|| LibraryError::Validation("playlist name is required".into()))?;

    let playlist = state
        .playlists
        .create(principal.id(), &name, request.description.as_deref())?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

/// List the caller's playlists.
///
/// `GET /playlists/mine`
pub async fn list_mine(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<Playlist>>, LibraryError> {
    let playlists = state.playlists.list_mine(principal.id())?;
    Ok(Json(playlists))
}

/// Get a playlist with its member songs resolved.
///
/// `GET /playlists/:id`
pub async fn detail(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<PlaylistDetail>, LibraryError> {
    let detail = state.playlists.detail(principal.id(), &id)?;
    Ok(Json(detail))
}

/// Edit a playlist's attributes.
///
/// `PUT /playlists/:id` — either JSON `{name?, description?}` or a
/// multipart form that may additionally carry a `coverImage` file part.
pub async fn edit(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Playlist>, LibraryError> {
    let edit = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| LibraryError::Validation(format!("malformed multipart body: {}", e)))?;
        parse_multipart_edit(&state, multipart).await?
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), state.config.max_upload_bytes)
            .await
            .map_err(|e| LibraryError::Validation(format!("failed to read body: {}", e)))?;
        let body: EditPlaylistRequest = if bytes.is_empty() {
            EditPlaylistRequest::default()
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| LibraryError::Validation(format!("malformed JSON body: {}", e)))?
        };
        PlaylistEdit {
            name: body.name,
            description: body.description,
            cover_art_path: None,
        }
    };

    // A cover written for a rejected edit must not linger in the store.
    let stored_cover = edit.cover_art_path.clone();
    match state.playlists.edit(principal.id(), &id, edit) {
        Ok(playlist) => Ok(Json(playlist)),
        Err(e) => {
            if let Some(path) = stored_cover {
                if let Err(remove_err) = state.store.remove(&path) {
                    tracing::warn!(
                        path = %path,
                        error = %remove_err,
                        "Failed to roll back cover asset"
                    );
                }
            }
            Err(e)
        }
    }
}

/// Add a song to a playlist.
///
/// `PUT /playlists/:id/add` — JSON `{songId}`.
pub async fn add_song(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<SongRef>,
) -> Result<Json<Playlist>, LibraryError> {
    let playlist = state.playlists.add_song(principal.id(), &id, &body.song_id)?;
    Ok(Json(playlist))
}

/// Remove a song from a playlist.
///
/// `PUT /playlists/:id/remove` — JSON `{songId}`.
pub async fn remove_song(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<SongRef>,
) -> Result<Json<Playlist>, LibraryError> {
    let playlist = state
        .playlists
        .remove_song(principal.id(), &id, &body.song_id)?;
    Ok(Json(playlist))
}

/// Delete a playlist and all its membership entries.
///
/// `DELETE /playlists/:id`
pub async fn delete(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Confirmation>, LibraryError> {
    state.playlists.delete(principal.id(), &id)?;
    Ok(Json(Confirmation {
        message: "playlist deleted".into(),
    }))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn parse_multipart_edit(
    state: &ApiState,
    mut multipart: Multipart,
) -> Result<PlaylistEdit, LibraryError> {
    let mut edit = PlaylistEdit::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LibraryError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => edit.name = Some(read_text(field).await?),
            "description" => edit.description = Some(read_text(field).await?),
            "coverImage" => {
                let file_name = field.file_name().unwrap_or("cover").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    LibraryError::Validation(format!("failed to read file part: {}", e))
                })?;
                let asset = state.store.store_playlist_cover(&file_name, &bytes)?;
                edit.cover_art_path = Some(asset.rel_path);
            }
            _ => {}
        }
    }

    Ok(edit)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, LibraryError> {
    field
        .text()
        .await
        .map_err(|e| LibraryError::Validation(format!("failed to read text part: {}", e)))
}
