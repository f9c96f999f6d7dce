//! Song upload and listing handlers.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::ApiState;
use crate::auth::Principal;
use crate::error::LibraryError;
use crate::ingest::{SongDetails, Upload};
use crate::library::Song;

/// Upload a new song.
///
/// `POST /songs` — multipart with a `song` file part plus `title`, `artist`
/// and optional `album` text parts.
pub async fn upload(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Song>), LibraryError> {
    let mut file: Option<Upload> = None;
    let mut title = String::new();
    let mut artist = String::new();
    let mut album: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LibraryError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "song" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    LibraryError::Validation(format!("failed to read file part: {}", e))
                })?;
                file = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => title = read_text(field).await?,
            "artist" => artist = read_text(field).await?,
            "album" => album = Some(read_text(field).await?),
            _ => {}
        }
    }

    let upload = file.ok_or_else(|| LibraryError::Validation("an audio file is required".into()))?;

    let song = state.ingestor.ingest(
        principal.id(),
        upload,
        SongDetails {
            title,
            artist,
            album,
        },
    )?;

    Ok((StatusCode::CREATED, Json(song)))
}

/// List all songs in the library.
///
/// `GET /songs` — public, no principal required.
pub async fn list(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Song>>, LibraryError> {
    let songs = state.repo.list_songs()?;
    Ok(Json(songs))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, LibraryError> {
    field
        .text()
        .await
        .map_err(|e| LibraryError::Validation(format!("failed to read text part: {}", e)))
}
