//! HTTP/JSON boundary.
//!
//! Thin request handlers over the ingestion pipeline and the playlist
//! service; those two are the only components that mutate the repository.

pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::LibraryError;
use crate::ingest::Ingestor;
use crate::library::LibraryRepository;
use crate::playlists::PlaylistService;
use crate::store::ContentStore;

/// Shared state for API handlers.
pub struct ApiState {
    pub repo: LibraryRepository,
    pub store: ContentStore,
    pub ingestor: Ingestor,
    pub playlists: PlaylistService,
    pub config: ServerConfig,
}

impl ApiState {
    /// Open the database and content store and wire up the services.
    pub fn new(config: ServerConfig) -> Result<Self, LibraryError> {
        std::fs::create_dir_all(&config.data_dir)?;

        let repo = LibraryRepository::open(&config.database_path())?;
        let store = ContentStore::open(&config.data_dir)?;
        let ingestor = Ingestor::new(store.clone(), repo.clone());
        let playlists = PlaylistService::new(repo.clone());

        Ok(Self {
            repo,
            store,
            ingestor,
            playlists,
            config,
        })
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload = state.config.max_upload_bytes;

    Router::new()
        // Status/health
        .route("/status", get(handlers::status::health))
        // Songs
        .route(
            "/songs",
            get(handlers::songs::list).post(handlers::songs::upload),
        )
        // Playlists
        .route("/playlists", post(handlers::playlists::create))
        // Note: /mine must come before /:id so "mine" is not matched as an ID.
        .route("/playlists/mine", get(handlers::playlists::list_mine))
        .route(
            "/playlists/:id",
            get(handlers::playlists::detail)
                .put(handlers::playlists::edit)
                .delete(handlers::playlists::delete),
        )
        .route("/playlists/:id/add", put(handlers::playlists::add_song))
        .route(
            "/playlists/:id/remove",
            put(handlers::playlists::remove_song),
        )
        // Middleware
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        if !status.is_success() {
                            tracing::warn!(
                                status = %status,
                                latency_ms = latency.as_millis(),
                                "request failed"
                            );
                        }
                    },
                ),
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Melodeon API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
