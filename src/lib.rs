//! Melodeon - a personal music library server.
//!
//! Users upload audio files over HTTP; the server extracts playable
//! metadata, stores the assets durably, and lets each user organize songs
//! into playlists they own.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP/JSON API (axum)                   │
//! │  POST /songs   GET /songs   /playlists CRUD + membership    │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//! ┌───────────────┴───────────┐   ┌─────────────┴───────────────┐
//! │    INGESTION PIPELINE     │   │     PLAYLIST SERVICE        │
//! │  validate → persist asset │   │  ownership-checked edits of │
//! │  → extract tags → record  │   │  the ordered song sequence  │
//! │  (rollback on failure)    │   │  (no duplicates, atomic)    │
//! └──────┬──────────┬─────────┘   └─────────────┬───────────────┘
//!        │          │                           │
//! ┌──────┴─────┐ ┌──┴──────────────────────────┴───────────────┐
//! │ CONTENT    │ │          LIBRARY REPOSITORY (SQLite)         │
//! │ STORE (fs) │ │   songs + playlists, membership as JSON col  │
//! └────────────┘ └──────────────────────────────────────────────┘
//! ```
//!
//! Authentication is external: a trusted proxy forwards the principal id
//! in a header, and the [`auth::Principal`] extractor lifts it into the
//! handlers. Only the ingestion pipeline and the playlist service mutate
//! the repository.

/// HTTP boundary.
pub mod api;

/// Authenticated principal extraction.
pub mod auth;

/// Server configuration.
pub mod config;

/// Error taxonomy.
pub mod error;

/// Ingestion pipeline and metadata extraction.
pub mod ingest;

/// Library records and their store.
pub mod library;

/// Playlist membership engine.
pub mod playlists;

/// Filesystem content store.
pub mod store;
