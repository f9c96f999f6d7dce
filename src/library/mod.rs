//! Library records and their authoritative store.

pub mod model;
pub mod repo;

pub use model::{Membership, Playlist, Song};
pub use repo::LibraryRepository;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current instant as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
