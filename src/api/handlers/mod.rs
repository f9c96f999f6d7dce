//! API request handlers.

pub mod playlists;
pub mod songs;
pub mod status;
