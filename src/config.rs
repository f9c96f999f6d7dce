//! Server configuration.

use std::path::{Path, PathBuf};

/// Default cap on an uploaded request body (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for a Melodeon server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the metadata database and the content store.
    pub data_dir: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Create a config rooted at the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set the upload size cap.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("library.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

/// Platform data directory, with a local fallback.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "melodeon", "melodeon")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./melodeon-data"))
}

/// Resolve an optional CLI override against the default data dir.
pub fn resolve_data_dir(override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_data_dir)
}
