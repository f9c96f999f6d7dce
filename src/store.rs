//! Filesystem content store for uploaded assets.
//!
//! Holds two asset kinds: audio originals under `uploads/` and derived
//! cover images under `uploads/covers/`. Every write uses create-new
//! semantics, so a name collision surfaces as an error instead of
//! clobbering an existing asset. [`ContentStore::remove`] is the rollback
//! primitive used by the ingestion pipeline.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const AUDIO_DIR: &str = "uploads";
const COVER_DIR: &str = "uploads/covers";

/// Characters that are unsafe in filenames across platforms.
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A durably written asset, addressed by its store-relative path.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    /// Path relative to the store root, e.g. `uploads/1700000000-track.mp3`.
    pub rel_path: String,

    /// Bare filename within its asset directory.
    pub file_name: String,
}

/// Content-addressed-by-path storage for audio and cover assets.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a store rooted at the given directory, creating the asset
    /// directories if needed.
    pub fn open(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root.join(COVER_DIR))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Persist uploaded audio bytes under a fresh collision-resistant name
    /// derived from a nanosecond clock plus the original filename.
    pub fn store_audio(&self, original_name: &str, bytes: &[u8]) -> io::Result<StoredAsset> {
        let file_name = format!("{}-{}", clock_nanos(), sanitize_filename(original_name));
        self.write_new(AUDIO_DIR, &file_name, bytes)
    }

    /// Persist cover art extracted from an audio asset. The name is derived
    /// deterministically from the audio filename so the pair is discoverable
    /// by convention.
    pub fn store_cover_for(
        &self,
        audio_file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> io::Result<StoredAsset> {
        let stem = audio_file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(audio_file_name);
        let file_name = format!("{}.cover.{}", stem, extension_from_mime(mime_type));
        self.write_new(COVER_DIR, &file_name, bytes)
    }

    /// Persist a playlist cover image uploaded by its owner.
    pub fn store_playlist_cover(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> io::Result<StoredAsset> {
        let file_name = format!(
            "playlist-{}-{}",
            clock_nanos(),
            sanitize_filename(original_name)
        );
        self.write_new(COVER_DIR, &file_name, bytes)
    }

    /// Delete an asset by its store-relative path.
    pub fn remove(&self, rel_path: &str) -> io::Result<()> {
        fs::remove_file(self.root.join(rel_path))
    }

    /// Absolute filesystem path of a stored asset.
    pub fn absolute(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path)
    }

    fn write_new(&self, dir: &str, file_name: &str, bytes: &[u8]) -> io::Result<StoredAsset> {
        let rel_path = format!("{}/{}", dir, file_name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.root.join(&rel_path))?;
        file.write_all(bytes)?;

        Ok(StoredAsset {
            rel_path,
            file_name: file_name.to_string(),
        })
    }
}

/// Sanitize a string for use in filenames.
///
/// Replaces unsafe filesystem characters with underscores. Preserves
/// Unicode characters.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn extension_from_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        // ID3 cover art is overwhelmingly JPEG.
        _ => "jpg",
    }
}

fn clock_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
