//! The ingestion pipeline: turns an uploaded audio file into a durable,
//! queryable [`Song`] record.
//!
//! A single attempt walks `Received -> AssetPersisted -> MetadataExtracted
//! -> RecordCreated`. Any failure after the audio asset is written rolls
//! back every asset from the attempt before surfacing the error, so the
//! content store never accumulates orphans. Metadata extraction failure is
//! never fatal; it degrades to zero duration and no art.

pub mod metadata;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::LibraryError;
use crate::library::{now_millis, LibraryRepository, Song};
use crate::store::{ContentStore, StoredAsset};

/// Album recorded when neither the uploader nor the file's tags name one.
const DEFAULT_ALBUM: &str = "Single";

/// The raw file received at the boundary.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// User-supplied song fields, validated and coerced at the boundary.
#[derive(Debug)]
pub struct SongDetails {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
}

/// Orchestrates the content store, metadata extractor and repository.
#[derive(Clone)]
pub struct Ingestor {
    store: ContentStore,
    repo: LibraryRepository,
}

impl Ingestor {
    pub fn new(store: ContentStore, repo: LibraryRepository) -> Self {
        Self { store, repo }
    }

    /// Add an uploaded audio file to the library.
    ///
    /// Validation failures perform no side effects. After the audio asset
    /// is persisted, any further failure deletes the assets written by this
    /// attempt and surfaces [`LibraryError::Ingestion`].
    pub fn ingest(
        &self,
        principal: &str,
        upload: Upload,
        details: SongDetails,
    ) -> Result<Song, LibraryError> {
        let title = details.title.trim().to_string();
        let artist = details.artist.trim().to_string();

        if title.is_empty() {
            return Err(LibraryError::Validation("title is required".into()));
        }
        if artist.is_empty() {
            return Err(LibraryError::Validation("artist is required".into()));
        }
        if upload.bytes.is_empty() {
            return Err(LibraryError::Validation("an audio file is required".into()));
        }

        let audio = self
            .store
            .store_audio(&upload.file_name, &upload.bytes)
            .map_err(|e| LibraryError::Ingestion(format!("failed to store audio: {}", e)))?;

        let tags = metadata::extract(&upload.bytes, &upload.file_name);

        let cover = match &tags.cover {
            Some(art) => {
                match self
                    .store
                    .store_cover_for(&audio.file_name, &art.mime_type, &art.data)
                {
                    Ok(asset) => Some(asset),
                    Err(e) => {
                        self.rollback(&audio, None);
                        return Err(LibraryError::Ingestion(format!(
                            "failed to store cover art: {}",
                            e
                        )));
                    }
                }
            }
            None => None,
        };

        let album = details
            .album
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .or(tags.album)
            .unwrap_or_else(|| DEFAULT_ALBUM.to_string());

        let song = Song {
            id: Uuid::new_v4().to_string(),
            title,
            artist,
            album,
            duration: tags.duration_secs,
            file_path: audio.rel_path.clone(),
            cover_art_path: cover.as_ref().map(|c| c.rel_path.clone()),
            uploaded_by: principal.to_string(),
            created_at: now_millis(),
        };

        if let Err(e) = self.repo.create_song(&song) {
            self.rollback(&audio, cover.as_ref());
            return Err(LibraryError::Ingestion(format!(
                "failed to create song record: {}",
                e
            )));
        }

        info!(
            song_id = %song.id,
            title = %song.title,
            duration = song.duration,
            file = %song.file_path,
            "Ingested song"
        );

        Ok(song)
    }

    /// Delete the assets written by a failed attempt. Best effort: a
    /// failing delete is logged, not surfaced over the original error.
    fn rollback(&self, audio: &StoredAsset, cover: Option<&StoredAsset>) {
        if let Err(e) = self.store.remove(&audio.rel_path) {
            warn!(path = %audio.rel_path, error = %e, "Failed to roll back audio asset");
        }
        if let Some(cover) = cover {
            if let Err(e) = self.store.remove(&cover.rel_path) {
                warn!(path = %cover.rel_path, error = %e, "Failed to roll back cover asset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn pipeline(temp: &TempDir) -> (Ingestor, LibraryRepository, ContentStore) {
        let store = ContentStore::open(temp.path()).unwrap();
        let repo = LibraryRepository::open_in_memory().unwrap();
        (Ingestor::new(store.clone(), repo.clone()), repo, store)
    }

    fn details(title: &str, artist: &str, album: Option<&str>) -> SongDetails {
        SongDetails {
            title: title.into(),
            artist: artist.into(),
            album: album.map(String::from),
        }
    }

    fn wav_upload() -> Upload {
        Upload {
            file_name: "tone.wav".into(),
            bytes: metadata::tests::one_second_wav(),
        }
    }

    fn count_files(dir: &Path) -> usize {
        let mut count = 0;
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                count += count_files(&entry.path());
            } else {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_ingest_creates_asset_and_record() {
        let temp = TempDir::new().unwrap();
        let (ingestor, repo, store) = pipeline(&temp);

        let song = ingestor
            .ingest("u1", wav_upload(), details("Tone", "Sine", None))
            .unwrap();

        assert_eq!(song.duration, 1);
        assert_eq!(song.uploaded_by, "u1");
        assert!(store.absolute(&song.file_path).exists());

        let stored = repo.get_song(&song.id).unwrap().unwrap();
        assert_eq!(stored.file_path, song.file_path);
        assert_eq!(count_files(temp.path()), 1);
    }

    #[test]
    fn test_album_defaults_to_single() {
        let temp = TempDir::new().unwrap();
        let (ingestor, _, _) = pipeline(&temp);

        let song = ingestor
            .ingest("u1", wav_upload(), details("Tone", "Sine", None))
            .unwrap();
        assert_eq!(song.album, "Single");
    }

    #[test]
    fn test_explicit_album_wins() {
        let temp = TempDir::new().unwrap();
        let (ingestor, _, _) = pipeline(&temp);

        let song = ingestor
            .ingest("u1", wav_upload(), details("Tone", "Sine", Some("Waves")))
            .unwrap();
        assert_eq!(song.album, "Waves");
    }

    #[test]
    fn test_blank_album_falls_through_to_default() {
        let temp = TempDir::new().unwrap();
        let (ingestor, _, _) = pipeline(&temp);

        let song = ingestor
            .ingest("u1", wav_upload(), details("Tone", "Sine", Some("   ")))
            .unwrap();
        assert_eq!(song.album, "Single");
    }

    #[test]
    fn test_unparseable_audio_still_ingests() {
        let temp = TempDir::new().unwrap();
        let (ingestor, _, _) = pipeline(&temp);

        let upload = Upload {
            file_name: "mystery.mp3".into(),
            bytes: b"not really audio".to_vec(),
        };
        let song = ingestor
            .ingest("u1", upload, details("Mystery", "Unknown", None))
            .unwrap();

        assert_eq!(song.duration, 0);
        assert!(song.cover_art_path.is_none());
    }

    #[test]
    fn test_validation_failure_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let (ingestor, repo, _) = pipeline(&temp);

        let result = ingestor.ingest("u1", wav_upload(), details("  ", "Sine", None));
        assert!(matches!(result, Err(LibraryError::Validation(_))));

        let empty = Upload {
            file_name: "x.mp3".into(),
            bytes: Vec::new(),
        };
        let result = ingestor.ingest("u1", empty, details("Tone", "Sine", None));
        assert!(matches!(result, Err(LibraryError::Validation(_))));

        assert_eq!(count_files(temp.path()), 0);
        assert_eq!(repo.count_songs().unwrap(), 0);
    }

    #[test]
    fn test_record_failure_rolls_back_assets() {
        let temp = TempDir::new().unwrap();
        let (ingestor, repo, _) = pipeline(&temp);
        repo.break_songs_table();

        let result = ingestor.ingest("u1", wav_upload(), details("Tone", "Sine", None));
        assert!(matches!(result, Err(LibraryError::Ingestion(_))));

        // No orphaned assets survive the failed attempt.
        assert_eq!(count_files(temp.path()), 0);
    }
}
