//! SQLite-backed library repository.
//!
//! The authoritative record store for [`Song`] and [`Playlist`] entities.
//! Playlist membership lives in a JSON column on the playlist row, so a
//! playlist mutation is a single-row read-check-write inside one
//! transaction. All access goes through a shared connection mutex, which
//! together with [`LibraryRepository::update_playlist`] serializes
//! concurrent edits of the same playlist.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::LibraryError;
use crate::library::{now_millis, Membership, Playlist, Song};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS songs (
    id             TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    artist         TEXT NOT NULL,
    album          TEXT NOT NULL,
    duration       INTEGER NOT NULL,
    file_path      TEXT NOT NULL,
    cover_art_path TEXT,
    uploaded_by    TEXT NOT NULL,
    created_at     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS playlists (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    cover_art_path  TEXT,
    owner           TEXT NOT NULL,
    songs           TEXT NOT NULL DEFAULT '[]',
    last_touched_at INTEGER NOT NULL,
    created_at      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner);
";

/// The authoritative store for library records.
#[derive(Clone)]
pub struct LibraryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LibraryRepository {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        let songs: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        let playlists: i64 = conn.query_row("SELECT COUNT(*) FROM playlists", [], |r| r.get(0))?;
        tracing::info!(songs, playlists, "Opened library database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // === Songs ===

    pub fn create_song(&self, song: &Song) -> Result<(), LibraryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO songs (id, title, artist, album, duration, file_path,
                                cover_art_path, uploaded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                song.id,
                song.title,
                song.artist,
                song.album,
                song.duration as i64,
                song.file_path,
                song.cover_art_path,
                song.uploaded_by,
                song.created_at as i64,
            ],
        )?;
        Ok(())
    }

    pub fn list_songs(&self) -> Result<Vec<Song>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, artist, album, duration, file_path,
                    cover_art_path, uploaded_by, created_at
             FROM songs ORDER BY created_at, rowid",
        )?;
        let songs = stmt
            .query_map([], row_to_song)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(songs)
    }

    pub fn get_song(&self, id: &str) -> Result<Option<Song>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let song = conn
            .query_row(
                "SELECT id, title, artist, album, duration, file_path,
                        cover_art_path, uploaded_by, created_at
                 FROM songs WHERE id = ?1",
                params![id],
                row_to_song,
            )
            .optional()?;
        Ok(song)
    }

    pub fn count_songs(&self) -> Result<usize, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    // === Playlists ===

    pub fn create_playlist(&self, playlist: &Playlist) -> Result<(), LibraryError> {
        let songs_json = serde_json::to_string(&playlist.songs)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO playlists (id, name, description, cover_art_path, owner,
                                    songs, last_touched_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                playlist.id,
                playlist.name,
                playlist.description,
                playlist.cover_art_path,
                playlist.owner,
                songs_json,
                playlist.last_touched_at as i64,
                playlist.created_at as i64,
            ],
        )?;
        Ok(())
    }

    pub fn list_playlists_by_owner(&self, owner: &str) -> Result<Vec<Playlist>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, cover_art_path, owner,
                    songs, last_touched_at, created_at
             FROM playlists WHERE owner = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![owner], row_to_playlist_parts)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(parts_to_playlist).collect()
    }

    pub fn get_playlist(&self, id: &str) -> Result<Option<Playlist>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        load_playlist(&conn, id)
    }

    /// Apply a mutation to a playlist under a transaction.
    ///
    /// This is the sole mutation path for playlist fields and membership.
    /// The mutator performs ownership and duplicate checks and returns a
    /// typed error to reject; on any error the stored row is left completely
    /// unchanged. The no-duplicate-membership invariant is re-verified after
    /// the mutator runs, and `last_touched_at` is bumped on commit.
    pub fn update_playlist<F>(&self, id: &str, mutate: F) -> Result<Playlist, LibraryError>
    where
        F: FnOnce(&mut Playlist) -> Result<(), LibraryError>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut playlist = load_playlist(&tx, id)?.ok_or(LibraryError::NotFound("playlist"))?;

        mutate(&mut playlist)?;

        let mut seen = HashSet::new();
        for membership in &playlist.songs {
            if !seen.insert(membership.song_id.as_str()) {
                return Err(LibraryError::DuplicateMember);
            }
        }

        playlist.last_touched_at = now_millis();

        let songs_json = serde_json::to_string(&playlist.songs)?;
        tx.execute(
            "UPDATE playlists
             SET name = ?1, description = ?2, cover_art_path = ?3,
                 songs = ?4, last_touched_at = ?5
             WHERE id = ?6",
            params![
                playlist.name,
                playlist.description,
                playlist.cover_art_path,
                songs_json,
                playlist.last_touched_at as i64,
                playlist.id,
            ],
        )?;
        tx.commit()?;

        Ok(playlist)
    }

    /// Remove a playlist and all its membership entries in one commit.
    /// Returns whether a row was deleted. Member songs are untouched.
    pub fn delete_playlist(&self, id: &str) -> Result<bool, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn count_playlists(&self) -> Result<usize, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM playlists", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Drop the songs table to force record-creation failures. Tests only.
    #[cfg(test)]
    pub(crate) fn break_songs_table(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("DROP TABLE songs").unwrap();
    }
}

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        album: row.get(3)?,
        duration: row.get::<_, i64>(4)? as u64,
        file_path: row.get(5)?,
        cover_art_path: row.get(6)?,
        uploaded_by: row.get(7)?,
        created_at: row.get::<_, i64>(8)? as u64,
    })
}

/// Playlist columns with the membership JSON still undecoded.
type PlaylistParts = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    i64,
    i64,
);

fn row_to_playlist_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlaylistParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn parts_to_playlist(parts: PlaylistParts) -> Result<Playlist, LibraryError> {
    let (id, name, description, cover_art_path, owner, songs_json, last_touched_at, created_at) =
        parts;
    let songs: Vec<Membership> = serde_json::from_str(&songs_json)?;
    Ok(Playlist {
        id,
        name,
        description,
        cover_art_path,
        owner,
        songs,
        last_touched_at: last_touched_at as u64,
        created_at: created_at as u64,
    })
}

fn load_playlist(conn: &Connection, id: &str) -> Result<Option<Playlist>, LibraryError> {
    let parts = conn
        .query_row(
            "SELECT id, name, description, cover_art_path, owner,
                    songs, last_touched_at, created_at
             FROM playlists WHERE id = ?1",
            params![id],
            row_to_playlist_parts,
        )
        .optional()?;

    parts.map(parts_to_playlist).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, title: &str) -> Song {
        Song {
            id: id.into(),
            title: title.into(),
            artist: "Artist".into(),
            album: "Single".into(),
            duration: 180,
            file_path: format!("uploads/{}.mp3", id),
            cover_art_path: None,
            uploaded_by: "u1".into(),
            created_at: now_millis(),
        }
    }

    #[test]
    fn test_create_and_get_song() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        repo.create_song(&song("s1", "One")).unwrap();

        let found = repo.get_song("s1").unwrap().unwrap();
        assert_eq!(found.title, "One");
        assert!(repo.get_song("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_songs_preserves_insertion_order() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        repo.create_song(&song("s1", "One")).unwrap();
        repo.create_song(&song("s2", "Two")).unwrap();
        repo.create_song(&song("s3", "Three")).unwrap();

        let titles: Vec<_> = repo
            .list_songs()
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_playlists_scoped_to_owner() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        repo.create_playlist(&Playlist::new("Mine".into(), String::new(), "u1".into()))
            .unwrap();
        repo.create_playlist(&Playlist::new("Theirs".into(), String::new(), "u2".into()))
            .unwrap();

        let mine = repo.list_playlists_by_owner("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Mine");
    }

    #[test]
    fn test_update_playlist_commits_mutation() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        let playlist = Playlist::new("Road Trip".into(), String::new(), "u1".into());
        repo.create_playlist(&playlist).unwrap();

        let updated = repo
            .update_playlist(&playlist.id, |p| {
                p.songs.push(Membership {
                    song_id: "s1".into(),
                    added_at: 42,
                });
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.songs.len(), 1);
        let stored = repo.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(stored.songs.len(), 1);
        assert_eq!(stored.songs[0].song_id, "s1");
    }

    #[test]
    fn test_update_playlist_rejected_mutation_leaves_row_unchanged() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        let playlist = Playlist::new("Road Trip".into(), String::new(), "u1".into());
        repo.create_playlist(&playlist).unwrap();

        let result = repo.update_playlist(&playlist.id, |p| {
            p.name = "Hijacked".into();
            Err(LibraryError::Forbidden)
        });
        assert!(matches!(result, Err(LibraryError::Forbidden)));

        let stored = repo.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(stored.name, "Road Trip");
        assert_eq!(stored.last_touched_at, playlist.last_touched_at);
    }

    #[test]
    fn test_update_playlist_rejects_duplicate_membership() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        let playlist = Playlist::new("Road Trip".into(), String::new(), "u1".into());
        repo.create_playlist(&playlist).unwrap();

        let result = repo.update_playlist(&playlist.id, |p| {
            p.songs.push(Membership {
                song_id: "s1".into(),
                added_at: 1,
            });
            p.songs.push(Membership {
                song_id: "s1".into(),
                added_at: 2,
            });
            Ok(())
        });
        assert!(matches!(result, Err(LibraryError::DuplicateMember)));

        let stored = repo.get_playlist(&playlist.id).unwrap().unwrap();
        assert!(stored.songs.is_empty());
    }

    #[test]
    fn test_update_missing_playlist_is_not_found() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        let result = repo.update_playlist("nope", |_| Ok(()));
        assert!(matches!(result, Err(LibraryError::NotFound("playlist"))));
    }

    #[test]
    fn test_delete_playlist_leaves_songs() {
        let repo = LibraryRepository::open_in_memory().unwrap();
        repo.create_song(&song("s1", "One")).unwrap();

        let playlist = Playlist::new("Road Trip".into(), String::new(), "u1".into());
        repo.create_playlist(&playlist).unwrap();

        assert!(repo.delete_playlist(&playlist.id).unwrap());
        assert!(!repo.delete_playlist(&playlist.id).unwrap());
        assert!(repo.get_playlist(&playlist.id).unwrap().is_none());
        assert!(repo.get_song("s1").unwrap().is_some());
    }
}
