//! Domain records: songs, playlists and playlist membership.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A song in the library.
///
/// Created atomically by the ingestion pipeline and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Opaque server-generated identifier.
    pub id: String,

    pub title: String,
    pub artist: String,

    /// Album name; `"Single"` when neither the uploader nor the file's tags
    /// provided one.
    pub album: String,

    /// Duration in whole seconds, 0 if it could not be determined.
    pub duration: u64,

    /// Store-relative path of the audio asset.
    pub file_path: String,

    /// Store-relative path of the derived cover image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_path: Option<String>,

    /// Identifier of the uploading principal.
    pub uploaded_by: String,

    /// Creation instant, unix milliseconds.
    pub created_at: u64,
}

/// One entry in a playlist's ordered song sequence.
///
/// A back-reference only: it confers no ownership, and an entry whose song
/// has been deleted is skipped when the playlist is resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub song_id: String,

    /// Instant the song was added, unix milliseconds.
    pub added_at: u64,
}

/// An owned, ordered collection of songs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,

    pub name: String,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_path: Option<String>,

    /// Identifier of the creating principal. Immutable; every mutation
    /// re-checks it against the requesting principal.
    pub owner: String,

    /// Song sequence in insertion order. Contains no duplicate song ids.
    pub songs: Vec<Membership>,

    /// Bumped on every committed mutation, unix milliseconds.
    pub last_touched_at: u64,

    pub created_at: u64,
}

impl Playlist {
    /// Create an empty playlist owned by the given principal.
    pub fn new(name: String, description: String, owner: String) -> Self {
        let now = super::now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            cover_art_path: None,
            owner,
            songs: Vec::new(),
            last_touched_at: now,
            created_at: now,
        }
    }

    /// Whether the song id already appears in the sequence.
    pub fn contains_song(&self, song_id: &str) -> bool {
        self.songs.iter().any(|m| m.song_id == song_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_serializes_camel_case() {
        let song = Song {
            id: "s1".into(),
            title: "Billie Jean".into(),
            artist: "Michael Jackson".into(),
            album: "Thriller".into(),
            duration: 294,
            file_path: "uploads/1-billie.mp3".into(),
            cover_art_path: None,
            uploaded_by: "u1".into(),
            created_at: 1,
        };

        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["filePath"], "uploads/1-billie.mp3");
        assert_eq!(json["uploadedBy"], "u1");
        // Absent cover art is omitted, not null.
        assert!(json.get("coverArtPath").is_none());
    }

    #[test]
    fn test_contains_song() {
        let mut playlist = Playlist::new("Road Trip".into(), String::new(), "u1".into());
        playlist.songs.push(Membership {
            song_id: "s1".into(),
            added_at: 1,
        });

        assert!(playlist.contains_song("s1"));
        assert!(!playlist.contains_song("s2"));
    }
}
