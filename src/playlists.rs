//! Playlist membership engine.
//!
//! Maintains the ordered, deduplicated, ownership-scoped relation between
//! playlists and songs. Every mutation re-checks that the requesting
//! principal owns the playlist; the check is load-bearing security logic
//! and is never cached. All writes go through
//! [`LibraryRepository::update_playlist`], the single serialization point
//! for concurrent edits of the same playlist.

use serde::Serialize;
use tracing::info;

use crate::error::LibraryError;
use crate::library::{now_millis, LibraryRepository, Membership, Playlist, Song};

/// Partial update to a playlist's attributes. Omitted fields are left
/// untouched.
#[derive(Debug, Default)]
pub struct PlaylistEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_art_path: Option<String>,
}

/// A playlist with its member songs resolved for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_path: Option<String>,
    pub owner: String,
    pub songs: Vec<ResolvedMembership>,
    pub last_touched_at: u64,
    pub created_at: u64,
}

/// A membership entry joined with its song record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMembership {
    pub song: Song,
    pub added_at: u64,
}

/// Ownership-checked playlist operations over the repository.
#[derive(Clone)]
pub struct PlaylistService {
    repo: LibraryRepository,
}

impl PlaylistService {
    pub fn new(repo: LibraryRepository) -> Self {
        Self { repo }
    }

    /// Create an empty playlist owned by the principal.
    pub fn create(
        &self,
        principal: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::Validation("playlist name is required".into()));
        }

        let playlist = Playlist::new(
            name.to_string(),
            description.unwrap_or_default().trim().to_string(),
            principal.to_string(),
        );
        self.repo.create_playlist(&playlist)?;

        info!(playlist_id = %playlist.id, owner = %principal, "Created playlist");
        Ok(playlist)
    }

    /// All playlists owned by the principal.
    pub fn list_mine(&self, principal: &str) -> Result<Vec<Playlist>, LibraryError> {
        self.repo.list_playlists_by_owner(principal)
    }

    /// Append a song to the playlist's sequence.
    ///
    /// The song must exist, the principal must own the playlist, and a song
    /// already present is reported as [`LibraryError::DuplicateMember`]
    /// without touching the sequence.
    pub fn add_song(
        &self,
        principal: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Playlist, LibraryError> {
        if self.repo.get_song(song_id)?.is_none() {
            return Err(LibraryError::NotFound("song"));
        }

        self.repo.update_playlist(playlist_id, |playlist| {
            check_owner(playlist, principal)?;
            if playlist.contains_song(song_id) {
                return Err(LibraryError::DuplicateMember);
            }
            playlist.songs.push(Membership {
                song_id: song_id.to_string(),
                added_at: now_millis(),
            });
            Ok(())
        })
    }

    /// Remove a song from the playlist's sequence.
    ///
    /// Idempotent: removing an absent member succeeds, since the desired
    /// end state already holds.
    pub fn remove_song(
        &self,
        principal: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Playlist, LibraryError> {
        self.repo.update_playlist(playlist_id, |playlist| {
            check_owner(playlist, principal)?;
            playlist.songs.retain(|m| m.song_id != song_id);
            Ok(())
        })
    }

    /// Apply a partial update to the playlist's attributes.
    pub fn edit(
        &self,
        principal: &str,
        playlist_id: &str,
        edit: PlaylistEdit,
    ) -> Result<Playlist, LibraryError> {
        if let Some(name) = &edit.name {
            if name.trim().is_empty() {
                return Err(LibraryError::Validation(
                    "playlist name cannot be empty".into(),
                ));
            }
        }

        self.repo.update_playlist(playlist_id, |playlist| {
            check_owner(playlist, principal)?;
            if let Some(name) = edit.name {
                playlist.name = name.trim().to_string();
            }
            if let Some(description) = edit.description {
                playlist.description = description;
            }
            if let Some(cover) = edit.cover_art_path {
                playlist.cover_art_path = Some(cover);
            }
            Ok(())
        })
    }

    /// Delete the playlist and all its membership entries. Member songs
    /// are untouched.
    pub fn delete(&self, principal: &str, playlist_id: &str) -> Result<(), LibraryError> {
        let playlist = self
            .repo
            .get_playlist(playlist_id)?
            .ok_or(LibraryError::NotFound("playlist"))?;
        check_owner(&playlist, principal)?;

        self.repo.delete_playlist(playlist_id)?;
        info!(playlist_id = %playlist_id, "Deleted playlist");
        Ok(())
    }

    /// Resolve the playlist's member songs for display.
    ///
    /// Viewing is private to the owner. Memberships whose song has been
    /// deleted are skipped: a playlist is a live view over current songs,
    /// not a frozen snapshot.
    pub fn detail(
        &self,
        principal: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetail, LibraryError> {
        let playlist = self
            .repo
            .get_playlist(playlist_id)?
            .ok_or(LibraryError::NotFound("playlist"))?;
        check_owner(&playlist, principal)?;

        let mut songs = Vec::with_capacity(playlist.songs.len());
        for membership in &playlist.songs {
            if let Some(song) = self.repo.get_song(&membership.song_id)? {
                songs.push(ResolvedMembership {
                    song,
                    added_at: membership.added_at,
                });
            }
        }

        Ok(PlaylistDetail {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            cover_art_path: playlist.cover_art_path,
            owner: playlist.owner,
            songs,
            last_touched_at: playlist.last_touched_at,
            created_at: playlist.created_at,
        })
    }
}

fn check_owner(playlist: &Playlist, principal: &str) -> Result<(), LibraryError> {
    if playlist.owner != principal {
        return Err(LibraryError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_songs(song_ids: &[&str]) -> PlaylistService {
        let repo = LibraryRepository::open_in_memory().unwrap();
        for id in song_ids {
            repo.create_song(&Song {
                id: id.to_string(),
                title: format!("Song {}", id),
                artist: "Artist".into(),
                album: "Single".into(),
                duration: 120,
                file_path: format!("uploads/{}.mp3", id),
                cover_art_path: None,
                uploaded_by: "uploader".into(),
                created_at: now_millis(),
            })
            .unwrap();
        }
        PlaylistService::new(repo)
    }

    #[test]
    fn test_create_requires_name() {
        let service = service_with_songs(&[]);
        let result = service.create("u1", "   ", None);
        assert!(matches!(result, Err(LibraryError::Validation(_))));
    }

    #[test]
    fn test_add_song_twice_conflicts() {
        let service = service_with_songs(&["s1"]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();

        let updated = service.add_song("u1", &playlist.id, "s1").unwrap();
        assert_eq!(updated.songs.len(), 1);

        let result = service.add_song("u1", &playlist.id, "s1");
        assert!(matches!(result, Err(LibraryError::DuplicateMember)));

        let detail = service.detail("u1", &playlist.id).unwrap();
        assert_eq!(detail.songs.len(), 1);
    }

    #[test]
    fn test_add_missing_song_is_not_found() {
        let service = service_with_songs(&[]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();

        let result = service.add_song("u1", &playlist.id, "ghost");
        assert!(matches!(result, Err(LibraryError::NotFound("song"))));
    }

    #[test]
    fn test_add_to_missing_playlist_is_not_found() {
        let service = service_with_songs(&["s1"]);
        let result = service.add_song("u1", "ghost", "s1");
        assert!(matches!(result, Err(LibraryError::NotFound("playlist"))));
    }

    #[test]
    fn test_only_owner_can_mutate() {
        let service = service_with_songs(&["s1"]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();

        assert!(matches!(
            service.add_song("intruder", &playlist.id, "s1"),
            Err(LibraryError::Forbidden)
        ));
        assert!(matches!(
            service.remove_song("intruder", &playlist.id, "s1"),
            Err(LibraryError::Forbidden)
        ));
        assert!(matches!(
            service.edit(
                "intruder",
                &playlist.id,
                PlaylistEdit {
                    name: Some("Stolen".into()),
                    ..Default::default()
                }
            ),
            Err(LibraryError::Forbidden)
        ));
        assert!(matches!(
            service.delete("intruder", &playlist.id),
            Err(LibraryError::Forbidden)
        ));
        assert!(matches!(
            service.detail("intruder", &playlist.id),
            Err(LibraryError::Forbidden)
        ));

        // The playlist came through unchanged.
        let detail = service.detail("u1", &playlist.id).unwrap();
        assert_eq!(detail.name, "Road Trip");
        assert!(detail.songs.is_empty());
    }

    #[test]
    fn test_remove_absent_member_is_a_no_op() {
        let service = service_with_songs(&["s1"]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();
        service.add_song("u1", &playlist.id, "s1").unwrap();

        let updated = service.remove_song("u1", &playlist.id, "not-there").unwrap();
        assert_eq!(updated.songs.len(), 1);

        let updated = service.remove_song("u1", &playlist.id, "s1").unwrap();
        assert!(updated.songs.is_empty());
    }

    #[test]
    fn test_edit_is_partial() {
        let service = service_with_songs(&[]);
        let playlist = service.create("u1", "Road Trip", Some("west coast")).unwrap();

        let updated = service
            .edit(
                "u1",
                &playlist.id,
                PlaylistEdit {
                    description: Some("east coast".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Road Trip");
        assert_eq!(updated.description, "east coast");

        let result = service.edit(
            "u1",
            &playlist.id,
            PlaylistEdit {
                name: Some("  ".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(LibraryError::Validation(_))));
    }

    #[test]
    fn test_membership_order_is_insertion_order() {
        let service = service_with_songs(&["s1", "s2", "s3"]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();

        service.add_song("u1", &playlist.id, "s2").unwrap();
        service.add_song("u1", &playlist.id, "s1").unwrap();
        service.add_song("u1", &playlist.id, "s3").unwrap();

        let detail = service.detail("u1", &playlist.id).unwrap();
        let ids: Vec<_> = detail.songs.iter().map(|m| m.song.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1", "s3"]);
    }

    #[test]
    fn test_detail_skips_dangling_memberships() {
        let service = service_with_songs(&["s1"]);
        let playlist = service.create("u1", "Road Trip", None).unwrap();
        service.add_song("u1", &playlist.id, "s1").unwrap();

        // Simulate an out-of-band song deletion leaving a dangling reference.
        let dangling = service
            .repo
            .update_playlist(&playlist.id, |p| {
                p.songs.push(Membership {
                    song_id: "deleted-song".into(),
                    added_at: now_millis(),
                });
                Ok(())
            })
            .unwrap();
        assert_eq!(dangling.songs.len(), 2);

        let detail = service.detail("u1", &playlist.id).unwrap();
        assert_eq!(detail.songs.len(), 1);
        assert_eq!(detail.songs[0].song.id, "s1");
    }
}
