//! Audio metadata extraction using lofty.
//!
//! Reads duration from the container's audio properties and album name plus
//! embedded cover art from ID3v2, Vorbis Comments or FLAC tags. Extraction
//! is an enrichment, not a requirement: it never returns an error, and
//! anything it cannot parse degrades to zero duration with no art.

use std::io::Cursor;

use lofty::picture::PictureType;
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::{debug, warn};

/// Best-effort metadata pulled from an uploaded audio file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedTags {
    /// Playable duration in whole seconds, 0 if unknown.
    pub duration_secs: u64,

    /// Album name from the tags, if present and non-empty.
    pub album: Option<String>,

    /// Embedded cover art, if present.
    pub cover: Option<CoverArt>,
}

/// Embedded cover art extracted from an audio file.
#[derive(Debug, Clone)]
pub struct CoverArt {
    /// Raw image data.
    pub data: Vec<u8>,

    /// MIME type (image/jpeg, image/png, etc.).
    pub mime_type: String,
}

/// Extract duration, album and cover art from audio file bytes.
///
/// Never fails: files that cannot be probed or read yield the default
/// (zero duration, no album, no art).
pub fn extract(bytes: &[u8], filename: &str) -> ExtractedTags {
    let cursor = Cursor::new(bytes);

    let tagged_file = match Probe::new(cursor).guess_file_type() {
        Ok(probe) => match probe.read() {
            Ok(file) => file,
            Err(e) => {
                warn!(filename = %filename, error = %e, "Failed to read audio file");
                return ExtractedTags::default();
            }
        },
        Err(e) => {
            warn!(filename = %filename, error = %e, "Failed to probe audio file type");
            return ExtractedTags::default();
        }
    };

    let duration_secs = tagged_file.properties().duration().as_secs();

    // Prefer ID3v2 > Vorbis > APE > ID3v1.
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let album = tag
        .and_then(|t| t.album().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty());

    let cover = tag.and_then(best_picture);

    debug!(
        filename = %filename,
        duration_secs,
        album = ?album,
        has_cover = cover.is_some(),
        "Extracted audio metadata"
    );

    ExtractedTags {
        duration_secs,
        album,
        cover,
    }
}

/// Pick the best embedded picture: prefer the front cover, then the largest.
fn best_picture(tag: &lofty::tag::Tag) -> Option<CoverArt> {
    let pictures = tag.pictures();
    if pictures.is_empty() {
        return None;
    }

    let best = pictures.iter().max_by(|a, b| {
        let a_front = matches!(a.pic_type(), PictureType::CoverFront);
        let b_front = matches!(b.pic_type(), PictureType::CoverFront);

        match (a_front, b_front) {
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            _ => a.data().len().cmp(&b.data().len()),
        }
    })?;

    let mime_type = best
        .mime_type()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    Some(CoverArt {
        data: best.data().to_vec(),
        mime_type,
    })
}
