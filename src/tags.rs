//! Tag reading and writing over `lofty`.
//!
//! The pipeline only ever sees the [`TagStore`] trait, so the tests can swap
//! in an in-memory store and the processor never touches the filesystem
//! directly.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// File unreadable or no parseable tag container.
    #[error("{0}")]
    Read(String),
    /// Tag write failed after a successful resolution.
    #[error("{0}")]
    Write(String),
}

/// The tag fields the pipeline cares about. Empty strings are read as
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

/// Fields to write back. `None` leaves the existing value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub genre: Option<String>,
    pub year: Option<String>,
}

impl TagUpdate {
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none()
    }
}

/// Boundary to the audio files. Synchronous on purpose: tag headers are tiny
/// and the workers doing network lookups dwarf this I/O.
pub trait TagStore: Send + Sync {
    fn load(&self, path: &Path) -> Result<TrackTags, TagError>;
    fn save(&self, path: &Path, update: &TagUpdate) -> Result<(), TagError>;
}

/// Production store backed by `lofty`.
pub struct LoftyStore;

impl TagStore for LoftyStore {
    fn load(&self, path: &Path) -> Result<TrackTags, TagError> {
        let tagged = Probe::open(path)
            .map_err(|e| TagError::Read(format!("Failed to open file: {e}")))?
            .read()
            .map_err(|e| TagError::Read(format!("Failed to read tags: {e}")))?;

        let tag = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .ok_or_else(|| TagError::Read("No tag container found".to_string()))?;

        Ok(read_track_tags(tag))
    }

    fn save(&self, path: &Path, update: &TagUpdate) -> Result<(), TagError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut tagged = Probe::open(path)
            .map_err(|e| TagError::Write(format!("Failed to open file: {e}")))?
            .read()
            .map_err(|e| TagError::Write(format!("Failed to read tags: {e}")))?;

        let tag = tagged
            .primary_tag_mut()
            .ok_or_else(|| TagError::Write("No tag container to update".to_string()))?;
        apply_update(tag, update);

        tagged
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::Write(format!("Failed to write tags: {e}")))
    }
}

/// Extract the fields we process from a lofty tag.
pub fn read_track_tags(tag: &Tag) -> TrackTags {
    // Year lives in RecordingDate for most formats; ID3v1 tags surface it
    // under the plain Year key instead.
    let year = tag
        .get_string(&ItemKey::RecordingDate)
        .or_else(|| tag.get_string(&ItemKey::Year))
        .and_then(non_empty);

    TrackTags {
        title: tag.title().as_deref().and_then(non_empty),
        artist: tag.artist().as_deref().and_then(non_empty),
        genre: tag.genre().as_deref().and_then(non_empty),
        year,
    }
}

/// Apply the resolved fields to a lofty tag prior to saving.
pub fn apply_update(tag: &mut Tag, update: &TagUpdate) {
    if let Some(genre) = &update.genre {
        tag.insert_text(ItemKey::Genre, genre.clone());
    }
    if let Some(year) = &update.year {
        tag.insert_text(ItemKey::RecordingDate, year.clone());
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::tag::TagType;

    fn sample_tag() -> Tag {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.insert_text(ItemKey::TrackTitle, "Breathe".to_string());
        tag.insert_text(ItemKey::TrackArtist, "Telepopmusik".to_string());
        tag.insert_text(ItemKey::Genre, "Downtempo".to_string());
        tag.insert_text(ItemKey::RecordingDate, "2001-09-18".to_string());
        tag
    }

    #[test]
    fn reads_all_fields() {
        let tags = read_track_tags(&sample_tag());
        assert_eq!(tags.title.as_deref(), Some("Breathe"));
        assert_eq!(tags.artist.as_deref(), Some("Telepopmusik"));
        assert_eq!(tags.genre.as_deref(), Some("Downtempo"));
        assert_eq!(tags.year.as_deref(), Some("2001-09-18"));
    }

    #[test]
    fn blank_fields_read_as_missing() {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.insert_text(ItemKey::TrackTitle, "  ".to_string());
        let tags = read_track_tags(&tag);
        assert_eq!(tags.title, None);
        assert_eq!(tags.artist, None);
        assert_eq!(tags.genre, None);
        assert_eq!(tags.year, None);
    }

    #[test]
    fn year_falls_through_to_id3v1_key() {
        let mut tag = Tag::new(TagType::Id3v1);
        tag.insert_text(ItemKey::Year, "1998".to_string());
        assert_eq!(read_track_tags(&tag).year.as_deref(), Some("1998"));
    }

    #[test]
    fn update_overwrites_only_requested_fields() {
        let mut tag = sample_tag();
        apply_update(
            &mut tag,
            &TagUpdate {
                genre: Some("Electronic/Dance".to_string()),
                year: None,
            },
        );
        let tags = read_track_tags(&tag);
        assert_eq!(tags.genre.as_deref(), Some("Electronic/Dance"));
        assert_eq!(tags.year.as_deref(), Some("2001-09-18"));
        assert_eq!(tags.title.as_deref(), Some("Breathe"));
    }

    #[test]
    fn update_can_set_both_fields() {
        let mut tag = Tag::new(TagType::Id3v2);
        apply_update(
            &mut tag,
            &TagUpdate {
                genre: Some("Pop".to_string()),
                year: Some("2019".to_string()),
            },
        );
        let tags = read_track_tags(&tag);
        assert_eq!(tags.genre.as_deref(), Some("Pop"));
        assert_eq!(tags.year.as_deref(), Some("2019"));
    }
}
