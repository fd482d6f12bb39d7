//! Per-file pipeline: read tags, normalize or look up a genre, write back.

use std::path::Path;

use crate::fetchers::GenreSource;
use crate::mapping::GenreMap;
use crate::tags::{TagStore, TagUpdate, TrackTags};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Leave files alone when they already carry any genre tag.
    pub only_missing_genre: bool,
    /// Also write the release year when a lookup produced one.
    pub update_year: bool,
    /// Resolve and classify, but never save.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Genre already present and only-missing-genre is on.
    GenrePresent,
    /// Title or artist missing, nothing to look up with.
    MissingIdentity,
    /// Resolution produced exactly what the file already holds.
    Unchanged,
}

/// What happened to one file. The batch runner folds these into the run
/// statistics and the log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Updated {
        genre: Option<String>,
        year: Option<String>,
    },
    Skipped(SkipReason),
    /// Lookup ran but produced nothing the mapping recognizes.
    NotFound,
    Failed(String),
}

/// Run one file through the pipeline. Never panics and never returns an
/// error: every failure mode is an outcome.
pub async fn process_file(
    path: &Path,
    store: &dyn TagStore,
    source: &dyn GenreSource,
    map: &GenreMap,
    options: ProcessOptions,
) -> FileOutcome {
    let tags = match store.load(path) {
        Ok(tags) => tags,
        Err(e) => return FileOutcome::Failed(e.to_string()),
    };

    if options.only_missing_genre
        && tags.genre.as_deref().is_some_and(|g| !g.trim().is_empty())
    {
        return FileOutcome::Skipped(SkipReason::GenrePresent);
    }

    let (Some(title), Some(artist)) = (tags.title.as_deref(), tags.artist.as_deref()) else {
        return FileOutcome::Skipped(SkipReason::MissingIdentity);
    };

    // A tag we (or a previous run) already normalized needs no lookup and no
    // write; this is what makes a rerun over the same tree a no-op.
    if tags.genre.as_deref().is_some_and(|g| is_canonical(map, g)) {
        return FileOutcome::Skipped(SkipReason::Unchanged);
    }

    // Normalize-first: a keyword hit in the existing tag settles the genre
    // without any external call.
    if let Some(category) = tags.genre.as_deref().and_then(|g| map.normalize(g)) {
        let desired = TagUpdate {
            genre: Some(category.to_string()),
            year: None,
        };
        return finish(path, store, &tags, desired, options);
    }

    let result = source.lookup(title, artist).await;
    if result.genres.is_empty() {
        return FileOutcome::NotFound;
    }

    let candidates = map.map_candidates(&result.genres);
    if candidates.is_empty() {
        return FileOutcome::NotFound;
    }

    let year = if options.update_year { result.year } else { None };
    let desired = TagUpdate {
        genre: Some(candidates.join(", ")),
        year,
    };
    finish(path, store, &tags, desired, options)
}

/// Persist the resolved fields, unless nothing actually changed or this is a
/// dry run.
fn finish(
    path: &Path,
    store: &dyn TagStore,
    tags: &TrackTags,
    desired: TagUpdate,
    options: ProcessOptions,
) -> FileOutcome {
    let update = plan_update(tags, desired);
    if update.is_empty() {
        return FileOutcome::Skipped(SkipReason::Unchanged);
    }

    if !options.dry_run {
        if let Err(e) = store.save(path, &update) {
            return FileOutcome::Failed(e.to_string());
        }
    }

    FileOutcome::Updated {
        genre: update.genre,
        year: update.year,
    }
}

/// Drop fields that already hold the target value.
fn plan_update(tags: &TrackTags, mut update: TagUpdate) -> TagUpdate {
    if update.genre.as_deref() == tags.genre.as_deref() {
        update.genre = None;
    }
    if update.year.as_deref() == tags.year.as_deref() {
        update.year = None;
    }
    update
}

/// True when every `", "`-separated part of the tag is already a table
/// category.
fn is_canonical(map: &GenreMap, genre: &str) -> bool {
    let trimmed = genre.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.split(',').all(|part| map.is_category(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_category_is_canonical() {
        let map = GenreMap::default();
        assert!(is_canonical(&map, "Pop"));
        assert!(is_canonical(&map, "pop"));
    }

    #[test]
    fn joined_categories_are_canonical() {
        let map = GenreMap::default();
        assert!(is_canonical(&map, "Hip-Hop/Rap, Pop"));
        assert!(is_canonical(&map, "Electronic/Dance, Jazz, Rock"));
    }

    #[test]
    fn raw_genre_strings_are_not_canonical() {
        let map = GenreMap::default();
        assert!(!is_canonical(&map, "Deep House Anthems"));
        assert!(!is_canonical(&map, "Pop, Unknown Genre"));
        assert!(!is_canonical(&map, ""));
        assert!(!is_canonical(&map, "   "));
    }

    #[test]
    fn plan_update_drops_fields_already_in_place() {
        let tags = TrackTags {
            title: Some("t".to_string()),
            artist: Some("a".to_string()),
            genre: Some("Pop".to_string()),
            year: Some("1999".to_string()),
        };
        let planned = plan_update(
            &tags,
            TagUpdate {
                genre: Some("Pop".to_string()),
                year: Some("2004".to_string()),
            },
        );
        assert_eq!(planned.genre, None);
        assert_eq!(planned.year.as_deref(), Some("2004"));
    }

    #[test]
    fn plan_update_keeps_changed_fields() {
        let tags = TrackTags {
            title: None,
            artist: None,
            genre: Some("house".to_string()),
            year: None,
        };
        let planned = plan_update(
            &tags,
            TagUpdate {
                genre: Some("Electronic/Dance".to_string()),
                year: Some("2011".to_string()),
            },
        );
        assert_eq!(planned.genre.as_deref(), Some("Electronic/Dance"));
        assert_eq!(planned.year.as_deref(), Some("2011"));
    }
}
